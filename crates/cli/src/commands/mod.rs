pub(crate) mod dedup;
pub(crate) mod import;
pub(crate) mod query;
