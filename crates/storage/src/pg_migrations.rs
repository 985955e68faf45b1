//! PostgreSQL schema migrations for citeblock storage.
//!
//! Every statement is idempotent; migrations run on each connect.

use sqlx::PgPool;

/// Run all PostgreSQL migrations.
pub async fn run_pg_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS citations (
            id BIGSERIAL PRIMARY KEY,
            review_id INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            title TEXT NOT NULL,
            authors TEXT[] NOT NULL DEFAULT '{}',
            abstract TEXT,
            pub_year SMALLINT,
            doi TEXT,
            dedupe_status TEXT NOT NULL DEFAULT 'unresolved'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_citations_review_created
         ON citations (review_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_citations_unresolved
         ON citations (review_id) WHERE dedupe_status = 'unresolved'",
    )
    .execute(pool)
    .await?;

    // Derived block index, all keyed by review first.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dedupe_blocking_map (
            review_id INTEGER NOT NULL,
            citation_id BIGINT NOT NULL,
            block_key TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_blocking_map_review
         ON dedupe_blocking_map (review_id, block_key)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dedupe_plural_key (
            review_id INTEGER NOT NULL,
            block_id BIGINT NOT NULL,
            block_key TEXT NOT NULL,
            PRIMARY KEY (review_id, block_id),
            UNIQUE (review_id, block_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dedupe_plural_block (
            review_id INTEGER NOT NULL,
            block_id BIGINT NOT NULL,
            citation_id BIGINT NOT NULL,
            PRIMARY KEY (review_id, block_id, citation_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_plural_block_citation
         ON dedupe_plural_block (review_id, citation_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dedupe_covered_blocks (
            review_id INTEGER NOT NULL,
            citation_id BIGINT NOT NULL,
            sorted_ids BIGINT[] NOT NULL,
            PRIMARY KEY (review_id, citation_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dedupe_smaller_coverage (
            review_id INTEGER NOT NULL,
            citation_id BIGINT NOT NULL,
            block_id BIGINT NOT NULL,
            smaller_ids BIGINT[] NOT NULL,
            PRIMARY KEY (review_id, citation_id, block_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_smaller_coverage_block
         ON dedupe_smaller_coverage (review_id, block_id)",
    )
    .execute(pool)
    .await?;

    tracing::debug!("PostgreSQL migrations applied");
    Ok(())
}
