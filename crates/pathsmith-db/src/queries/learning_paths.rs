//! Database query functions for the `learning_paths` table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use crate::models::{LearningModule, LearningPathRow};

/// SQLSTATE raised when a relation does not exist.
pub const UNDEFINED_TABLE: &str = "42P01";

/// Name of the server-side routine that creates the table on demand.
pub const PROVISIONER_FN: &str = "pathsmith_create_learning_paths_table";

/// Body of the provisioning routine. Mirrors migration 0001 so on-demand
/// provisioning and `db-init` converge on the same schema.
const DEFINE_PROVISIONER_SQL: &str = r#"
CREATE OR REPLACE FUNCTION pathsmith_create_learning_paths_table() RETURNS void
LANGUAGE plpgsql AS $fn$
BEGIN
    CREATE TABLE IF NOT EXISTS learning_paths (
        id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id     TEXT NOT NULL,
        title       TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        modules     JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE INDEX IF NOT EXISTS learning_paths_user_created_idx
        ON learning_paths (user_id, created_at DESC);
END;
$fn$
"#;

/// Extract the SQLSTATE code from an error produced by this module, if the
/// underlying cause was a database error.
pub fn sqlstate(err: &anyhow::Error) -> Option<String> {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

/// Cheap existence probe: selects nothing from the table.
///
/// Fails with SQLSTATE [`UNDEFINED_TABLE`] when the table is missing.
pub async fn probe_table(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1 FROM learning_paths LIMIT 0")
        .execute(pool)
        .await
        .context("failed to probe learning_paths table")?;
    Ok(())
}

/// Define (or redefine) the table-creation routine.
pub async fn define_provisioner(pool: &PgPool) -> Result<()> {
    pool.execute(DEFINE_PROVISIONER_SQL)
        .await
        .with_context(|| format!("failed to define {PROVISIONER_FN}()"))?;
    Ok(())
}

/// Invoke the table-creation routine.
pub async fn invoke_provisioner(pool: &PgPool) -> Result<()> {
    let stmt = format!("SELECT {PROVISIONER_FN}()");
    pool.execute(stmt.as_str())
        .await
        .with_context(|| format!("failed to invoke {PROVISIONER_FN}()"))?;
    Ok(())
}

/// Insert a saved learning path. Returns the stored row with the
/// server-generated id.
pub async fn insert_learning_path(
    pool: &PgPool,
    user_id: &str,
    title: &str,
    description: &str,
    modules: &[LearningModule],
    created_at: DateTime<Utc>,
) -> Result<LearningPathRow> {
    let row = sqlx::query_as::<_, LearningPathRow>(
        "INSERT INTO learning_paths (user_id, title, description, modules, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(Json(modules))
    .bind(created_at)
    .fetch_one(pool)
    .await
    .context("failed to insert learning path")?;

    Ok(row)
}

/// Fetch a learning path by id. Paths owned by another user are not
/// visible.
pub async fn get_learning_path(
    pool: &PgPool,
    id: Uuid,
    user_id: &str,
) -> Result<Option<LearningPathRow>> {
    let row = sqlx::query_as::<_, LearningPathRow>(
        "SELECT * FROM learning_paths WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch learning path")?;

    Ok(row)
}

/// List a user's learning paths, newest first.
pub async fn list_learning_paths_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<LearningPathRow>> {
    let rows = sqlx::query_as::<_, LearningPathRow>(
        "SELECT * FROM learning_paths WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list learning paths")?;

    Ok(rows)
}

/// Delete a learning path owned by `user_id`. Returns whether a row was
/// removed.
pub async fn delete_learning_path(pool: &PgPool, id: Uuid, user_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM learning_paths WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("failed to delete learning path")?;

    Ok(result.rows_affected() > 0)
}

/// Count all stored learning paths.
pub async fn count_learning_paths(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM learning_paths")
        .fetch_one(pool)
        .await
        .context("failed to count learning paths")?;

    Ok(count)
}
