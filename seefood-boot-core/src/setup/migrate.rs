//! Schema migration step.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use tracing::info;

use super::{SetupContext, SetupStep};
use crate::Result;

/// Migrations compiled into the binary from the workspace `migrations/` dir.
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applies pending schema migrations. Required: the server must not launch
/// against a schema it does not understand.
pub struct MigrateStep;

#[async_trait]
impl SetupStep for MigrateStep {
    fn name(&self) -> &'static str {
        "migrate"
    }

    async fn is_satisfied(&self, ctx: &SetupContext) -> Result<bool> {
        let applied = applied_versions(&ctx.pool).await?;
        Ok(MIGRATOR
            .migrations
            .iter()
            .all(|m| applied.contains(&m.version)))
    }

    async fn apply(&self, ctx: &SetupContext) -> Result<()> {
        let applied = applied_versions(&ctx.pool).await?;
        let pending = MIGRATOR
            .migrations
            .iter()
            .filter(|m| !applied.contains(&m.version))
            .count();
        info!(pending, "running database migrations");

        MIGRATOR.run(&ctx.pool).await?;

        info!("migrations completed");
        Ok(())
    }
}

/// Versions recorded in the sqlx bookkeeping table.
///
/// A fresh database has no `_sqlx_migrations` table yet; that reads as
/// "nothing applied", not as an error.
async fn applied_versions(pool: &PgPool) -> Result<HashSet<i64>> {
    let versions: Vec<i64> =
        match sqlx::query_scalar("SELECT version FROM _sqlx_migrations ORDER BY version")
            .fetch_all(pool)
            .await
        {
            Ok(versions) => versions,
            // undefined_table
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("42P01") => {
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

    Ok(versions.into_iter().collect())
}
