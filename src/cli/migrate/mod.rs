//! Migrate command - manages the PostgreSQL schema

use clap::Args;
use tracing::info;

use crate::infrastructure::storage::{
    connect_pool, revert_last_storage_migration, run_storage_migrations, PostgresMigrator,
};

#[derive(Args, Debug, Clone, Default)]
pub struct MigrateArgs {
    /// Revert the most recently applied migration instead
    #[arg(long)]
    pub revert: bool,
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let pg_config = config.storage.postgres.to_postgres_config()?;

    let pool = connect_pool(&pg_config).await?;

    if args.revert {
        match revert_last_storage_migration(&pool).await? {
            Some(version) => info!(version, "Reverted migration"),
            None => info!("No migration to revert"),
        }
    } else {
        run_storage_migrations(&pool).await?;
    }

    let version = PostgresMigrator::new(pool.clone()).current_version().await?;
    info!(version = ?version, "Storage schema version");

    pool.close().await;
    Ok(())
}
