//! CLI module for the key-value cache service
//!
//! Provides subcommands:
//! - `serve`: HTTP server
//! - `migrate`: apply or revert PostgreSQL schema migrations

pub mod migrate;
pub mod serve;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::observability::init_tracing;

/// Key-value data service with a cache-aside read path
#[derive(Parser)]
#[command(name = "kv-cache-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Apply pending storage migrations
    Migrate(migrate::MigrateArgs),
}

/// Loads `.env`, the layered configuration and the tracing subscriber
pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate()?;

    init_tracing(&config.logging, &config.observability.tracing);

    Ok(config)
}
