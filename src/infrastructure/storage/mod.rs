//! Storage infrastructure - Record repository implementations

mod factory;
mod in_memory;
pub mod migrations;
mod postgres;

pub use factory::{StorageConfig, StorageFactory, StorageType};
pub use in_memory::InMemoryRecordRepository;
pub use migrations::{
    revert_last_storage_migration, run_storage_migrations, Migration, PostgresMigrator,
};
pub use postgres::{connect_pool, PostgresConfig, PostgresRecordRepository};
