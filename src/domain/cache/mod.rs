//! Cache domain - Distributed cache abstraction

mod repository;

pub use repository::Cache;

#[cfg(test)]
pub use repository::mock::MockCache;
