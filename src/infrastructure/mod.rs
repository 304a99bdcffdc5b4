//! Infrastructure layer - Store, cache and executor implementations

pub mod cache;
pub mod executor;
pub mod observability;
pub mod services;
pub mod storage;
