//! API request, response, and error types

pub mod data;
pub mod error;
pub mod json;

pub use data::{DataRequest, KeyQuery, KeyValueQuery};
pub use error::ApiError;
pub use json::Json;
