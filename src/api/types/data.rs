//! Request types for the data endpoints

use serde::{Deserialize, Serialize};

/// Body of `POST /api/data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    #[serde(alias = "key1")]
    pub key: String,
    #[serde(alias = "value1")]
    pub value: String,
}

/// Query of `GET` and `DELETE /api/data`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

/// Query of `PUT /api/data`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyValueQuery {
    pub key: String,
    pub value: String,
}
