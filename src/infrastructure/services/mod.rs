//! Infrastructure services

mod data_processor;
mod mutation_lock;

pub use data_processor::{
    DataProcessor, MutationOutcome, MutationTicket, ProcessorConfig, FETCH_ERROR_MESSAGE,
    NOT_FOUND_MESSAGE,
};
pub use mutation_lock::{LockMode, MutationLock};
