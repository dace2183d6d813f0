pub mod cli;
pub mod models;
pub mod parsers;
pub mod services;
pub mod vector_store;
pub mod web;

pub mod env;
pub mod error;
pub mod logging;

pub use error::TextRagError;
pub use logging::{init_from_env, init_logging, LoggingConfig};
