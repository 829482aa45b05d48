//! Core translation engine module

pub mod client;
pub mod config;
pub mod context;
pub mod detector;
pub mod dictionary;
pub mod errors;
pub mod guideline;
pub mod models;
pub mod neural;
pub mod prompt;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;
