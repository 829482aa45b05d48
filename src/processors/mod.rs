//! Offline processors over the dictionary sources

pub mod dataset;
