//! Configuration models for admission limits and polling cadence.

pub mod admission;

pub use admission::{AdmissionConfig, CONFIG_PATH_VAR, ENV_PREFIX};
