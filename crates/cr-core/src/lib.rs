//! Core, runtime-agnostic building blocks shared by the classifier, router
//! and proxy crates: the model catalog, instance configuration, and the
//! credential-resolution capability.
//!
//! Mirrors `at-core`'s role: the crate every other crate depends on, with no
//! HTTP or async-runtime dependency of its own.

pub mod catalog;
pub mod config;
pub mod credentials;

pub use catalog::{default_catalog, ModelCatalog};
pub use config::{Config, ConfigError, LoggingConfig, ServerConfig};
pub use credentials::{CredentialResolver, EnvCredentialResolver};
