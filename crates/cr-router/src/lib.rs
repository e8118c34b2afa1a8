//! Tier-to-model selection and request routing orchestration.
//!
//! Mirrors `at-intelligence`'s `model_router`/`cost_tracker`
//! split: `selector` owns pure cost-accounting math, `router` owns the
//! stateful orchestration across the classifier crate.

pub mod router;
pub mod selector;

pub use router::Router;
pub use selector::{select, SelectorOutput};
