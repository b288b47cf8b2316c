//! The four-pass rewrite pipeline.
//!
//! Each pass is a rewrite of the inference tree; activation finally leaves
//! the tree world and emits the two repositories:
//! 1. `derive` — draft-discipline checks (bottom-up, inputs as siblings)
//! 2. `formalize` — flow indices, sequence kinds, semantic types
//! 3. `post_formalize` — composition, provision, and shape annotations
//! 4. `activate` — concept and inference repositories

#[cfg(test)]
mod formalize_tests;

pub mod activate;
pub mod derive;
pub mod formalize;
pub mod operators;
pub mod post_formalize;

pub use activate::{ActivateOptions, activate};
pub use derive::check_draft;
pub use formalize::formalize;
pub use operators::{OperatorHead, classify};
pub use post_formalize::post_formalize;
