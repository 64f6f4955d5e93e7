//! Variables module
//!
//! Holds the per-run variable store, the built-in variables seeded into it,
//! the templating engine that substitutes `{{name}}` placeholders and the
//! extraction rules that grow the store from responses.

pub mod extraction;
pub mod store;
pub mod substitution;
pub mod system;

pub use extraction::extract_variables;
pub use store::{Variable, VariableOrigin, VariableStore};
pub use substitution::{placeholders, render, render_map, Renderer};
pub use system::{builtin_variables, RANDOM_VARIABLE, RUN_ID_VARIABLE};
