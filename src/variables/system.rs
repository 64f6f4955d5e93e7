//! Built-in variables seeded into every run.
//!
//! `{{random-8}}` is an 8 character alphanumeric string and `{{run-id}}` a
//! UUID v4. Both are regenerated for every tick, so a monitor can create
//! uniquely named resources and clean them up in the same tick.
//!
//! The values come from a thread-local PRNG. They are unique enough to avoid
//! collisions between ticks but are not suitable as secrets.

use super::store::Variable;
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Name of the per-run random string variable.
pub const RANDOM_VARIABLE: &str = "random-8";

/// Name of the per-run UUID variable.
pub const RUN_ID_VARIABLE: &str = "run-id";

const RANDOM_LENGTH: usize = 8;

/// Generates a fresh set of built-in variables.
pub fn builtin_variables() -> Vec<Variable> {
    vec![
        Variable::provided(RANDOM_VARIABLE, random_alphanumeric(RANDOM_LENGTH)),
        Variable::provided(RUN_ID_VARIABLE, Uuid::new_v4().to_string()),
    ]
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
