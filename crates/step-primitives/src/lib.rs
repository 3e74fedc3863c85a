//! Atomic step execution.
//!
//! One entry point, [`execute_step`], performs a recipe step against a page
//! driver: resolve placeholders, perform the primitive, then block on the
//! step's post-condition under a bounded timeout. Nothing in here decides
//! challenge outcomes; that is the runner's job, and this crate only turns one
//! step into `Ok` or a classified [`StepError`].

pub mod errors;
pub mod primitives;

pub use errors::StepError;
pub use primitives::{execute_step, StepTimeouts};
