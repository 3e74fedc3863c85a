pub mod authorities;
pub mod learn;
pub mod run;
pub mod verify;

pub use authorities::cmd_authorities;
pub use learn::{cmd_learn, LearnArgs};
pub use run::{cmd_run, RunArgs};
pub use verify::{cmd_verify, VerifyArgs};
