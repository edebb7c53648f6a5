//! CLI Commands
//!
//! Each command returns `Ok(false)` when it ran but found failures, so `main`
//! can exit non-zero after all output has been printed.

pub mod check;
pub mod list;
pub mod rehearse;
