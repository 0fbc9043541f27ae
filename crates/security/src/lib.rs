//! Security policies for Ferrobot — command safety and secret redaction.
//!
//! Provides:
//! - **Command guard**: deny-pattern and workspace-confinement checks for
//!   shell execution
//! - **Redaction**: best-effort scrubbing of secrets from log output and
//!   error messages

pub mod guard;
pub mod redact;

pub use guard::{CommandGuard, Denial};
pub use redact::{redact_api_key, redact_secrets, sanitize_error};
