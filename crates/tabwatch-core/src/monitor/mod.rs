//! Page state monitor.
//!
//! Tracks one chat page through a response: waiting, streaming, refusal with
//! a retry countdown, automatic retry clicks, and completion. Title and
//! favicon follow the state; a completion may be announced through the
//! notification relay according to the configured alert policy.

mod alert;
mod runner;
mod session;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use alert::{format_completion_message, retries_from_counter};
pub use runner::SessionRunner;
pub use session::PageSession;
pub use state::{format_seconds, ObservationState, Timer};
