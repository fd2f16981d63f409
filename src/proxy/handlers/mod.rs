//! Request handlers for the proxy
//!
//! `messages` holds the main entry point (`create_message`), which runs the
//! whole parse → route → translate → dispatch sequence and shapes either a
//! JSON or an SSE reply. `health` answers liveness probes.

mod health;
mod messages;

pub use health::health;
pub use messages::create_message;
