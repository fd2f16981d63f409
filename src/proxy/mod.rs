// Proxy module - HTTP server translating Anthropic Messages to OpenAI Chat Completions
//
// Inbound requests arrive in Anthropic format, are routed to an
// OpenAI-compatible provider, and the upstream answer (buffered or SSE) is
// translated back before it reaches the client.

mod auth;
pub mod error;
mod handlers;
pub mod routing;
mod server;
pub mod sse;
mod state;
pub mod translation;
pub mod upstream;

pub use server::{build_router, start_proxy};
