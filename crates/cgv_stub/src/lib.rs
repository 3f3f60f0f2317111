//! Mock RAG backend: the chat widget and health endpoints with canned answers, so the verifier
//! can be exercised without the real retrieval stack.

pub mod canned;
pub mod server;

pub use server::{router, serve, serve_with_shutdown, BackgroundStub};
