//! chat-relay: streaming chat relay for Gemini.
//!
//! Accepts a chat message over HTTP, forwards it to the Gemini API as a
//! single-turn session and streams the generated text back as a chunked
//! plain-text body framed by sentinel markers:
//!   `[STREAM-START]\n` fragment fragment ... `\n[STREAM-END]\n`
//!
//! Also serves the browser frontend that reads that stream.

pub mod client;
pub mod config;
pub mod error;
pub mod relay;
pub mod server;
pub mod text;
pub mod upstream;
