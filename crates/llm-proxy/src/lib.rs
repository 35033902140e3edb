//! `llm-proxy` — minimal client for an OpenAI-compatible chat-completions proxy.
//!
//! The generation engine only needs one thing from the model: send a system
//! contract plus a short user directive, get text back. This crate owns that
//! transport so the engine can stay I/O-agnostic behind [`ChatBackend`].
//!
//! # Architecture
//!
//! ```text
//! ChatRequest            ← system contract + user directive (+ retry nudges)
//!     │
//!     ▼
//! ChatBackend::complete  ← trait seam; ProxyClient in production,
//!     │                     scripted stubs in tests
//!     ▼
//! ProxyClient            ← POST {base_url}/chat/completions, bearer token,
//!     │                     bounded per-request timeout
//!     ▼
//! String                 ← choices[0].message.content, unparsed
//! ```
//!
//! Parsing the reply into files is deliberately *not* done here.

pub mod client;
pub mod error;
pub mod types;


pub use client::{ChatBackend, ProxyClient, ProxyConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::LlmProxyError;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, ChoiceMessage, Role, TokenUsage};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, LlmProxyError>;
