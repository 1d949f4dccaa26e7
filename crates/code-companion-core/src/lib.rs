//! # Code Companion Core
//!
//! Shared logic for Code Companion: the snippet model, the self-describing
//! header codec, prompt assembly, error kinds, and the store abstraction.
//!
//! This crate contains no tokio runtime, HTTP client, tree-sitter, or
//! filesystem I/O. Everything here is a pure function of its inputs except
//! the [`store::memory::InMemoryStore`], which keeps its state in memory.

pub mod codec;
pub mod error;
pub mod models;
pub mod prompt;
pub mod store;

pub use codec::{decode, encode, DecodedSnippet};
pub use error::CompanionError;
pub use models::{SearchResult, Snippet};
pub use prompt::build_prompt;
