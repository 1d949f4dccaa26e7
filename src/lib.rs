//! # Code Companion
//!
//! Retrieval-augmented coding answers grounded in your own codebase.
//!
//! Code Companion extracts every function and method from a local source tree
//! with tree-sitter, stores each one (header plus exact code) in a Chroma
//! collection, and, when asked a question, retrieves the closest functions
//! and hands them to a local Ollama model as worked examples.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌─────────┐   ┌──────────┐
//! │ Scanner  │──▶│ Extractors │──▶│ Encoder │──▶│  Chroma  │
//! │ (walk)   │   │ Go / Rust  │   │ header  │   │ + Ollama │
//! └──────────┘   └────────────┘   └─────────┘   │  embed   │
//!                                               └────┬─────┘
//!                                                    │ search
//!                ┌──────────┐   ┌────────────┐   ┌───▼─────┐
//!                │  Ollama  │◀──│   Prompt   │◀──│ Decoder │
//!                │ generate │   │  builder   │   └─────────┘
//!                └──────────┘   └────────────┘
//! ```
//!
//! The codec, prompt builder, error kinds and store trait live in
//! [`code_companion_core`]; this crate adds everything that does I/O.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`scanner`] | Source tree walk with extension and exclude filters |
//! | [`extract`] | tree-sitter function extraction |
//! | [`index`] | Concurrent indexing pipeline |
//! | [`embedding`] | Ollama embedding provider |
//! | [`chroma`] | Chroma-backed snippet store |
//! | [`llm`] | Ollama text generation |
//! | [`query`] | Retrieval and prompt assembly |

pub mod chroma;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod llm;
pub mod query;
pub mod scanner;
