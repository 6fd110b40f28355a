// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity index for past claims.
//!
//! ## Architecture
//!
//! - **SqliteIndex**: SQLite persistence with BLOB vectors, cosine ranking
//! - **InMemoryIndex**: same ranking, process-local
//! - **HashingEmbedder**: deterministic feature-hashing embeddings
//! - **ContextRetriever**: failure-tolerant top-k lookup feeding handlers

pub mod embedder;
pub mod memory_index;
pub mod retriever;
pub mod store;
pub mod types;

pub use embedder::HashingEmbedder;
pub use memory_index::InMemoryIndex;
pub use retriever::{open_index, ContextRetriever};
pub use store::SqliteIndex;
pub use types::*;
