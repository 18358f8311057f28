//! Retrieval-augmented chat assistant for car diagnostics.
//!
//! Documents under a data directory are parsed, embedded into an in-memory
//! index at startup, and served through a conversational engine backed by a
//! local language model. Two front-ends share the same engine: the HTTP API
//! (`api` binary) and an interactive terminal session (`chat` binary).

pub mod api;
pub mod application;
pub mod bootstrap;
pub mod console;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;
