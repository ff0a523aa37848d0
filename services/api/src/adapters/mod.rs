//! services/api/src/adapters/mod.rs
//!
//! Concrete implementations of the core's ports.

pub mod db;
pub mod draft_llm;
