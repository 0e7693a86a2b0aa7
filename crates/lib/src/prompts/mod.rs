//! # Prompt Template Modules
//!
//! Prompt templates used by the two answer paths.

pub mod core;
pub mod rag;
