//! Wire types for the genai-ready client.

pub mod enums;
pub mod files;
pub mod operations;
