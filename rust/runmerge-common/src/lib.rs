//! Core definitions (error taxonomy, result helpers), relied upon by all runmerge-* crates.

pub mod error;
pub mod macros;
pub mod result;

pub use result::Result;
