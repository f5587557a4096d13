//! DWARF v1 Tag Definitions
//!
//! This crate contains the core data model shared by the dump loader and the
//! declaration generator: tags, their kinds, type references and the
//! ID-indexed tag store. It holds pure data structures without any file I/O
//! or code generation logic.

pub mod builtin;
pub mod store;
pub mod tag;

// Re-export commonly used types at the crate root
pub use builtin::*;
pub use store::*;
pub use tag::*;
