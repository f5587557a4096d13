//! DWARF v1 Dump Loading
//!
//! This crate reads the textual dump produced by the DWARFone dumper,
//! splits it into tag blocks and turns every recognised attribute line into
//! a field of a [`Tag`](dwarf1_types::Tag). The result is a populated
//! [`TagStore`](dwarf1_types::TagStore) plus the compile unit headers found
//! along the way.

pub mod attributes;
pub mod error;
pub mod file;
pub mod parser;

pub use error::{LoadError, ParseWarning};
pub use file::DumpFile;
pub use parser::{parse, ParsedDump, UnitHeader};

// Re-export dwarf1_types for convenience
pub use dwarf1_types;
