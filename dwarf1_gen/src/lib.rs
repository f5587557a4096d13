//! DWARF v1 Declaration Generator
//!
//! Rebuilds C/C++ declarations from a DWARF v1 dump. The dump's tags are
//! linked only through sibling IDs, and the encoder that produced them
//! loses some of those links, so the work happens in stages:
//!
//! 1. [`graph`] repairs stray sibling chains and builds one tree per
//!    compilation unit.
//! 2. [`fixup`] resolves what the encoder left ambiguous (padding tags,
//!    static methods, deferred sizes, names).
//! 3. [`layout`] infers anonymous unions from shared member offsets.
//! 4. [`codegen`] renders declarators and whole declarations.
//! 5. [`output`] groups the rendered units into files.
//!
//! [`pipeline`] strings the stages together.

pub mod codegen;
pub mod config;
pub mod error;
pub mod fixup;
pub mod graph;
pub mod layout;
pub mod output;
pub mod pipeline;

pub use config::GenConfig;
pub use error::{CodegenError, Error, FixupError, GraphError};
pub use pipeline::{analyze, generate, Analysis, Generation, UnitFailure};

pub use dwarf1_loader;
pub use dwarf1_types;
