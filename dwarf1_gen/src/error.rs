use dwarf1_loader::LoadError;
use dwarf1_types::TagKind;
use std::path::PathBuf;

/// Linkage problems found while repairing chains or building unit trees
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    /// A sibling link names an ID that is not in the store
    #[error("tag 0x{tag_id:X} has sibling 0x{sibling_id:X}, which does not exist")]
    DanglingSibling { tag_id: u32, sibling_id: u32 },

    /// A sibling link points at or before its own tag
    #[error("tag 0x{tag_id:X} has sibling 0x{sibling_id:X}, which does not follow it")]
    BackwardSibling { tag_id: u32, sibling_id: u32 },

    /// An ambiguous sibling target without exactly two predecessors
    #[error("sibling target 0x{target_id:X} is claimed by {predecessors} tags, expected 2")]
    MalformedChain { target_id: u32, predecessors: usize },

    /// The backward search for the start of a stray run left the unit
    #[error("stray run ending at 0x{stray_id:X} (target 0x{target_id:X}) has no start inside its unit")]
    StrayRunUnbounded { target_id: u32, stray_id: u32 },
}

/// Problems while resolving deferred tag properties
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FixupError {
    /// Dirty sizes that depend on each other
    #[error("circular size dependency through tag 0x{0:X}")]
    DirtyCycle(u32),

    /// A dirty tag's type reference names no tag
    #[error("tag 0x{tag_id:X} references missing type 0x{type_id:X}")]
    UnresolvedType { tag_id: u32, type_id: u32 },
}

/// Problems while rendering declarations
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CodegenError {
    /// A type ID that no unit tree contains
    #[error("tag 0x{tag_id:X} references 0x{type_id:X}, which is in no compilation unit")]
    UnresolvedReference { tag_id: u32, type_id: u32 },

    /// Input this generator cannot express
    #[error("tag 0x{tag_id:X} ({kind:?}) is not supported {context}")]
    UnsupportedConstruct {
        tag_id: u32,
        kind: TagKind,
        context: &'static str,
    },
}

/// Configuration file problems
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}

/// Any failure of the generation pipeline
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Fixup(#[from] FixupError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
