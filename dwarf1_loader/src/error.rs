use dwarf1_types::StoreError;
use std::path::PathBuf;

/// Errors that abort loading a dump
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The dump file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No `DWARF v1 dump -` banner in the first lines of the file
    #[error("no DWARF v1 dump banner found in the first {0} lines")]
    MissingBanner(usize),

    /// A numeric field did not parse
    #[error("line {line}: invalid number in `{text}`")]
    InvalidNumber { line: usize, text: String },

    /// An `FT_*` token outside the known builtin set
    #[error("line {line}: unknown fundamental type `{token}`")]
    UnknownFundamentalType { line: usize, token: String },

    /// Array subscripts indexed by anything but FT_long or FT_integer
    #[error("line {line}: tag 0x{tag_id:X} uses an unsupported subscript index type in `{text}`")]
    UnsupportedSubscript { line: usize, tag_id: u32, text: String },

    /// `AT_subscr_data` that does not follow the expected layout
    #[error("line {line}: tag 0x{tag_id:X} has an unknown array format `{text}`")]
    UnknownArrayFormat { line: usize, tag_id: u32, text: String },

    /// Tag store rejected a tag
    #[error(transparent)]
    Store(#[from] StoreError),
}

/* Attribute line that no parser for the tag's kind recognised */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /* 1-based line in the dump */
    pub line: usize,
    pub tag_id: u32,
    pub text: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown attribute `{}` on tag 0x{:X} @{}", self.text, self.tag_id, self.line)
    }
}
