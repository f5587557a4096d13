use crate::error::LoadError;
use std::path::{Path, PathBuf};

/* Lines searched for the dump banner */
pub const BANNER_SEARCH_LINES: usize = 100;
const BANNER: &str = "DWARF v1 dump -";
const COMPILE_UNIT_MARKER: &str = "TAG_compile_unit";

/* A dump file split into lines */
#[derive(Debug, Clone)]
pub struct DumpFile {
    pub path: PathBuf,
    lines: Vec<String>,
}

impl DumpFile {
    /* Read a dump from disk */
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_text(path, &text))
    }

    /* Wrap dump text already in memory */
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(|line| line.trim_end_matches('\r').to_string()).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /* Index of the first line after the banner */
    pub fn body_start(&self) -> Result<usize, LoadError> {
        self.lines
            .iter()
            .take(BANNER_SEARCH_LINES)
            .position(|line| line.starts_with(BANNER))
            .map(|banner| banner + 1)
            .ok_or(LoadError::MissingBanner(BANNER_SEARCH_LINES))
    }

    /* Names of every compile unit, in file order */
    pub fn list_compile_units(&self) -> Result<Vec<String>, LoadError> {
        let start = self.body_start()?;
        let mut names = Vec::new();
        let mut in_unit = false;

        for line in &self.lines[start..] {
            if line.trim_end().ends_with(COMPILE_UNIT_MARKER) {
                in_unit = true;
                continue;
            }
            if !in_unit {
                continue;
            }
            if line.trim().is_empty() || !line.starts_with(char::is_whitespace) {
                in_unit = false;
                continue;
            }
            let attribute = line.trim_start();
            if let Some(name) = attribute
                .strip_prefix("AT_name(\"")
                .and_then(|rest| rest.strip_suffix("\")"))
            {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }
}
