/* Output planning and writing
 *
 * Every unit is written to a path derived from its recorded source name.
 * Units that map to the same path share one file, in unit order, separated
 * by a delimiter line.
 */

use crate::error::Error;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/* Number of dashes in the line separating units that share a file */
pub const DELIMITER_WIDTH: usize = 80;

pub fn delimiter() -> String {
    format!("// {}", "-".repeat(DELIMITER_WIDTH))
}

/// Path a unit is written to: its source name with `strip_prefix` removed,
/// separators normalised to `/`, joined under `output_dir`.
pub fn output_path(output_dir: &Path, strip_prefix: &str, unit_name: &str) -> PathBuf {
    let prefix = strip_prefix.trim_end_matches(['/', '\\']);
    let relative = if prefix.is_empty() {
        unit_name.to_string()
    } else {
        unit_name.replacen(prefix, "", 1)
    };
    let relative = relative.replace('\\', "/");
    output_dir.join(relative.trim_start_matches('/'))
}

#[derive(Debug, Clone, Default)]
pub struct OutputPlan {
    files: IndexMap<PathBuf, Vec<String>>,
}

impl OutputPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /* Append a unit's lines to its file, after a delimiter when the file
       already holds another unit */
    pub fn add_unit(&mut self, path: PathBuf, lines: Vec<String>) {
        let file = self.files.entry(path).or_default();
        if !file.is_empty() {
            file.push(delimiter());
            file.push(String::new());
        }
        file.extend(lines);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.keys()
    }

    pub fn lines(&self, path: &Path) -> Option<&[String]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /* Write every planned file, creating directories as needed */
    pub fn write_all(&self) -> Result<usize, Error> {
        for (path, lines) in &self.files {
            write_file(path, lines)?;
        }
        info!("wrote {} file(s)", self.files.len());
        Ok(self.files.len())
    }
}

pub fn write_file(path: &Path, lines: &[String]) -> Result<(), Error> {
    let io_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    std::fs::write(path, text).map_err(io_error)?;

    debug!("wrote {} ({} lines)", path.display(), lines.len());
    Ok(())
}
