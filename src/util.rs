use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use anyhow::Context;
use tempfile::NamedTempFile;

/// Write to a file atomically.
pub fn replace_file(content: &str, path: &Path) -> Result<(), io::Error> {
    // The temporary file must live on the same filesystem for the rename.
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut f = NamedTempFile::new_in(dir)?;
    f.write_all(content.as_bytes())?;
    f.as_file().sync_data()?;

    // This rename makes our write atomic.
    f.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Reads a schema file, naming the path in the error.
pub fn read_schema(path: &Path) -> anyhow::Result<String> {
    if !path.exists() {
        anyhow::bail!("file not found: {}", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
}
