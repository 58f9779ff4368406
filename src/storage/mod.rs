//! Storage for CANON containers
//!
//! Containers are written to a temporary sibling file first and renamed into
//! place, so a crash never leaves a half-written container under the final
//! name.

mod container;

pub use container::{checksum_hex, Container, CHECKSUM_LEN, FORMAT_VERSION, MAGIC};

use crate::error::Result;
use log::info;
use std::path::{Path, PathBuf};

/// File extension appended by `compress`
pub const EXTENSION: &str = "canon";

/// Read and validate a container from `path`
pub fn read_container(path: impl AsRef<Path>) -> Result<Container> {
    let bytes = std::fs::read(path.as_ref())?;
    let container = Container::decode(&bytes)?;
    info!(
        "Loaded {} ({} bytes, {} levels)",
        path.as_ref().display(),
        bytes.len(),
        container.chain().depth()
    );
    Ok(container)
}

/// Write `bytes` to `path` through a temporary file in the same directory
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let tmp = dir.join(format!(".canon-{}.tmp", uuid::Uuid::new_v4()));
    if let Err(e) = std::fs::write(&tmp, bytes).and_then(|_| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// `<input>.canon`
pub fn compressed_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(EXTENSION);
    PathBuf::from(name)
}

/// `<input>` without `.canon`, or `<input>.out` when it has another extension
pub fn decompressed_path(input: &Path) -> PathBuf {
    if input.extension().is_some_and(|ext| ext == EXTENSION) {
        input.with_extension("")
    } else {
        let mut name = input.as_os_str().to_os_string();
        name.push(".out");
        PathBuf::from(name)
    }
}
