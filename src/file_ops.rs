//! Whole-file reads and writes for the file round-trips
//!
//! No streaming: the input is read into memory in one go and the output is
//! written in one go.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Permission bits for files created by this crate (Unix only).
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// How the output file is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Create-or-truncate the destination and write into it. Not atomic: a
    /// failure part-way leaves the destination truncated or partially written.
    #[default]
    Direct,

    /// Write a tempfile next to the destination, fsync it, then rename it over
    /// the destination. Either the old file or the new file exists afterwards,
    /// never a partial one.
    Atomic,
}

/// Read the full contents of `path`.
pub fn read_input(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
}

/// Where a file operation writes: `output` unless it is absent or empty, in
/// which case `input` is overwritten.
pub fn destination<'a>(input: &'a Path, output: Option<&'a Path>) -> &'a Path {
    match output {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => input,
    }
}

/// Write `contents` to `path` using `mode`.
pub fn write_output(path: &Path, contents: &[u8], mode: WriteMode) -> io::Result<()> {
    match mode {
        WriteMode::Direct => write_direct(path, contents),
        WriteMode::Atomic => write_atomic(path, contents),
    }
}

fn write_direct(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(OUTPUT_MODE);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;

    temp_file.write_all(contents)?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;

    // NamedTempFile is created 0o600; match what a direct write produces.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(OUTPUT_MODE))?;
    }

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
