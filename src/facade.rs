//! Buffer and file protection on top of a [`DataProtector`]
//!
//! The facade guards against empty input, delegates to the backend, and
//! wraps failures with the context of the step that failed. The free
//! functions at the bottom of this module use the native DPAPI backend.

use crate::dpapi::Dpapi;
use crate::error::{FileProtectionError, ProtectionError};
use crate::file_ops::{self, WriteMode};
use crate::logging::verbose;
use crate::protector::DataProtector;
use std::path::Path;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Default)]
pub struct Facade<P = Dpapi> {
    backend: P,
    write_mode: WriteMode,
}

impl Facade<Dpapi> {
    /// A facade over the native DPAPI backend.
    pub fn native() -> Self {
        Self::new(Dpapi)
    }
}

impl<P: DataProtector> Facade<P> {
    pub fn new(backend: P) -> Self {
        Self {
            backend,
            write_mode: WriteMode::default(),
        }
    }

    /// Choose how file operations write their output.
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn backend(&self) -> &P {
        &self.backend
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Protect `plaintext`, returning an opaque blob.
    ///
    /// The blob differs between calls even for the same input; only
    /// `unprotect(protect(b)) == b` holds.
    pub fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, ProtectionError> {
        if plaintext.is_empty() {
            return Err(ProtectionError::EmptyInput);
        }

        verbose!(
            "encrypting {} bytes using {}...",
            plaintext.len(),
            self.backend.name()
        );
        let blob = self
            .backend
            .protect(plaintext)
            .map_err(ProtectionError::PlatformRejected)?;
        verbose!("data encryption successful");
        Ok(blob)
    }

    /// Recover the plaintext from a blob produced by [`Facade::protect`].
    pub fn unprotect(&self, blob: &[u8]) -> Result<Vec<u8>, ProtectionError> {
        if blob.is_empty() {
            return Err(ProtectionError::EmptyInput);
        }

        verbose!(
            "decrypting {} bytes using {}...",
            blob.len(),
            self.backend.name()
        );
        let plaintext = self
            .backend
            .unprotect(blob)
            .map_err(ProtectionError::PlatformRejected)?;
        verbose!("data decryption successful");
        Ok(plaintext)
    }

    /// Protect the contents of `input` and write the blob to `output`, or
    /// back over `input` when `output` is `None` or empty.
    pub fn protect_file(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<(), FileProtectionError> {
        let plaintext = Zeroizing::new(self.read(input)?);

        verbose!("file read successful, encrypting contents...");
        let blob = self
            .protect(&plaintext)
            .map_err(|source| FileProtectionError::EncryptionFailed {
                path: input.to_path_buf(),
                source,
            })?;

        self.write(file_ops::destination(input, output), &blob)?;
        verbose!("file encryption successful");
        Ok(())
    }

    /// Unprotect the contents of `input` and write the plaintext to `output`,
    /// or back over `input` when `output` is `None` or empty.
    pub fn unprotect_file(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<(), FileProtectionError> {
        let blob = self.read(input)?;

        verbose!("file read successful, decrypting contents...");
        let plaintext = self
            .unprotect(&blob)
            .map(Zeroizing::new)
            .map_err(|source| FileProtectionError::DecryptionFailed {
                path: input.to_path_buf(),
                source,
            })?;

        self.write(file_ops::destination(input, output), &plaintext)?;
        verbose!("file decryption successful");
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FileProtectionError> {
        verbose!("reading file: {}", path.display());
        file_ops::read_input(path).map_err(|source| FileProtectionError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FileProtectionError> {
        verbose!(
            "writing {} bytes to file: {} ({:?})",
            contents.len(),
            path.display(),
            self.write_mode
        );
        file_ops::write_output(path, contents, self.write_mode).map_err(|source| {
            FileProtectionError::WriteFailed {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// Protect `plaintext` with DPAPI in the local-machine context.
pub fn protect(plaintext: &[u8]) -> Result<Vec<u8>, ProtectionError> {
    Facade::native().protect(plaintext)
}

/// Unprotect a DPAPI blob produced on this machine.
pub fn unprotect(blob: &[u8]) -> Result<Vec<u8>, ProtectionError> {
    Facade::native().unprotect(blob)
}

/// Protect a file with DPAPI; see [`Facade::protect_file`].
pub fn protect_file(input: &Path, output: Option<&Path>) -> Result<(), FileProtectionError> {
    Facade::native().protect_file(input, output)
}

/// Unprotect a DPAPI-protected file; see [`Facade::unprotect_file`].
pub fn unprotect_file(input: &Path, output: Option<&Path>) -> Result<(), FileProtectionError> {
    Facade::native().unprotect_file(input, output)
}
