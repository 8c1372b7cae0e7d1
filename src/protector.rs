//! The protect/unprotect primitive pair behind the facade

use crate::error::PlatformError;
use std::sync::Arc;

/// A backend that seals and opens opaque blobs.
///
/// [`crate::Dpapi`] is the real one. [`crate::EphemeralProtector`] stands in
/// for it where DPAPI is not available, e.g. in tests on non-windows hosts.
///
/// Callers going through [`crate::Facade`] never pass an empty slice here.
/// Implementations must return an owned copy of their output; the caller never
/// sees memory the backend has to release itself.
pub trait DataProtector: Send + Sync {
    /// Short identifier used in diagnostic logging.
    fn name(&self) -> &'static str;

    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, PlatformError>;

    /// Fails when `blob` was not produced by the matching `protect` in the
    /// same context, or when the key material is no longer accessible.
    fn unprotect(&self, blob: &[u8]) -> Result<Vec<u8>, PlatformError>;
}

impl<T: DataProtector + ?Sized> DataProtector for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, PlatformError> {
        (**self).protect(plaintext)
    }

    fn unprotect(&self, blob: &[u8]) -> Result<Vec<u8>, PlatformError> {
        (**self).unprotect(blob)
    }
}

impl<T: DataProtector + ?Sized> DataProtector for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, PlatformError> {
        (**self).protect(plaintext)
    }

    fn unprotect(&self, blob: &[u8]) -> Result<Vec<u8>, PlatformError> {
        (**self).unprotect(blob)
    }
}

impl<T: DataProtector + ?Sized> DataProtector for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, PlatformError> {
        (**self).protect(plaintext)
    }

    fn unprotect(&self, blob: &[u8]) -> Result<Vec<u8>, PlatformError> {
        (**self).unprotect(blob)
    }
}
