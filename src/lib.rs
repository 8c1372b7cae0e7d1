//! dpapibox - machine-scoped data protection for buffers and files
//!
//! A thin wrapper over the Windows Data Protection API in the local-machine
//! context. The crate performs no cryptography itself: it validates input,
//! calls the platform's protect/unprotect pair, copies the result out of
//! platform-owned memory, and does whole-file read/transform/write round
//! trips.
//!
//! Blobs are opaque and platform-defined; no header or version is added.
//!
//! ```no_run
//! use std::path::Path;
//!
//! dpapibox::initialize(false)?;
//! let blob = dpapibox::protect(b"secret")?;
//! assert_eq!(dpapibox::unprotect(&blob)?, b"secret");
//!
//! dpapibox::protect_file(Path::new("config.json"), None)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The backend is pluggable through [`DataProtector`]; [`EphemeralProtector`]
//! provides an in-process substitute for hosts without DPAPI.

#![deny(unsafe_code)]

pub mod dpapi;
pub mod ephemeral;
pub mod error;
pub mod facade;
pub mod file_ops;
pub mod logging;
pub mod protector;

pub use dpapi::Dpapi;
pub use ephemeral::EphemeralProtector;
pub use error::{
    EnvironmentError, ErrorCategory, FileProtectionError, PlatformError, ProtectionError,
};
pub use facade::{Facade, protect, protect_file, unprotect, unprotect_file};
pub use file_ops::WriteMode;
pub use protector::DataProtector;

use logging::verbose;

/// Record the verbose logging preference and check that the host is supported.
///
/// Call once at startup, before spawning concurrent work. The check is
/// advisory: the other entry points do not consult it and simply fail with
/// [`ProtectionError::PlatformRejected`] where DPAPI is unavailable.
pub fn initialize(verbose: bool) -> Result<(), EnvironmentError> {
    logging::set_verbose(verbose);

    if !cfg!(windows) {
        verbose!(
            "unsupported OS {} detected; this crate only works on windows",
            std::env::consts::OS
        );
        return Err(EnvironmentError::UnsupportedPlatform {
            os: std::env::consts::OS,
        });
    }

    verbose!("initialization successful, running on windows");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(verbose)]
    fn test_initialize_records_verbose_flag() {
        let _ = initialize(true);
        assert!(logging::is_verbose());

        let _ = initialize(false);
        assert!(!logging::is_verbose());
    }

    #[test]
    #[serial(verbose)]
    #[cfg(not(windows))]
    fn test_initialize_rejects_other_platforms() {
        let err = initialize(false).unwrap_err();
        assert_eq!(
            err,
            EnvironmentError::UnsupportedPlatform {
                os: std::env::consts::OS
            }
        );
    }

    #[test]
    #[serial(verbose)]
    #[cfg(windows)]
    fn test_initialize_succeeds_on_windows() {
        initialize(false).unwrap();
    }
}
