//! Windows DPAPI backend (CryptProtectData / CryptUnprotectData).
//!
//! Always runs in the local-machine context: any process on the same host can
//! unprotect the blob, and no other host can. `CRYPTPROTECT_UI_FORBIDDEN` is
//! always set so a call never blocks on a prompt. No description or entropy
//! is supplied.
//!
//! On every other platform the backend exists but each call fails with
//! [`PlatformError::unavailable`].

use crate::error::PlatformError;
use crate::protector::DataProtector;

/// The native protect/unprotect primitive pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dpapi;

impl DataProtector for Dpapi {
    fn name(&self) -> &'static str {
        "dpapi"
    }

    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, PlatformError> {
        imp::protect(plaintext)
    }

    fn unprotect(&self, blob: &[u8]) -> Result<Vec<u8>, PlatformError> {
        imp::unprotect(blob)
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
mod imp {
    use super::PlatformError;
    use core::ffi::c_void;
    use std::{io, ptr, slice};
    use windows_sys::Win32::Foundation::LocalFree;
    // `DATA_BLOB` is an alias of `CRYPT_INTEGER_BLOB` in the Win32 headers.
    use windows_sys::Win32::Security::Cryptography::{
        CRYPT_INTEGER_BLOB, CRYPTPROTECT_LOCAL_MACHINE, CRYPTPROTECT_UI_FORBIDDEN,
        CryptProtectData, CryptUnprotectData,
    };
    use zeroize::Zeroize;

    type DataBlob = CRYPT_INTEGER_BLOB;

    const FLAGS: u32 = CRYPTPROTECT_LOCAL_MACHINE | CRYPTPROTECT_UI_FORBIDDEN;

    fn blob_from_slice(bytes: &[u8]) -> Result<DataBlob, PlatformError> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            PlatformError::new(format!(
                "input of {} bytes exceeds the DPAPI size limit",
                bytes.len()
            ))
        })?;
        Ok(DataBlob {
            cbData: len,
            pbData: bytes.as_ptr() as *mut u8,
        })
    }

    /// Output buffer allocated by DPAPI, released with `LocalFree` exactly
    /// once when dropped. Plaintext buffers are wiped before release.
    struct LocalBlob {
        blob: DataBlob,
        wipe: bool,
    }

    impl LocalBlob {
        fn new(wipe: bool) -> Self {
            Self {
                blob: DataBlob {
                    cbData: 0,
                    pbData: ptr::null_mut(),
                },
                wipe,
            }
        }

        fn as_slice(&self) -> &[u8] {
            if self.blob.pbData.is_null() {
                return &[];
            }
            // SAFETY: on success DPAPI hands us `cbData` initialised bytes at
            // `pbData`, valid until we LocalFree them in Drop.
            unsafe { slice::from_raw_parts(self.blob.pbData, self.blob.cbData as usize) }
        }
    }

    impl Drop for LocalBlob {
        fn drop(&mut self) {
            if self.blob.pbData.is_null() {
                return;
            }
            if self.wipe {
                // SAFETY: same allocation as `as_slice`, and we hold the only reference.
                let plaintext = unsafe {
                    slice::from_raw_parts_mut(self.blob.pbData, self.blob.cbData as usize)
                };
                plaintext.zeroize();
            }
            // SAFETY: pbData was allocated by DPAPI via LocalAlloc and is freed only here.
            unsafe {
                LocalFree(self.blob.pbData as *mut c_void);
            }
            self.blob.pbData = ptr::null_mut();
        }
    }

    /// Description string that `CryptUnprotectData` allocates for us.
    struct LocalString(*mut u16);

    impl Drop for LocalString {
        fn drop(&mut self) {
            if !self.0.is_null() {
                // SAFETY: allocated by DPAPI via LocalAlloc and freed only here.
                unsafe {
                    LocalFree(self.0 as *mut c_void);
                }
                self.0 = ptr::null_mut();
            }
        }
    }

    fn last_error(function: &str) -> PlatformError {
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) => PlatformError::with_code(code, format!("{function} failed: {err}")),
            None => PlatformError::new(format!("{function} failed: {err}")),
        }
    }

    pub(super) fn protect(plaintext: &[u8]) -> Result<Vec<u8>, PlatformError> {
        let mut input = blob_from_slice(plaintext)?;
        let mut output = LocalBlob::new(false);

        // SAFETY: `input` borrows `plaintext` for the duration of the call and
        // DPAPI does not write through it. `output.blob` is a valid out-param.
        // The description is optional and left null.
        let ok = unsafe {
            CryptProtectData(
                &mut input,
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                FLAGS,
                &mut output.blob,
            )
        };
        if ok == 0 {
            return Err(last_error("CryptProtectData"));
        }

        Ok(output.as_slice().to_vec())
    }

    pub(super) fn unprotect(blob: &[u8]) -> Result<Vec<u8>, PlatformError> {
        let mut input = blob_from_slice(blob)?;
        let mut output = LocalBlob::new(true);
        let mut description = LocalString(ptr::null_mut());

        // SAFETY: as in `protect`; `description.0` is a valid out-param that
        // DPAPI may fill with a LocalAlloc'd string.
        let ok = unsafe {
            CryptUnprotectData(
                &mut input,
                &mut description.0,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                FLAGS,
                &mut output.blob,
            )
        };
        if ok == 0 {
            return Err(last_error("CryptUnprotectData"));
        }

        Ok(output.as_slice().to_vec())
    }
}

#[cfg(not(windows))]
mod imp {
    use super::PlatformError;

    pub(super) fn protect(_plaintext: &[u8]) -> Result<Vec<u8>, PlatformError> {
        Err(PlatformError::unavailable())
    }

    pub(super) fn unprotect(_blob: &[u8]) -> Result<Vec<u8>, PlatformError> {
        Err(PlatformError::unavailable())
    }
}
