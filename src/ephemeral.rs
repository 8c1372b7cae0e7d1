//! In-process substitute for DPAPI using NaCl secretbox (XSalsa20Poly1305)
//!
//! Each [`EphemeralProtector`] draws a random key when it is created and keeps
//! it only in memory. Blobs it produces can be unprotected by the same
//! instance and nothing else, the in-process counterpart of DPAPI's
//! local-machine context.
//!
//! The blob layout is:
//! - nonce: 24 bytes
//! - sealed box: variable length (includes 16-byte Poly1305 MAC)

use crate::error::PlatformError;
use crate::protector::DataProtector;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroizing;

/// Length of key in bytes
const KEY_LEN: usize = 32;

/// Length of nonce in bytes
const NONCE_LEN: usize = 24;

/// Length of the Poly1305 MAC in bytes
const MAC_LEN: usize = 16;

pub struct EphemeralProtector {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl EphemeralProtector {
    pub fn new() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(key.as_mut_slice());
        Self { key }
    }

    fn cipher(&self) -> XSalsa20Poly1305 {
        XSalsa20Poly1305::new(Key::from_slice(self.key.as_slice()))
    }
}

impl Default for EphemeralProtector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EphemeralProtector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralProtector").finish_non_exhaustive()
    }
}

impl DataProtector for EphemeralProtector {
    fn name(&self) -> &'static str {
        "ephemeral"
    }

    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, PlatformError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed_box = self
            .cipher()
            .encrypt(&Nonce::from(nonce), plaintext)
            .map_err(|e| PlatformError::new(format!("secretbox seal failed: {}", e)))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed_box.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&sealed_box);
        Ok(blob)
    }

    fn unprotect(&self, blob: &[u8]) -> Result<Vec<u8>, PlatformError> {
        if blob.len() < NONCE_LEN + MAC_LEN {
            return Err(PlatformError::new(
                "input likely truncated; shorter than nonce and MAC",
            ));
        }
        let (nonce, sealed_box) = blob.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| PlatformError::new("failed to read nonce"))?;

        self.cipher()
            .decrypt(&Nonce::from(nonce), sealed_box)
            .map_err(|_| {
                PlatformError::new("corrupt input, tampered-with data, or blob from another key")
            })
    }
}
