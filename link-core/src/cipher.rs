//! Nonce-prefixed XOR stream cipher (§3, §4.2).
//!
//! Deliberately weak — demonstrative confidentiality only, not suitable for
//! real traffic. Grounded in `original_source/Matlab/shared/crypto_utils.py`:
//! `keystream = nonce + KEY`, ciphertext = `nonce ‖ XOR(plaintext, keystream)`.

use crate::errors::CipherError;
use rand::RngCore;

const NONCE_LEN: usize = 4;

/// The process-wide demonstration key (§4.2). Two communicating endpoints
/// must share a key; this is the fallback when none is configured.
pub const DEFAULT_KEY: &[u8] = b"link-emu-default-key";

/// A cipher instance bound to an explicit key. No global/static state — each
/// endpoint constructs and owns its own instance (§9 redesign note).
#[derive(Debug, Clone)]
pub struct Cipher {
    key: Vec<u8>,
}

impl Cipher {
    /// Construct a cipher with an explicit key. `key` must be >= 8 bytes.
    pub fn new(key: Vec<u8>) -> Result<Self, CipherError> {
        if key.len() < 8 {
            return Err(CipherError::KeyTooShort { actual: key.len() });
        }
        Ok(Self { key })
    }

    /// Construct a cipher using the built-in demonstration key.
    pub fn with_default_key() -> Self {
        Self { key: DEFAULT_KEY.to_vec() }
    }

    /// Encrypt `plaintext`, drawing a fresh 4-byte nonce from `rng`.
    /// Output is `nonce ‖ ciphertext`.
    pub fn cipher(&self, plaintext: &[u8], rng: &mut impl RngCore) -> Vec<u8> {
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        let mut out = Vec::with_capacity(NONCE_LEN + plaintext.len());
        out.extend_from_slice(&nonce);
        out.extend(self.xor_with_keystream(&nonce, plaintext));
        out
    }

    /// Decrypt a `nonce ‖ ciphertext` blob. Fails `TooShort` on < 5 bytes.
    pub fn decipher(&self, blob: &[u8]) -> Result<Vec<u8>, CipherError> {
        if blob.len() < NONCE_LEN + 1 {
            return Err(CipherError::TooShort { actual: blob.len() });
        }
        let nonce: [u8; NONCE_LEN] = blob[..NONCE_LEN].try_into().unwrap();
        Ok(self.xor_with_keystream(&nonce, &blob[NONCE_LEN..]))
    }

    /// `keystream[i] = (nonce ‖ key)[i mod (4 + |key|)]`.
    fn xor_with_keystream(&self, nonce: &[u8; NONCE_LEN], data: &[u8]) -> Vec<u8> {
        let period = NONCE_LEN + self.key.len();
        data.iter()
            .enumerate()
            .map(|(i, &b)| {
                let pos = i % period;
                let key_byte = if pos < NONCE_LEN { nonce[pos] } else { self.key[pos - NONCE_LEN] };
                b ^ key_byte
            })
            .collect()
    }
}

impl Default for Cipher {
    fn default() -> Self {
        Self::with_default_key()
    }
}
