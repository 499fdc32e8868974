//! Signing and verification of A2A messages.
//!
//! Canonicalisation happens in [`crate::bus::message::A2AMessage::canonical_bytes`]
//! (signature field cleared, stable serde field order, no insignificant
//! whitespace). This module only turns canonical bytes into a signature and
//! back, in one of two interoperable modes:
//!
//! - plain keyed HMAC-SHA256 (`hmac`/`sha2`, the default, fast path), or
//! - PBKDF2-HMAC-SHA256 key stretching (`pbkdf2`) before the HMAC, for
//!   callers that need brute-force resistance on a possibly-short signing
//!   key.
//!
//! Both modes must stay supported for backward-compatible interop;
//! `SigningMode` is a per-call parameter, not a crate feature flag, for
//! exactly that reason.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Which signing algorithm produced (or should verify) a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// Plain keyed HMAC-SHA256. The default — fast, no stretching.
    Hmac,
    /// PBKDF2-HMAC-SHA256 key derivation (over the canonical bytes as
    /// salt) before the HMAC, with the given iteration count.
    Pbkdf2Hmac {
        /// Iteration count, must be >= 100,000.
        iterations: u32,
    },
}

impl SigningMode {
    /// The `security.algorithm` string this mode writes/expects.
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            SigningMode::Hmac => "hmac-sha256",
            SigningMode::Pbkdf2Hmac { .. } => "pbkdf2-hmac-sha256",
        }
    }

    /// Parse an `algorithm` string back into a mode, using `iterations` as
    /// the PBKDF2 round count if the string names that mode.
    pub fn from_algorithm_name(name: &str, iterations: u32) -> Option<Self> {
        match name {
            "hmac-sha256" => Some(SigningMode::Hmac),
            "pbkdf2-hmac-sha256" => Some(SigningMode::Pbkdf2Hmac { iterations }),
            _ => None,
        }
    }
}

/// Derive the effective HMAC key for `mode`, given the configured signing
/// key and the canonical bytes being signed (used as PBKDF2 salt).
fn derive_key(signing_key: &[u8], canonical_bytes: &[u8], mode: SigningMode) -> Vec<u8> {
    match mode {
        SigningMode::Hmac => signing_key.to_vec(),
        SigningMode::Pbkdf2Hmac { iterations } => {
            let mut derived = [0u8; 32];
            pbkdf2_hmac::<Sha256>(signing_key, canonical_bytes, iterations, &mut derived);
            derived.to_vec()
        }
    }
}

/// Sign `canonical_bytes` with `signing_key` under `mode`, returning a
/// base64-encoded signature suitable for `security.signature`.
pub fn sign(signing_key: &[u8], canonical_bytes: &[u8], mode: SigningMode) -> String {
    let key = derive_key(signing_key, canonical_bytes, mode);
    let mut mac =
        HmacSha256::new_from_slice(&key).expect("HMAC accepts keys of any length");
    mac.update(canonical_bytes);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verify `signature_b64` against `canonical_bytes` under `mode`. Constant
/// time: delegates to `hmac`'s `verify_slice`, which compares digests in
/// constant time internally.
pub fn verify(
    signing_key: &[u8],
    canonical_bytes: &[u8],
    signature_b64: &str,
    mode: SigningMode,
) -> bool {
    let Ok(signature) = BASE64.decode(signature_b64) else {
        return false;
    };
    let key = derive_key(signing_key, canonical_bytes, mode);
    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    mac.update(canonical_bytes);
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sign_then_verify_round_trips() {
        let key = b"super-secret-signing-key";
        let bytes = b"{\"messageId\":\"m1\"}";
        let sig = sign(key, bytes, SigningMode::Hmac);
        assert!(verify(key, bytes, &sig, SigningMode::Hmac));
    }

    #[test]
    fn pbkdf2_sign_then_verify_round_trips() {
        let key = b"super-secret-signing-key";
        let bytes = b"{\"messageId\":\"m1\"}";
        let mode = SigningMode::Pbkdf2Hmac { iterations: 100_000 };
        let sig = sign(key, bytes, mode);
        assert!(verify(key, bytes, &sig, mode));
    }

    #[test]
    fn mutating_any_byte_other_than_signature_breaks_verification() {
        let key = b"key";
        let sig = sign(key, b"original", SigningMode::Hmac);
        assert!(!verify(key, b"mutated", &sig, SigningMode::Hmac));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let bytes = b"payload";
        let sig = sign(b"key-a", bytes, SigningMode::Hmac);
        assert!(!verify(b"key-b", bytes, &sig, SigningMode::Hmac));
    }

    #[test]
    fn modes_are_not_cross_compatible() {
        let key = b"key";
        let bytes = b"payload";
        let sig = sign(key, bytes, SigningMode::Hmac);
        assert!(!verify(
            key,
            bytes,
            &sig,
            SigningMode::Pbkdf2Hmac { iterations: 100_000 }
        ));
    }

    #[test]
    fn algorithm_name_round_trips() {
        assert_eq!(
            SigningMode::from_algorithm_name("hmac-sha256", 100_000),
            Some(SigningMode::Hmac)
        );
        assert_eq!(
            SigningMode::from_algorithm_name("pbkdf2-hmac-sha256", 150_000),
            Some(SigningMode::Pbkdf2Hmac { iterations: 150_000 })
        );
        assert_eq!(SigningMode::from_algorithm_name("nonsense", 1), None);
    }
}
