//! # Recording Name Anonymization
//!
//! Stored recordings must never reveal the caller's phone number, yet all recordings from
//! one caller should be recognisable as belonging together. Names are therefore derived
//! from a keyed hash of the phone number:
//!
//! ```text
//! urlsafe_base64(SHA3-512(salt || phone)) + "_" + unix_nanos + ".wav"
//! ```
//!
//! ## Properties:
//! - **Deterministic**: the same salt and phone always give the same digest
//! - **Unlinkable**: without the salt the digest cannot be mapped back to a phone number
//! - **Mostly unique**: the nanosecond suffix separates repeated calls; two recordings
//!   from the same caller finishing in the same nanosecond would share a name and the
//!   later write wins. That risk is accepted.
//!
//! ## Salt Lifetime:
//! The salt is validated once when it is constructed. A [`Salt`] value is proof of a
//! valid salt, so deriving a name cannot fail.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha3::{Digest, Sha3_512};
use thiserror::Error;

/// Shortest salt accepted, in characters.
pub const MIN_SALT_LEN: usize = 32;

/// Random bytes drawn for a generated salt (512 bits).
const GENERATED_SALT_BYTES: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaltError {
    #[error("salt is too short: {len} characters, at least {MIN_SALT_LEN} required")]
    TooShort { len: usize },
}

/// Process-wide secret mixed into every digest.
///
/// `Debug` is redacted so the salt cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt(String);

impl Salt {
    /// Accept an externally supplied salt of at least [`MIN_SALT_LEN`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, SaltError> {
        let value = value.into();
        let len = value.chars().count();
        if len < MIN_SALT_LEN {
            return Err(SaltError::TooShort { len });
        }
        Ok(Self(value))
    }

    /// Draw a fresh salt from the operating system's CSPRNG.
    ///
    /// 64 random bytes in standard base64, i.e. 88 characters. Digests made with a
    /// generated salt are only stable for the lifetime of the process.
    pub fn generate() -> Self {
        let mut buf = [0u8; GENERATED_SALT_BYTES];
        OsRng.fill_bytes(&mut buf);
        Self(STANDARD.encode(buf))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

/// A storage name that does not contain the subject identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymizedName {
    digest: String,
    timestamp_nanos: u128,
}

impl AnonymizedName {
    /// The salted digest part, identical for every recording of one subject.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for AnonymizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}.wav", self.digest, self.timestamp_nanos)
    }
}

/// URL-safe base64 (padded) of SHA3-512 over the salt followed by the subject.
pub fn subject_digest(salt: &Salt, subject: &str) -> String {
    let mut hasher = Sha3_512::new();
    hasher.update(salt.as_bytes());
    hasher.update(subject.as_bytes());
    URL_SAFE.encode(hasher.finalize())
}

/// Derive the storage name for a recording of `subject` finished at `now`.
pub fn derive_name(salt: &Salt, subject: &str, now: SystemTime) -> AnonymizedName {
    let timestamp_nanos = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    AnonymizedName {
        digest: subject_digest(salt, subject),
        timestamp_nanos,
    }
}
