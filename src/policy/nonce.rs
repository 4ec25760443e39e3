//! Per-request CSP nonces.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// A random, URL-safe token for `'nonce-…'` source expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nonce(String);

impl Nonce {
    /// Lower bound on entropy, in bytes.
    pub const MIN_BYTES: usize = 16;

    /// Default entropy, in bytes.
    pub const DEFAULT_BYTES: usize = 90;

    /// Upper bound on entropy, in bytes.
    pub const MAX_BYTES: usize = 1024;

    /// Draw `bytes` random bytes (clamped to [`Self::MIN_BYTES`]..=[`Self::MAX_BYTES`])
    /// and encode them as unpadded URL-safe base64.
    pub fn generate(bytes: usize) -> Self {
        let mut buf = vec![0u8; bytes.clamp(Self::MIN_BYTES, Self::MAX_BYTES)];
        rand::thread_rng().fill_bytes(&mut buf);
        Self(URL_SAFE_NO_PAD.encode(buf))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The CSP source expression, e.g. `'nonce-abc'`.
    pub fn source_expression(&self) -> String {
        format!("'nonce-{}'", self.0)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
