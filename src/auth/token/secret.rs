//! Bearer secrets: generation, redaction, and the digest used as the lookup index.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a secret string presented by a caller.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Draws `len` bytes from the thread-local CSPRNG and encodes them as URL-safe base64.
	pub fn generate(len: usize) -> Self {
		let mut bytes = vec![0_u8; len];

		rand::rng().fill_bytes(&mut bytes);

		Self(URL_SAFE_NO_PAD.encode(bytes))
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// SHA-256 digest of the secret, the only form the store ever sees.
	pub fn digest(&self) -> SecretDigest {
		SecretDigest::of(&self.0)
	}

	/// Leading `len` characters, safe to display for identification.
	pub fn preview(&self, len: usize) -> String {
		self.0.chars().take(len).collect()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Base64 (no padding) SHA-256 digest of a token secret.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretDigest(String);
impl SecretDigest {
	/// Hashes a raw secret.
	pub fn of(secret: &str) -> Self {
		let mut hasher = Sha256::new();

		hasher.update(secret.as_bytes());

		Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
	}

	/// Encoded digest string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn generated_secrets_carry_full_entropy() {
		let a = TokenSecret::generate(32);
		let b = TokenSecret::generate(32);

		// 32 bytes -> 43 base64 characters without padding.
		assert_eq!(a.expose().len(), 43);
		assert_ne!(a, b);
		assert!(a.expose().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
	}

	#[test]
	fn digest_is_stable_and_hides_the_secret() {
		let secret = TokenSecret::new("abc123");

		assert_eq!(secret.digest(), SecretDigest::of("abc123"));
		assert_ne!(secret.digest(), SecretDigest::of("abc124"));
		assert!(!secret.digest().as_str().contains("abc123"));
		assert_eq!(secret.preview(3), "abc");
	}
}
