//! The process-held signing authority.
//!
//! Loaded once at startup from a PKCS#8 PEM file holding a P-256 private
//! key and held as immutable shared state for the process lifetime, never
//! reloaded. Every response leaving the directory is signed here; a failed
//! sign call must propagate so no caller ever writes a token derived from
//! one.

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use keydir_types::KeydirError;
use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use tracing::info;

/// Signs canonical payloads into ES256 compact JWS tokens.
pub struct SigningAuthority {
    key: EncodingKey,
    header_b64: String,
}

impl SigningAuthority {
    /// Construct from PKCS#8 PEM bytes holding a P-256 private key.
    pub fn from_pem(pem: &[u8]) -> Result<Self, KeydirError> {
        let key = EncodingKey::from_ec_pem(pem)
            .map_err(|e| KeydirError::Signing(format!("parsing authority key: {e}")))?;
        let header = serde_json::to_vec(&Header::new(Algorithm::ES256))
            .map_err(|e| KeydirError::Serialization(e.to_string()))?;
        Ok(Self {
            key,
            header_b64: URL_SAFE_NO_PAD.encode(header),
        })
    }

    /// Construct from a PEM file on disk. Absence or corruption of the file
    /// is a startup failure, never a runtime one.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, KeydirError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| {
            KeydirError::Signing(format!("reading authority key {}: {e}", path.display()))
        })?;
        let authority = Self::from_pem(&pem)?;
        info!(path = %path.display(), "signing authority loaded");
        Ok(authority)
    }

    /// Sign exactly the given payload bytes into a compact token.
    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, KeydirError> {
        let signing_input = format!("{}.{}", self.header_b64, URL_SAFE_NO_PAD.encode(payload));
        let signature =
            jsonwebtoken::crypto::sign(signing_input.as_bytes(), &self.key, Algorithm::ES256)
                .map_err(|e| KeydirError::Signing(e.to_string()))?;
        Ok(format!("{signing_input}.{signature}").into_bytes())
    }
}

/// Verify a compact token against the authority's public key (SPKI PEM) and
/// return the payload bytes it covers. Used by tests and by clients holding
/// the published key.
pub fn verify_compact(token: &[u8], public_pem: &[u8]) -> Result<Vec<u8>, KeydirError> {
    let token = std::str::from_utf8(token)
        .map_err(|_| KeydirError::Signing("token is not UTF-8".into()))?;
    let mut segments = token.split('.');
    let (header, payload, signature) = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(h), Some(p), Some(s), None) => (h, p, s),
        _ => return Err(KeydirError::Signing("malformed compact token".into())),
    };

    let key = DecodingKey::from_ec_pem(public_pem)
        .map_err(|e| KeydirError::Signing(format!("parsing public key: {e}")))?;
    let message = format!("{header}.{payload}");
    let verified =
        jsonwebtoken::crypto::verify(signature, message.as_bytes(), &key, Algorithm::ES256)
            .map_err(|e| KeydirError::Signing(e.to_string()))?;
    if !verified {
        return Err(KeydirError::Signing("signature verification failed".into()));
    }

    URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| KeydirError::Signing(format!("decoding payload: {e}")))
}

/// A freshly generated authority keypair, PEM-encoded.
pub struct AuthorityKeypair {
    /// PKCS#8 private key PEM, suitable for `SigningAuthority::from_pem`.
    pub private_pem: String,
    /// SPKI public key PEM, published to verifying clients.
    pub public_pem: String,
}

/// Generate a new P-256 authority keypair.
pub fn generate_keypair() -> Result<AuthorityKeypair, KeydirError> {
    let secret = p256::SecretKey::random(&mut OsRng);
    let private_pem = secret
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeydirError::Signing(format!("encoding private key: {e}")))?
        .to_string();
    let public_pem = secret
        .public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeydirError::Signing(format!("encoding public key: {e}")))?;
    Ok(AuthorityKeypair {
        private_pem,
        public_pem,
    })
}
