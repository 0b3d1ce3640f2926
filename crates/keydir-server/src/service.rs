use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use tracing::{info, warn};

use keydir_authority::SigningAuthority;
use keydir_record::{AccountKeySet, DeviceKeyRecord};
use keydir_store::KeyStore;
use keydir_types::KeydirError;

/// Orchestrates validation, storage, and attestation. Constructed once at
/// startup around the store and the loaded authority; holds no other
/// state.
#[derive(Clone)]
pub struct DirectoryService {
    store: KeyStore,
    authority: Arc<SigningAuthority>,
}

impl DirectoryService {
    pub fn new(store: KeyStore, authority: Arc<SigningAuthority>) -> Self {
        Self { store, authority }
    }

    /// Register or update one device key: decode, validate, persist,
    /// attest. Returns the signed token covering this upload event.
    pub async fn register_key(
        &self,
        user_id: &str,
        device_id: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, KeydirError> {
        let encoded_key = std::str::from_utf8(body)
            .map_err(|e| KeydirError::InvalidEncoding(e.to_string()))?;
        let key = URL_SAFE
            .decode(encoded_key)
            .map_err(|e| KeydirError::InvalidEncoding(e.to_string()))?;

        // The path identifier stands in for both the claimed account and
        // the claimed email until a real caller-authentication scheme
        // exists upstream.
        if !keydir_validator::valid_key_for_account(user_id, user_id, &key) {
            warn!(user_id, device_id, "rejected key bundle for account");
            return Err(KeydirError::Unauthorized);
        }

        let record = DeviceKeyRecord {
            device_id: device_id.to_string(),
            key: encoded_key.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            user_id: user_id.to_string(),
        };
        let payload = record.canonical_bytes()?;

        // One timestamp flows into both the stored entry and the signed
        // record, so the attestation describes exactly what was persisted.
        self.store
            .upsert(user_id, device_id, record.key.as_bytes(), record.timestamp)
            .await?;

        let token = self.authority.sign(&payload)?;
        info!(user_id, device_id, "registered device key");
        Ok(token)
    }

    /// Fetch every registered key for an account as a signed attestation.
    /// An account with no registrations yields a signed empty key set, so
    /// clients can distinguish "zero keys, attested" from a server fault.
    pub async fn fetch_keys(&self, user_id: &str) -> Result<Vec<u8>, KeydirError> {
        let keys: BTreeMap<String, String> = match self.store.fetch_all(user_id).await? {
            Some(entries) => entries
                .into_iter()
                .map(|(device, key)| (device, String::from_utf8_lossy(&key).into_owned()))
                .collect(),
            None => {
                info!(user_id, "no registered keys, issuing negative attestation");
                BTreeMap::new()
            }
        };

        let set = AccountKeySet {
            timestamp: chrono::Utc::now().timestamp(),
            user_id: user_id.to_string(),
            keys,
        };
        self.authority.sign(&set.canonical_bytes()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_service() -> (DirectoryService, String, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("keydir.db");
        let store = KeyStore::open(db_path.to_str().unwrap()).await.unwrap();
        let keypair = keydir_authority::generate_keypair().unwrap();
        let authority =
            Arc::new(SigningAuthority::from_pem(keypair.private_pem.as_bytes()).unwrap());
        (
            DirectoryService::new(store, authority),
            keypair.public_pem,
            dir,
        )
    }

    #[tokio::test]
    async fn bad_base64_is_a_client_fault() {
        let (service, _public, _dir) = test_service().await;
        let err = service
            .register_key("alice@yahoo.com", "device1", b"!!!not base64!!!")
            .await
            .unwrap_err();
        assert!(matches!(err, KeydirError::InvalidEncoding(_)));
    }

    #[tokio::test]
    async fn invalid_bundle_causes_no_storage_mutation() {
        let (service, public, _dir) = test_service().await;
        let body = URL_SAFE.encode(b"valid base64, not a key ring");
        let err = service
            .register_key("alice@yahoo.com", "device1", body.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, KeydirError::Unauthorized));

        // The fetch must attest an empty key set.
        let token = service.fetch_keys("alice@yahoo.com").await.unwrap();
        let payload = keydir_authority::verify_compact(&token, public.as_bytes()).unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(payload["keys"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn fetch_unknown_account_signs_empty_set() {
        let (service, public, _dir) = test_service().await;
        let token = service.fetch_keys("nobody@yahoo.com").await.unwrap();
        let payload = keydir_authority::verify_compact(&token, public.as_bytes()).unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(payload["userid"], "nobody@yahoo.com");
        assert_eq!(payload["keys"], serde_json::json!({}));
        assert!(payload["t"].as_i64().unwrap() > 0);
    }
}
