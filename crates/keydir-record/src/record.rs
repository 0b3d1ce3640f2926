use keydir_types::{KeydirError, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::canonicalize;

/// Attestation payload covering one device registration. The signature over
/// its canonical form binds the key to the account, device, and the moment
/// of upload, not merely the raw key bytes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceKeyRecord {
    #[serde(rename = "deviceid")]
    pub device_id: String,
    /// The key exactly as submitted, URL-safe base64 text.
    pub key: String,
    #[serde(rename = "t")]
    pub timestamp: Timestamp,
    #[serde(rename = "userid")]
    pub user_id: String,
}

/// Attestation payload covering every registered key for one account. An
/// empty `keys` map is a signed statement that the account currently has
/// zero registered keys.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountKeySet {
    #[serde(rename = "t")]
    pub timestamp: Timestamp,
    #[serde(rename = "userid")]
    pub user_id: String,
    pub keys: BTreeMap<String, String>,
}

impl DeviceKeyRecord {
    /// Canonical bytes this record is signed over.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, KeydirError> {
        canonical_payload(self)
    }
}

impl AccountKeySet {
    /// Canonical bytes this key set is signed over.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, KeydirError> {
        canonical_payload(self)
    }
}

fn canonical_payload<T: Serialize>(payload: &T) -> Result<Vec<u8>, KeydirError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| KeydirError::Serialization(e.to_string()))?;
    Ok(canonicalize(&value).into_bytes())
}
