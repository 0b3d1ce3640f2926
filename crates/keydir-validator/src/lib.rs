//! Identity validation for uploaded key bundles.
//!
//! This is the only authenticity check in front of the store while real
//! caller authentication remains unimplemented upstream, so it is
//! deliberately conservative: ambiguous bundles are rejected, never
//! accepted, and every failure collapses to `false` rather than an error.

use std::io::Cursor;

use pgp::composed::{Deserializable, SignedPublicKey};
use tracing::warn;

mod identity;

pub use identity::{parse_user_id, Identity};

/// Whether `raw_key` is a key bundle that attests the claimed account.
///
/// Accepts only a binary OpenPGP public-key ring in which all of the
/// following hold: exactly one certificate is present; it carries exactly
/// one User ID; that identity's name and comment sub-fields are empty
/// (decorative fields invite impersonation); its email equals
/// `claimed_email`; and `claimed_user_id` equals `claimed_email` (account
/// and email share one namespace).
pub fn valid_key_for_account(claimed_user_id: &str, claimed_email: &str, raw_key: &[u8]) -> bool {
    let mut entities = SignedPublicKey::from_bytes_many(Cursor::new(raw_key));

    let cert = match entities.next() {
        Some(Ok(cert)) => cert,
        Some(Err(e)) => {
            warn!(error = %e, "error reading key ring");
            return false;
        }
        None => {
            warn!("key ring contained no certificates");
            return false;
        }
    };
    if entities.next().is_some() {
        warn!("expected one certificate, got more");
        return false;
    }

    let users = &cert.details.users;
    if users.len() != 1 {
        warn!(count = users.len(), "expected one identity");
        return false;
    }

    let id = parse_user_id(&String::from_utf8_lossy(users[0].id.id()));
    if !id.name.is_empty() || !id.comment.is_empty() {
        warn!("identity carries a name or comment (prohibited)");
        return false;
    }
    if id.email.is_empty() || id.email != claimed_email {
        warn!(
            got = %id.email,
            wanted = %claimed_email,
            "identity email does not agree with the claimed email"
        );
        return false;
    }

    if claimed_user_id != claimed_email {
        warn!(
            user_id = %claimed_user_id,
            email = %claimed_email,
            "claimed account does not equal claimed email"
        );
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgp::composed::{KeyType, SecretKeyParamsBuilder, SignedSecretKey};
    use pgp::ser::Serialize;
    use pgp::types::SecretKeyTrait;

    fn signed_key(user_id: &str) -> (SignedPublicKey, SignedSecretKey) {
        let params = SecretKeyParamsBuilder::default()
            .key_type(KeyType::EdDSA)
            .can_certify(true)
            .can_sign(true)
            .primary_user_id(user_id.to_string())
            .build()
            .unwrap();
        let secret = params.generate().unwrap();
        let signed_secret = secret.sign(String::new).unwrap();
        let public = signed_secret.public_key();
        let signed_public = public.sign(&signed_secret, String::new).unwrap();
        (signed_public, signed_secret)
    }

    fn bundle(user_id: &str) -> Vec<u8> {
        signed_key(user_id).0.to_bytes().unwrap()
    }

    #[test]
    fn accepts_single_bare_email_identity() {
        let raw = bundle("<alice@yahoo.com>");
        assert!(valid_key_for_account(
            "alice@yahoo.com",
            "alice@yahoo.com",
            &raw
        ));
    }

    #[test]
    fn rejects_email_mismatch() {
        let raw = bundle("<bob@yahoo.com>");
        assert!(!valid_key_for_account(
            "alice@yahoo.com",
            "alice@yahoo.com",
            &raw
        ));
    }

    #[test]
    fn rejects_account_email_disagreement() {
        let raw = bundle("<alice@yahoo.com>");
        assert!(!valid_key_for_account(
            "someone-else",
            "alice@yahoo.com",
            &raw
        ));
    }

    #[test]
    fn rejects_identity_with_name() {
        let raw = bundle("Alice <alice@yahoo.com>");
        assert!(!valid_key_for_account(
            "alice@yahoo.com",
            "alice@yahoo.com",
            &raw
        ));
    }

    #[test]
    fn rejects_identity_with_comment() {
        let raw = bundle("(work) <alice@yahoo.com>");
        assert!(!valid_key_for_account(
            "alice@yahoo.com",
            "alice@yahoo.com",
            &raw
        ));
    }

    #[test]
    fn rejects_two_certificates() {
        let mut raw = bundle("<alice@yahoo.com>");
        raw.extend(bundle("<alice@yahoo.com>"));
        assert!(!valid_key_for_account(
            "alice@yahoo.com",
            "alice@yahoo.com",
            &raw
        ));
    }

    #[test]
    fn rejects_two_identities() {
        let (mut public, _secret) = signed_key("<alice@yahoo.com>");
        let extra = public.details.users[0].clone();
        public.details.users.push(extra);
        let raw = public.to_bytes().unwrap();
        assert!(!valid_key_for_account(
            "alice@yahoo.com",
            "alice@yahoo.com",
            &raw
        ));
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(!valid_key_for_account(
            "alice@yahoo.com",
            "alice@yahoo.com",
            b"not a key ring at all"
        ));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(!valid_key_for_account(
            "alice@yahoo.com",
            "alice@yahoo.com",
            b""
        ));
    }
}
