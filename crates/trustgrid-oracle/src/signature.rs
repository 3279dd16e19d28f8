//! Submission signature checks
//!
//! The consensus engine only asks a verifier yes or no. Two verifiers are
//! provided: a presence check, and a BLAKE3 digest over the node key and
//! the submission's canonical fields.

use trustgrid_common::OracleData;

/// Verifies a submission against the submitting node's public key
#[cfg_attr(test, mockall::automock)]
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, data: &OracleData, public_key: &str) -> bool;
}

/// Accepts any non-blank signature
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptySignature;

impl SignatureVerifier for NonEmptySignature {
    fn verify(&self, data: &OracleData, _public_key: &str) -> bool {
        !data.signature.trim().is_empty()
    }
}

/// Expects the signature to be the hex BLAKE3 digest produced by [`Blake3Signature::digest`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Signature;

impl Blake3Signature {
    /// Digest of the submission's canonical fields under `public_key`
    pub fn digest(data: &OracleData, public_key: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        for field in [
            public_key,
            data.id.as_str(),
            data.oracle_id.as_str(),
            data.data_type.as_str(),
            data.data.target_did.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(data.data.value.to_string().as_bytes());
        hasher.update(&[0]);
        hasher.update(&data.timestamp.timestamp_millis().to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Sign `data` in place
    pub fn sign(data: &mut OracleData, public_key: &str) {
        data.signature = Self::digest(data, public_key);
    }
}

impl SignatureVerifier for Blake3Signature {
    fn verify(&self, data: &OracleData, public_key: &str) -> bool {
        data.signature.eq_ignore_ascii_case(&Self::digest(data, public_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trustgrid_common::OraclePayload;

    fn data() -> OracleData {
        OracleData {
            id: "s1".to_string(),
            oracle_id: "node-1".to_string(),
            data_type: "reputation".to_string(),
            data: OraclePayload {
                target_did: "did:web:agent".to_string(),
                value: serde_json::json!(72),
            },
            signature: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_non_empty() {
        let mut d = data();
        assert!(!NonEmptySignature.verify(&d, "pk"));
        d.signature = "  ".to_string();
        assert!(!NonEmptySignature.verify(&d, "pk"));
        d.signature = "anything".to_string();
        assert!(NonEmptySignature.verify(&d, "pk"));
    }

    #[test]
    fn test_blake3_digest_binds_key_and_value() {
        let mut d = data();
        Blake3Signature::sign(&mut d, "pk-1");
        assert!(Blake3Signature.verify(&d, "pk-1"));
        assert!(!Blake3Signature.verify(&d, "pk-2"));

        d.data.value = serde_json::json!(73);
        assert!(!Blake3Signature.verify(&d, "pk-1"));
    }
}
