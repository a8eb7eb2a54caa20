//! Sui ed25519 transaction signer

use super::errors::{SuiError, SuiResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};

/// Signature scheme flag for ed25519
const ED25519_FLAG: u8 = 0x00;

/// Intent prefix for a transaction-data message: scope, version, app id
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

/// Blake2b-256 digest
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new().hash_length(32).hash(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// ed25519 key that signs Sui transactions on behalf of a user
pub struct SuiKeypair {
    signing_key: SigningKey,
}

impl SuiKeypair {
    pub fn from_secret(secret: &[u8]) -> SuiResult<Self> {
        let bytes: [u8; 32] = secret
            .try_into()
            .map_err(|_| SuiError::Signing(format!("expected 32-byte secret, got {}", secret.len())))?;
        if bytes.iter().all(|b| *b == 0) {
            return Err(SuiError::Signing("secret key is all zeros".to_string()));
        }
        Ok(Self {
            signing_key: SigningKey::from_bytes(&bytes),
        })
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// `0x` + hex(blake2b256(flag || pubkey))
    pub fn address(&self) -> String {
        let mut preimage = Vec::with_capacity(33);
        preimage.push(ED25519_FLAG);
        preimage.extend_from_slice(&self.public_key());
        format!("0x{}", hex::encode(blake2b256(&preimage)))
    }

    /// Serialized signature `base64(flag || sig || pubkey)` over intent-prefixed bytes
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> String {
        let mut intent_message = Vec::with_capacity(TRANSACTION_INTENT.len() + tx_bytes.len());
        intent_message.extend_from_slice(&TRANSACTION_INTENT);
        intent_message.extend_from_slice(tx_bytes);
        let digest = blake2b256(&intent_message);

        let signature = self.signing_key.sign(&digest);
        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&self.public_key());
        BASE64.encode(serialized)
    }
}

impl std::fmt::Debug for SuiKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiKeypair")
            .field("address", &self.address())
            .finish()
    }
}
