//! Request and response bodies (camelCase JSON)

use crate::orchestrator::{
    BridgeError, BroadcastParams, BurnOutcome, BurnParams, MintOutcome, MintParams,
    VoteMintParams,
};
use crate::sui::ObjectId;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::str::FromStr;

/// `u64` given either as a JSON number or a decimal string
fn flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn parse_object_id(field: &str, raw: &str) -> Result<ObjectId, BridgeError> {
    ObjectId::parse(raw).map_err(|_| BridgeError::validation(format!("{field} {raw:?} is not a 0x-hex object id")))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnBody {
    pub user_id: String,
    #[serde(deserialize_with = "flexible_u64")]
    pub source_amount: u64,
    pub destination_address: Vec<u8>,
    pub nonce_address: String,
    pub coin_type: String,
}

impl BurnBody {
    pub fn into_params(self) -> Result<BurnParams, BridgeError> {
        let nonce_address = Pubkey::from_str(&self.nonce_address).map_err(|_| {
            BridgeError::validation(format!("nonceAddress {:?} is not a pubkey", self.nonce_address))
        })?;
        Ok(BurnParams {
            user_id: self.user_id,
            source_amount: self.source_amount,
            destination_address: self.destination_address,
            nonce_address,
            coin_type: self.coin_type,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BurnResponse {
    pub create_digest: String,
    pub execute_digest: String,
    pub request_id: String,
    pub sign_id: String,
    /// Base58
    pub user_signature: String,
    /// Base64 serialized release message
    pub message: String,
}

impl From<BurnOutcome> for BurnResponse {
    fn from(outcome: BurnOutcome) -> Self {
        Self {
            create_digest: outcome.create_digest,
            execute_digest: outcome.execute_digest,
            request_id: outcome.request_id.to_string(),
            sign_id: outcome.sign_id.to_string(),
            user_signature: outcome.user_signature.to_string(),
            message: BASE64.encode(&outcome.message),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintBody {
    pub user_id: String,
    #[serde(deserialize_with = "flexible_u64")]
    pub source_chain: u64,
    pub source_token: Vec<u8>,
    pub source_decimals: u8,
    pub source_address: Vec<u8>,
    #[serde(deserialize_with = "flexible_u64")]
    pub source_amount: u64,
    pub coin_type: String,
    pub deposit_signature: String,
}

impl From<MintBody> for MintParams {
    fn from(body: MintBody) -> Self {
        Self {
            user_id: body.user_id,
            source_chain: body.source_chain,
            source_token: body.source_token,
            source_decimals: body.source_decimals,
            source_address: body.source_address,
            source_amount: body.source_amount,
            coin_type: body.coin_type,
            deposit_signature: body.deposit_signature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub digest: String,
    pub request_id: String,
    pub mint_cap_id: String,
    pub create_digest: String,
}

impl From<MintOutcome> for MintResponse {
    fn from(outcome: MintOutcome) -> Self {
        Self {
            digest: outcome.digest,
            request_id: outcome.request_id.to_string(),
            mint_cap_id: outcome.mint_cap_id.to_string(),
            create_digest: outcome.create_digest,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastBurnBody {
    pub user_id: String,
    pub request_id: String,
    pub sign_id: String,
    /// Base58
    pub user_signature: String,
    /// Base64
    pub message: String,
}

impl BroadcastBurnBody {
    pub fn into_params(self) -> Result<BroadcastParams, BridgeError> {
        let user_signature = Signature::from_str(&self.user_signature)
            .map_err(|_| BridgeError::validation("userSignature is not a base58 signature"))?;
        let message = BASE64
            .decode(self.message.trim())
            .map_err(|_| BridgeError::validation("message is not base64"))?;
        Ok(BroadcastParams {
            request_id: parse_object_id("requestId", &self.request_id)?,
            sign_id: parse_object_id("signId", &self.sign_id)?,
            user_id: self.user_id,
            user_signature,
            message,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastBurnResponse {
    pub solana_signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNonceBody {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateNonceResponse {
    pub signature: String,
    pub nonce_address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteMintBody {
    pub user_id: String,
    pub request_id: String,
    pub deposit_signature: String,
}

impl VoteMintBody {
    pub fn into_params(self) -> Result<VoteMintParams, BridgeError> {
        Ok(VoteMintParams {
            request_id: parse_object_id("requestId", &self.request_id)?,
            user_id: self.user_id,
            deposit_signature: self.deposit_signature,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteMintResponse {
    pub digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amounts_accept_numbers_and_strings() {
        let body: MintBody = serde_json::from_value(json!({
            "userId": "alice",
            "sourceChain": "1",
            "sourceToken": [1, 2],
            "sourceDecimals": 9,
            "sourceAddress": [3],
            "sourceAmount": 18446744073709551615u64,
            "coinType": "0x2::sui::SUI",
            "depositSignature": "abc"
        }))
        .unwrap();
        assert_eq!(body.source_chain, 1);
        assert_eq!(body.source_amount, u64::MAX);

        let bad = serde_json::from_value::<MintBody>(json!({
            "userId": "alice",
            "sourceChain": "one",
            "sourceToken": [],
            "sourceDecimals": 9,
            "sourceAddress": [],
            "sourceAmount": 1,
            "coinType": "0x2::sui::SUI",
            "depositSignature": "abc"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_broadcast_body_rejects_bad_encodings() {
        let body = BroadcastBurnBody {
            user_id: "alice".to_string(),
            request_id: "0xa1".to_string(),
            sign_id: "0x5e55".to_string(),
            user_signature: Signature::from([7u8; 64]).to_string(),
            message: BASE64.encode([1, 2, 3]),
        };
        let params = body.clone().into_params().unwrap();
        assert_eq!(params.message, vec![1, 2, 3]);
        assert_eq!(params.sign_id.as_str(), "0x5e55");

        let mut bad = body.clone();
        bad.message = "***".to_string();
        assert_eq!(bad.into_params().unwrap_err().code(), Some("VALIDATION"));

        let mut bad = body;
        bad.request_id = "a1".to_string();
        assert_eq!(bad.into_params().unwrap_err().code(), Some("VALIDATION"));
    }
}
