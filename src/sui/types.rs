//! Sui response types and typed object-change lookup

use super::errors::{SuiError, SuiResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 0x-prefixed Sui object id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Accept `0x` followed by 1 to 64 hex digits
    pub fn parse(raw: &str) -> SuiResult<Self> {
        let hex_part = raw
            .strip_prefix("0x")
            .ok_or_else(|| SuiError::Decode(format!("object id {raw} lacks 0x prefix")))?;
        if hex_part.is_empty()
            || hex_part.len() > 64
            || !hex_part.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(SuiError::Decode(format!("malformed object id {raw}")));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a transaction's `objectChanges`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectChange {
    /// `created`, `mutated`, `transferred`, `deleted`, `wrapped`, `published`
    #[serde(rename = "type")]
    pub change: String,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub object_id: Option<ObjectId>,
}

impl ObjectChange {
    pub fn is_created(&self) -> bool {
        self.change == "created"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEffects {
    pub status: ExecutionStatus,
}

/// `sui_executeTransactionBlock` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub digest: String,
    #[serde(default)]
    pub effects: Option<TransactionEffects>,
    #[serde(default)]
    pub object_changes: Vec<ObjectChange>,
}

impl TransactionResponse {
    /// Fail unless effects report success
    pub fn ensure_success(&self) -> SuiResult<()> {
        match &self.effects {
            Some(effects) if effects.status.status == "success" => Ok(()),
            Some(effects) => Err(SuiError::Execution {
                digest: self.digest.clone(),
                status: effects
                    .status
                    .error
                    .clone()
                    .unwrap_or_else(|| effects.status.status.clone()),
            }),
            None => Err(SuiError::Decode(format!(
                "transaction {} returned no effects",
                self.digest
            ))),
        }
    }
}

/// Objects the bridge flows need to locate in transaction effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    MintRequest,
    BurnRequest,
    MintCap,
    BurnCap,
    PresignCap,
    SignSession,
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::MintRequest => "MintRequest",
            ObjectKind::BurnRequest => "BurnRequest",
            ObjectKind::MintCap => "MintCap",
            ObjectKind::BurnCap => "BurnCap",
            ObjectKind::PresignCap => "PresignCap",
            ObjectKind::SignSession => "SignSession",
        }
    }

    fn in_dwallet_package(&self) -> bool {
        matches!(self, ObjectKind::PresignCap | ObjectKind::SignSession)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully-qualified Move types of every [`ObjectKind`].
///
/// The package ids pin the schema version: objects minted by a different
/// package deployment never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSchema {
    pub bridge_package: String,
    pub bridge_module: String,
    pub dwallet_package: String,
    pub dwallet_module: String,
}

impl ObjectSchema {
    /// `<package>::<module>::<Name>` with the package address normalized
    pub fn type_of(&self, kind: ObjectKind) -> String {
        let (package, module) = if kind.in_dwallet_package() {
            (&self.dwallet_package, &self.dwallet_module)
        } else {
            (&self.bridge_package, &self.bridge_module)
        };
        format!("{}::{}::{}", normalize_address(package), module, kind.name())
    }

    /// The single created object of `kind` in `response`
    pub fn find_created(&self, response: &TransactionResponse, kind: ObjectKind) -> SuiResult<ObjectId> {
        let expected = self.type_of(kind);
        let mut matches = response.object_changes.iter().filter(|change| {
            change.is_created()
                && change
                    .object_type
                    .as_deref()
                    .map(|t| normalize_type(t) == expected)
                    .unwrap_or(false)
        });

        let first = matches.next();
        let extra = matches.count();
        match (first, extra) {
            (Some(change), 0) => change.object_id.clone().ok_or_else(|| {
                SuiError::Decode(format!("{kind} change in {} has no objectId", response.digest))
            }),
            (Some(_), extra) => Err(SuiError::AmbiguousObject {
                kind,
                count: extra + 1,
                digest: response.digest.clone(),
            }),
            (None, _) => Err(SuiError::MissingObject {
                kind,
                digest: response.digest.clone(),
            }),
        }
    }
}

/// Left-pad a 0x address to 64 hex digits
pub fn normalize_address(address: &str) -> String {
    let hex_part = address.strip_prefix("0x").unwrap_or(address);
    format!("0x{:0>64}", hex_part.to_ascii_lowercase())
}

/// Drop generic arguments and normalize the package address of a Move type
pub fn normalize_type(object_type: &str) -> String {
    let base = object_type
        .split_once('<')
        .map(|(base, _)| base)
        .unwrap_or(object_type);
    match base.split_once("::") {
        Some((address, rest)) => format!("{}::{}", normalize_address(address), rest),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ObjectSchema {
        ObjectSchema {
            bridge_package: "0xb1".to_string(),
            bridge_module: "bridge".to_string(),
            dwallet_package: "0xd2".to_string(),
            dwallet_module: "dwallet".to_string(),
        }
    }

    fn response(changes: serde_json::Value) -> TransactionResponse {
        serde_json::from_value(json!({
            "digest": "DIGEST",
            "effects": {"status": {"status": "success"}},
            "objectChanges": changes,
        }))
        .unwrap()
    }

    #[test]
    fn test_find_created_matches_exact_type_ignoring_generics() {
        let r = response(json!([
            {"type": "mutated", "objectType": "0xb1::bridge::BurnCap", "objectId": "0x01"},
            {"type": "created", "objectType": "0xb1::bridge::BurnCapability", "objectId": "0x02"},
            {"type": "created", "objectType": "0x99::bridge::BurnCap", "objectId": "0x03"},
            {"type": "created", "objectType": "0x00000000000000000000000000000000000000000000000000000000000000b1::bridge::BurnCap<0x2::sui::SUI>", "objectId": "0x04"},
            {"type": "published", "packageId": "0x05"}
        ]));

        assert_eq!(
            schema().find_created(&r, ObjectKind::BurnCap).unwrap(),
            ObjectId::parse("0x04").unwrap()
        );
    }

    #[test]
    fn test_find_created_zero_and_many_are_distinct_failures() {
        let r = response(json!([
            {"type": "created", "objectType": "0xd2::dwallet::PresignCap", "objectId": "0x0a"},
            {"type": "created", "objectType": "0xd2::dwallet::PresignCap", "objectId": "0x0b"}
        ]));

        assert_eq!(
            schema().find_created(&r, ObjectKind::PresignCap),
            Err(SuiError::AmbiguousObject {
                kind: ObjectKind::PresignCap,
                count: 2,
                digest: "DIGEST".to_string()
            })
        );
        assert_eq!(
            schema().find_created(&r, ObjectKind::SignSession),
            Err(SuiError::MissingObject {
                kind: ObjectKind::SignSession,
                digest: "DIGEST".to_string()
            })
        );
    }

    #[test]
    fn test_ensure_success_reports_failure_status() {
        let r: TransactionResponse = serde_json::from_value(json!({
            "digest": "BAD",
            "effects": {"status": {"status": "failure", "error": "MoveAbort(4)"}}
        }))
        .unwrap();
        assert_eq!(
            r.ensure_success(),
            Err(SuiError::Execution {
                digest: "BAD".to_string(),
                status: "MoveAbort(4)".to_string()
            })
        );
    }

    #[test]
    fn test_object_id_parse() {
        assert!(ObjectId::parse("0xABC").is_ok());
        assert_eq!(ObjectId::parse("0xABC").unwrap().as_str(), "0xabc");
        assert!(ObjectId::parse("abc").is_err());
        assert!(ObjectId::parse("0x").is_err());
        assert!(ObjectId::parse("0xzz").is_err());
    }
}
