use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tessera_core::{Address, CTypeHash};

use crate::ctype::{CType, SchemaValidator};
use crate::error::CredentialError;

/// Compressed claim: `[contents, cTypeHash, owner]`.
pub type CompressedClaim = (BTreeMap<String, Value>, CTypeHash, Option<Address>);

/// A set of asserted property values about the owner, tied to a CType.
///
/// `owner` is `None` only after the owner has been redacted from a
/// presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub ctype_hash: CTypeHash,
    pub contents: BTreeMap<String, Value>,
    #[serde(default)]
    pub owner: Option<Address>,
}

impl Claim {
    /// Build a claim from a JSON object of properties.
    pub fn new(
        ctype_hash: CTypeHash,
        contents: Value,
        owner: Address,
    ) -> Result<Self, CredentialError> {
        let Value::Object(map) = contents else {
            return Err(CredentialError::InvalidClaim(
                "claim contents must be a JSON object".into(),
            ));
        };
        if map.keys().any(|key| key.is_empty()) {
            return Err(CredentialError::InvalidClaim(
                "claim property names must not be empty".into(),
            ));
        }
        Ok(Self {
            ctype_hash,
            contents: map.into_iter().collect(),
            owner: Some(owner),
        })
    }

    /// Build a claim for `ctype`, checking the contents against its schema.
    pub fn from_ctype(
        ctype: &CType,
        contents: Value,
        owner: Address,
        validator: &dyn SchemaValidator,
    ) -> Result<Self, CredentialError> {
        if !ctype.verify_claim_structure(&contents, validator)? {
            return Err(CredentialError::SchemaMismatch(ctype.hash));
        }
        Self::new(ctype.hash, contents, owner)
    }

    /// Contents as a JSON object.
    pub fn contents_value(&self) -> Value {
        Value::Object(
            self.contents
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Positional `[contents, cTypeHash, owner]` form.
    pub fn compress(&self) -> CompressedClaim {
        (self.contents.clone(), self.ctype_hash, self.owner.clone())
    }

    /// Inverse of [`Claim::compress`].
    pub fn decompress(compressed: CompressedClaim) -> Self {
        let (contents, ctype_hash, owner) = compressed;
        Self {
            ctype_hash,
            contents,
            owner,
        }
    }
}
