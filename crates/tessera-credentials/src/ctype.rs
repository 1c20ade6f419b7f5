use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::{canonical_json, Address, CTypeHash};
use tessera_crypto::hash;
use tessera_identity::Identity;

use crate::error::CredentialError;
use crate::ledger::{Ledger, Receipt};

/// Checks claim contents against a CType schema.
pub trait SchemaValidator: Send + Sync {
    /// `Ok(false)` when the contents do not conform; `Err` when the schema
    /// itself is unusable.
    fn validate(&self, contents: &Value, schema: &Value) -> Result<bool, CredentialError>;
}

/// JSON Schema validator backed by the `jsonschema` crate.
///
/// The draft is taken from the schema's `$schema` keyword.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, contents: &Value, schema: &Value) -> Result<bool, CredentialError> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| CredentialError::SchemaValidation(e.to_string()))?;
        let valid = validator.is_valid(contents);
        if !valid {
            for error in validator.iter_errors(contents) {
                tracing::debug!(path = %error.instance_path, error = %error, "claim schema violation");
            }
        }
        Ok(valid)
    }
}

/// A claim type: a JSON schema identified by the hash of its canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CType {
    pub schema: Value,
    #[serde(default)]
    pub owner: Option<Address>,
    pub hash: CTypeHash,
}

impl CType {
    /// Hash `schema` into a CType, optionally owned.
    pub fn from_schema(schema: Value, owner: Option<Address>) -> Result<Self, CredentialError> {
        if !schema.is_object() {
            return Err(CredentialError::InvalidCType(
                "schema must be a JSON object".into(),
            ));
        }
        let hash = Self::hash_schema(&schema);
        Ok(Self {
            schema,
            owner,
            hash,
        })
    }

    /// `H(canonical(schema))`.
    pub fn hash_schema(schema: &Value) -> CTypeHash {
        hash(&canonical_json(schema))
    }

    /// Whether `hash` matches the schema.
    pub fn verify_hash(&self) -> bool {
        Self::hash_schema(&self.schema) == self.hash
    }

    /// Validate claim contents against this CType's schema.
    pub fn verify_claim_structure(
        &self,
        contents: &Value,
        validator: &dyn SchemaValidator,
    ) -> Result<bool, CredentialError> {
        validator.validate(contents, &self.schema)
    }

    /// Register this CType on the ledger under `identity`.
    pub async fn store(
        &self,
        ledger: &dyn Ledger,
        identity: &Identity,
    ) -> Result<Receipt, CredentialError> {
        let receipt = ledger.store_ctype(&self.hash, identity).await?;
        tracing::info!(ctype_hash = %self.hash, owner = %identity.address(), "CType stored");
        Ok(receipt)
    }

    /// Whether the ledger knows this CType.
    pub async fn verify_stored(&self, ledger: &dyn Ledger) -> Result<bool, CredentialError> {
        Ok(ledger.query_ctype(&self.hash).await?.is_some())
    }
}
