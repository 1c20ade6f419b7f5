//! Shared fixtures for the cross-crate scenario tests.
//!
//! `TestPrivacyEngine` stands in for the zero-knowledge engine. Its tokens
//! are plain JSON that carry just enough to check the protocol wiring:
//! session ids, the blinded claim, witness ids, and per-accumulator sets of
//! revoked witnesses. It proves nothing.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_core::opaque::{
    Accumulator, AttesterPeSession, AttesterPrivateKey, AttesterPublicKey, ClaimerPeSession,
    InitToken, PeAttestation, PePresentation, PePresentationRequest, PeRequest,
    PeVerifierSession, Witness, ZkCredential,
};
use tessera_core::{LoggingConfig, Permissions};
use tessera_credentials::{
    CType, Claim, Credential, DelegationNode, DelegationRootNode, InMemoryLedger,
    PresentationRequirement, PrivacyEngine, PrivacyError,
};
use tessera_identity::{AttestationCapability, Identity};
use tessera_messaging::{open, seal, Message};

/// Install a debug-level subscriber once per test binary.
pub fn init_test_logging() {
    let config = LoggingConfig {
        level: "debug".into(),
        ..Default::default()
    };
    // A second install in the same binary fails, which is fine.
    let _ = tessera_core::logging::init_tracing(&config);
}

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value, PrivacyError> {
    value
        .get(key)
        .ok_or_else(|| PrivacyError::InvalidToken(format!("token has no '{}'", key)))
}

fn expect_eq(a: &Value, b: &Value, what: &str) -> Result<(), PrivacyError> {
    if a != b {
        return Err(PrivacyError::InvalidToken(format!("{} mismatch", what)));
    }
    Ok(())
}

/// Deterministic stand-in for the zero-knowledge credential engine.
#[derive(Default)]
pub struct TestPrivacyEngine {
    counter: AtomicU64,
}

impl TestPrivacyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl PrivacyEngine for TestPrivacyEngine {
    async fn generate_attester_keys(&self) -> Result<AttestationCapability, PrivacyError> {
        let id = self.next_id();
        Ok(AttestationCapability {
            public_key: AttesterPublicKey::new(json!({ "attester": id })),
            private_key: AttesterPrivateKey::new(json!({ "secret": id })),
        })
    }

    async fn start_attestation_session(
        &self,
        attester: &AttestationCapability,
    ) -> Result<(InitToken, AttesterPeSession), PrivacyError> {
        let session = self.next_id();
        Ok((
            InitToken::new(json!({
                "session": session,
                "attester": attester.public_key.as_value(),
            })),
            AttesterPeSession::new(json!({ "session": session })),
        ))
    }

    async fn request_attestation(
        &self,
        claim: &Claim,
        init_token: &InitToken,
        attester_key: &AttesterPublicKey,
    ) -> Result<(ClaimerPeSession, PeRequest), PrivacyError> {
        let init = init_token.as_value();
        expect_eq(field(init, "attester")?, attester_key.as_value(), "attester key")?;
        let blinded = json!({
            "session": field(init, "session")?,
            "ctype": claim.ctype_hash.to_hex(),
            "claim": claim.contents_value(),
        });
        Ok((ClaimerPeSession::new(blinded.clone()), PeRequest::new(blinded)))
    }

    async fn issue_attestation(
        &self,
        attester: &AttestationCapability,
        session: &AttesterPeSession,
        request: &PeRequest,
        accumulator: &Accumulator,
    ) -> Result<(Witness, PeAttestation), PrivacyError> {
        let request = request.as_value();
        expect_eq(
            field(session.as_value(), "session")?,
            field(request, "session")?,
            "session",
        )?;
        expect_eq(
            field(accumulator.as_value(), "attester")?,
            attester.public_key.as_value(),
            "accumulator owner",
        )?;
        let witness = self.next_id();
        Ok((
            Witness::new(json!({ "witness": witness })),
            PeAttestation::new(json!({
                "session": field(request, "session")?,
                "witness": witness,
                "attester": attester.public_key.as_value(),
            })),
        ))
    }

    async fn build_credential(
        &self,
        session: &ClaimerPeSession,
        attestation: &PeAttestation,
    ) -> Result<ZkCredential, PrivacyError> {
        let session = session.as_value();
        let attestation = attestation.as_value();
        expect_eq(
            field(session, "session")?,
            field(attestation, "session")?,
            "session",
        )?;
        Ok(ZkCredential::new(json!({
            "ctype": field(session, "ctype")?,
            "claim": field(session, "claim")?,
            "witness": field(attestation, "witness")?,
            "attester": field(attestation, "attester")?,
        })))
    }

    async fn request_presentation(
        &self,
        requirements: &[PresentationRequirement],
    ) -> Result<(PeVerifierSession, PePresentationRequest), PrivacyError> {
        let challenge = json!({
            "challenge": self.next_id(),
            "requirements": requirements
                .iter()
                .map(|r| json!({ "ctype": r.ctype_hash.to_hex(), "properties": r.properties }))
                .collect::<Vec<_>>(),
        });
        Ok((
            PeVerifierSession::new(challenge.clone()),
            PePresentationRequest::new(challenge),
        ))
    }

    async fn build_combined_presentation(
        &self,
        credentials: &[ZkCredential],
        request: &PePresentationRequest,
        attester_keys: &[AttesterPublicKey],
    ) -> Result<PePresentation, PrivacyError> {
        let request = request.as_value();
        let requirements = field(request, "requirements")?
            .as_array()
            .ok_or_else(|| PrivacyError::InvalidToken("requirements".into()))?;
        if requirements.len() != credentials.len() {
            return Err(PrivacyError::InvalidToken("credential count".into()));
        }

        let mut entries = Vec::with_capacity(credentials.len());
        for (requirement, credential) in requirements.iter().zip(credentials) {
            let credential = credential.as_value();
            expect_eq(field(credential, "ctype")?, field(requirement, "ctype")?, "ctype")?;
            let attester = field(credential, "attester")?;
            if !attester_keys.iter().any(|k| k.as_value() == attester) {
                return Err(PrivacyError::MissingKey(attester.to_string()));
            }
            let claim = field(credential, "claim")?;
            let disclosed: serde_json::Map<String, Value> = field(requirement, "properties")?
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .filter_map(|key| claim.get(key).map(|v| (key.to_string(), v.clone())))
                .collect();
            entries.push(json!({
                "ctype": field(credential, "ctype")?,
                "attester": attester,
                "witness": field(credential, "witness")?,
                "claim": disclosed,
            }));
        }
        Ok(PePresentation::new(json!({
            "challenge": field(request, "challenge")?,
            "credentials": entries,
        })))
    }

    async fn verify_combined_presentation(
        &self,
        proof: &PePresentation,
        session: &PeVerifierSession,
        accumulators: &[Accumulator],
        attester_keys: &[AttesterPublicKey],
    ) -> Result<(bool, Vec<Value>), PrivacyError> {
        let proof = proof.as_value();
        if field(proof, "challenge")? != field(session.as_value(), "challenge")? {
            return Ok((false, Vec::new()));
        }
        let entries = field(proof, "credentials")?
            .as_array()
            .ok_or_else(|| PrivacyError::InvalidToken("credentials".into()))?;

        let mut verified = true;
        let mut claims = Vec::with_capacity(entries.len());
        for entry in entries {
            let attester = field(entry, "attester")?;
            if !attester_keys.iter().any(|k| k.as_value() == attester) {
                return Err(PrivacyError::MissingKey(attester.to_string()));
            }
            let accumulator = accumulators
                .iter()
                .map(Accumulator::as_value)
                .find(|acc| acc.get("attester") == Some(attester))
                .ok_or_else(|| PrivacyError::MissingKey("accumulator".into()))?;
            let witness = field(entry, "witness")?;
            let revoked = field(accumulator, "revoked")?
                .as_array()
                .is_some_and(|ids| ids.contains(witness));
            verified &= !revoked;
            claims.push(field(entry, "claim")?.clone());
        }
        Ok((verified, claims))
    }

    async fn create_accumulator(
        &self,
        attester: &AttestationCapability,
    ) -> Result<Accumulator, PrivacyError> {
        Ok(Accumulator::new(json!({
            "attester": attester.public_key.as_value(),
            "revoked": [],
        })))
    }

    async fn revoke_witness(
        &self,
        attester: &AttestationCapability,
        accumulator: &Accumulator,
        witnesses: &[Witness],
    ) -> Result<Accumulator, PrivacyError> {
        let current = accumulator.as_value();
        expect_eq(
            field(current, "attester")?,
            attester.public_key.as_value(),
            "accumulator owner",
        )?;
        let mut revoked = field(current, "revoked")?
            .as_array()
            .cloned()
            .unwrap_or_default();
        for witness in witnesses {
            let id = field(witness.as_value(), "witness")
                .map_err(|_| PrivacyError::MissingWitness("witness id".into()))?;
            revoked.push(id.clone());
        }
        Ok(Accumulator::new(json!({
            "attester": current["attester"],
            "revoked": revoked,
        })))
    }
}

/// Schema of the CType used across scenarios.
pub fn person_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "age": { "type": "integer" }
        },
        "required": ["name", "age"]
    })
}

/// Register the person CType on `ledger`, owned by `owner`.
pub async fn register_person_ctype(ledger: &InMemoryLedger, owner: &Identity) -> CType {
    let ctype = CType::from_schema(person_schema(), Some(owner.address().clone()))
        .expect("schema is valid");
    ctype.store(ledger, owner).await.expect("ctype stored");
    ctype
}

/// `{name: "Ralfi", age: 12}` owned by `claimer`.
pub fn ralfi_claim(ctype: &CType, claimer: &Identity) -> Claim {
    Claim::new(
        ctype.hash,
        json!({ "name": "Ralfi", "age": 12 }),
        claimer.address().clone(),
    )
    .expect("claim is well formed")
}

/// Root owned by `root_owner` with one ATTEST child for `delegate`, both
/// stored on the ledger.
pub async fn attest_delegation(
    ledger: &InMemoryLedger,
    ctype: &CType,
    root_owner: &Identity,
    delegate: &Identity,
) -> (DelegationRootNode, DelegationNode) {
    let root = DelegationRootNode::new(ctype.hash, root_owner.address().clone());
    root.store(ledger, root_owner).await.expect("root stored");
    let node = DelegationNode::new(root.id, None, delegate.address().clone(), Permissions::ATTEST);
    let signature = node.authorize(root_owner);
    node.store(ledger, root_owner, &signature)
        .await
        .expect("node stored");
    (root, node)
}

/// Send `message` from `sender` to `receiver` through a sealed envelope.
pub fn transmit(message: &Message, sender: &Identity, receiver: &Identity) -> Message {
    let envelope =
        seal(&message.body, sender, &receiver.public_identity()).expect("envelope sealed");
    open(&envelope, &sender.public_identity(), receiver).expect("envelope opened")
}

/// Disclosed property names of a presentation.
pub fn disclosed_keys(credential: &Credential) -> Vec<&str> {
    credential.attributes().keys().map(String::as_str).collect()
}
