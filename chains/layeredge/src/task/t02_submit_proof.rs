use super::{signing_failed, OperationOutcome};
use crate::client::{timestamp_iso, AccountSession};
use core_logic::HttpMethod;
use serde_json::{json, Value};

pub const PROOF_TEXT: &str = "Hello Edgeess i want Submit my Proof";

/// Submits the fixed proof payload. Success is `body.success == true`.
pub async fn submit_proof(session: &AccountSession) -> OperationOutcome {
    let message = format!("I am submitting a proof for LayerEdge at {}", timestamp_iso());
    let signature = match session.sign(&message).await {
        Ok(signature) => signature,
        Err(e) => return signing_failed("submitting proof", e),
    };

    let request = session
        .request(HttpMethod::Post, "card/submit-proof")
        .with_header("Content-Type", "application/json")
        .with_header("Accept", "*/*")
        .with_json(json!({
            "proof": PROOF_TEXT,
            "signature": signature,
            "message": message,
            "walletAddress": session.address(),
        }));

    let body = session.execute(request).await.and_then(|r| r.body);
    let succeeded = body
        .as_ref()
        .and_then(|b| b.get("success"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let server_message = body
        .as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty());

    if succeeded {
        OperationOutcome::success(server_message.unwrap_or("Proof submitted"))
    } else {
        OperationOutcome::error(format!(
            "Proof submission failed: {}",
            server_message.unwrap_or("Server Busy 504..")
        ))
    }
}
