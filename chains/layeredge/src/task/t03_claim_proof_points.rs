use super::{body_message, signing_failed, OperationOutcome};
use crate::client::{timestamp_millis, AccountSession};
use serde_json::{json, Value};

const COMPLETED: &str = "proof submission task completed successfully";

pub async fn claim_proof_points(session: &AccountSession) -> OperationOutcome {
    let timestamp = timestamp_millis();
    let message = format!(
        "I am claiming my proof submission node points for {} at {}",
        session.address(),
        timestamp
    );
    let sign = match session.sign(&message).await {
        Ok(sign) => sign,
        Err(e) => return signing_failed("claiming proof points", e),
    };

    let body = json!({
        "walletAddress": session.address(),
        "timestamp": timestamp,
        "sign": sign,
    });

    match session
        .post("task/proof-submission", body)
        .await
        .and_then(|r| r.body)
    {
        Some(body) if body.get("message").and_then(Value::as_str) == Some(COMPLETED) => {
            OperationOutcome::success("Proof points claimed")
        }
        Some(body) => OperationOutcome::error(format!(
            "Failed to claim proof points: {}",
            body_message(&body)
        )),
        None => OperationOutcome::error("Failed to claim proof points: No response data"),
    }
}
