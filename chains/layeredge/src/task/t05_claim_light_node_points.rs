use super::{body_message, signing_failed, OperationOutcome};
use crate::client::{timestamp_millis, AccountSession};
use serde_json::{json, Value};

const COMPLETED: &str = "node points task completed successfully";

pub async fn claim_light_node_points(session: &AccountSession) -> OperationOutcome {
    let timestamp = timestamp_millis();
    let message = format!(
        "I am claiming my light node run task node points for {} at {}",
        session.address(),
        timestamp
    );
    let sign = match session.sign(&message).await {
        Ok(sign) => sign,
        Err(e) => return signing_failed("claiming light node points", e),
    };

    let body = json!({
        "walletAddress": session.address(),
        "timestamp": timestamp,
        "sign": sign,
    });

    match session.post("task/node-points", body).await.and_then(|r| r.body) {
        Some(body) if body.get("message").and_then(Value::as_str) == Some(COMPLETED) => {
            OperationOutcome::success("Light node points claimed")
        }
        Some(body) => OperationOutcome::error(format!(
            "Failed to claim light node points: {}",
            body_message(&body)
        )),
        None => OperationOutcome::error("Failed to claim light node points: No response data"),
    }
}
