use super::{parse_cooldown, signing_failed, OperationOutcome};
use crate::client::{timestamp_millis, AccountSession};
use serde_json::{json, Value};

/// Body `statusCode` the API uses for "already claimed today".
const COOLDOWN_STATUS: i64 = 405;

pub async fn daily_check_in(session: &AccountSession) -> OperationOutcome {
    let timestamp = timestamp_millis();
    let message = format!(
        "I am claiming my daily node point for {} at {}",
        session.address(),
        timestamp
    );
    let sign = match session.sign(&message).await {
        Ok(sign) => sign,
        Err(e) => return signing_failed("during daily check-in", e),
    };

    let body = json!({
        "sign": sign,
        "timestamp": timestamp,
        "walletAddress": session.address(),
    });

    match session
        .post("light-node/claim-node-points", body)
        .await
        .and_then(|response| response.body)
    {
        Some(body) if body.get("statusCode").and_then(Value::as_i64) == Some(COOLDOWN_STATUS) => {
            let reason = body.get("message").and_then(Value::as_str).unwrap_or_default();
            OperationOutcome::warn(format!("Already checked in: wait {}", parse_cooldown(reason)))
        }
        Some(_) => OperationOutcome::success("Daily check-in successful"),
        None => OperationOutcome::error("Daily check-in failed"),
    }
}
