//! Light-node status, stop and (re)connect.

use super::{signing_failed, OperationOutcome};
use crate::client::{timestamp_millis, AccountSession};
use serde_json::{json, Value};

const NODE_STARTED: &str = "node action executed successfully";

/// `success` when the node reports a start timestamp, `warn` otherwise (including no response).
pub async fn check_node_status(session: &AccountSession) -> OperationOutcome {
    let path = format!("light-node/node-status/{}", session.address());
    let running = session
        .get(&path)
        .await
        .and_then(|r| r.body)
        .and_then(|body| body.get("data").and_then(|d| d.get("startTimestamp")).cloned())
        .is_some_and(|ts| !ts.is_null());

    if running {
        OperationOutcome::success("Node running")
    } else {
        OperationOutcome::warn("Node not running")
    }
}

pub async fn stop_node(session: &AccountSession) -> OperationOutcome {
    let response = match node_action(session, "stop", "Node deactivation request").await {
        Ok(body) => body,
        Err(outcome) => return outcome,
    };

    match response {
        Some(_) => OperationOutcome::success("Node stopped"),
        None => OperationOutcome::error("Failed to stop node"),
    }
}

pub async fn connect_node(session: &AccountSession) -> OperationOutcome {
    let response = match node_action(session, "start", "Node activation request").await {
        Ok(body) => body,
        Err(outcome) => return outcome,
    };

    match response {
        Some(body) if body.get("message").and_then(Value::as_str) == Some(NODE_STARTED) => {
            OperationOutcome::success("Node connected")
        }
        _ => OperationOutcome::error("Failed to connect node"),
    }
}

/// Signs `"{prefix} for {addr} at {ms}"` and posts it to the node-action endpoint.
async fn node_action(
    session: &AccountSession,
    action: &str,
    prefix: &str,
) -> Result<Option<Value>, OperationOutcome> {
    let timestamp = timestamp_millis();
    let message = format!("{} for {} at {}", prefix, session.address(), timestamp);
    let sign = session
        .sign(&message)
        .await
        .map_err(|e| signing_failed(&format!("sending node {}", action), e))?;

    let path = format!("light-node/node-action/{}/{}", session.address(), action);
    Ok(session
        .post(&path, json!({ "sign": sign, "timestamp": timestamp }))
        .await
        .and_then(|r| r.body))
}
