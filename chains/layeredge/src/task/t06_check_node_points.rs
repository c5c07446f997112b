use super::OperationOutcome;
use crate::client::AccountSession;
use serde_json::Value;

/// Total node points; a body without `data.nodePoints` counts as 0.
pub async fn check_node_points(session: &AccountSession) -> OperationOutcome {
    let path = format!("referral/wallet-details/{}", session.address());
    match session.get(&path).await.and_then(|r| r.body) {
        Some(body) => {
            let points = body
                .get("data")
                .and_then(|d| d.get("nodePoints"))
                .filter(|p| !p.is_null())
                .map(render_points)
                .unwrap_or_else(|| "0".to_string());
            OperationOutcome::success(format!("Total Points: {}", points))
        }
        None => OperationOutcome::error("Failed to check total points"),
    }
}

fn render_points(points: &Value) -> String {
    match points {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "0".to_string(),
    }
}
