mod common;

use common::{broken_wallet, capture_logs, test_config, wallet, Reply, RoutedTransport};
use core_logic::{HttpTransport, ProxyConfig, SchedulingMode, TASK_RESULT_TARGET};
use layeredge_project::campaign::{run_task_sequence, with_soft_deadline};
use layeredge_project::{
    AccountSession, CampaignInputs, CampaignRunner, LayerEdgeConfig, OperationOutcome,
    OutcomeStatus, TaskKind, TransportFactory,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

fn happy_api(node_running: bool) -> RoutedTransport {
    let start_timestamp = if node_running { json!(1_700_000_000) } else { json!(null) };
    RoutedTransport::new()
        .route("claim-node-points", Reply::Json(200, json!({ "message": "ok" })))
        .route(
            "card/submit-proof",
            Reply::Json(200, json!({ "success": true, "message": "proof submitted" })),
        )
        .route(
            "task/proof-submission",
            Reply::Json(200, json!({ "message": "proof submission task completed successfully" })),
        )
        .route(
            "node-status",
            Reply::Json(200, json!({ "data": { "startTimestamp": start_timestamp } })),
        )
        .route("/stop", Reply::Json(200, json!({ "message": "stopped" })))
        .route(
            "/start",
            Reply::Json(200, json!({ "message": "node action executed successfully" })),
        )
        .route(
            "task/node-points",
            Reply::Json(200, json!({ "message": "node points task completed successfully" })),
        )
        .route("wallet-details", Reply::Json(200, json!({ "data": { "nodePoints": 10 } })))
}

/// Factory handing out one shared stub and recording the proxy each wallet got.
fn recording_factory(
    transport: Arc<RoutedTransport>,
) -> (TransportFactory, Arc<Mutex<Vec<Option<ProxyConfig>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_factory = seen.clone();
    let factory: TransportFactory = Arc::new(move |proxy: Option<&ProxyConfig>| {
        seen_in_factory.lock().unwrap().push(proxy.cloned());
        Ok(transport.clone() as Arc<dyn HttpTransport>)
    });
    (factory, seen)
}

fn stripped(path: &str) -> &str {
    // Drop the address segment so paths compare across wallets.
    match path.find("/0x") {
        Some(i) => &path[..i],
        None => path,
    }
}

#[tokio::test]
async fn test_full_sequence_runs_in_fixed_order() {
    let transport = happy_api(true).build();
    let session = AccountSession::new(wallet(), transport.clone(), &test_config());

    let steps = run_task_sequence(&session, &TaskKind::ALL, Some(Duration::from_secs(5)), "001").await;

    let names: Vec<&str> = steps.iter().map(|s| s.step).collect();
    assert_eq!(
        names,
        vec![
            "Check-in",
            "Submit proof",
            "Proof points",
            "Node status",
            "Stop node",
            "Connect node",
            "Light node points",
            "Total points",
        ]
    );
    assert!(steps.iter().all(|s| s.outcome.is_success()), "{:?}", steps);

    let paths: Vec<String> = transport.paths();
    let paths: Vec<&str> = paths.iter().map(|p| stripped(p)).collect();
    assert_eq!(
        paths,
        vec![
            "light-node/claim-node-points",
            "card/submit-proof",
            "task/proof-submission",
            "light-node/node-status",
            "light-node/node-action",
            "light-node/node-action",
            "task/node-points",
            "referral/wallet-details",
        ]
    );
    assert!(transport.paths()[4].ends_with("/stop"));
    assert!(transport.paths()[5].ends_with("/start"));
}

#[tokio::test]
async fn test_stopped_node_is_connected_without_stop() {
    let transport = happy_api(false).build();
    let session = AccountSession::new(wallet(), transport.clone(), &test_config());

    let steps = run_task_sequence(&session, &[TaskKind::NodeCycle], None, "001").await;

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].outcome, OperationOutcome::warn("Node not running"));
    assert_eq!(steps[1].outcome, OperationOutcome::success("Node connected"));
    assert!(transport.paths().iter().all(|p| !p.ends_with("/stop")));
}

#[tokio::test]
async fn test_task_set_keeps_fixed_order() {
    let transport = happy_api(true).build();
    let session = AccountSession::new(wallet(), transport.clone(), &test_config());

    let steps = run_task_sequence(
        &session,
        &[TaskKind::CheckPoints, TaskKind::CheckIn],
        None,
        "001",
    )
    .await;

    let names: Vec<&str> = steps.iter().map(|s| s.step).collect();
    assert_eq!(names, vec!["Check-in", "Total points"]);
}

#[tokio::test]
async fn test_steps_continue_after_failures() {
    let transport = RoutedTransport::new()
        .route("claim-node-points", Reply::Down)
        .route("wallet-details", Reply::Json(200, json!({ "data": {} })))
        .build();
    let session = AccountSession::new(wallet(), transport, &test_config());

    let steps = run_task_sequence(
        &session,
        &[TaskKind::CheckIn, TaskKind::CheckPoints],
        None,
        "001",
    )
    .await;

    assert_eq!(steps[0].outcome.status, OutcomeStatus::Error);
    assert_eq!(steps[1].outcome, OperationOutcome::success("Total Points: 0"));
}

#[tokio::test]
async fn test_hanging_submit_proof_hits_soft_deadline() {
    let transport = RoutedTransport::new()
        .route("card/submit-proof", Reply::Hang)
        .route("wallet-details", Reply::Json(200, json!({ "data": { "nodePoints": 1 } })))
        .build();
    let session = AccountSession::new(wallet(), transport, &test_config());

    let start = tokio::time::Instant::now();
    let steps = run_task_sequence(
        &session,
        &[TaskKind::SubmitProof, TaskKind::CheckPoints],
        Some(Duration::from_millis(50)),
        "001",
    )
    .await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(steps[0].outcome, OperationOutcome::error("Submitting proof timed out"));
    assert_eq!(steps[1].outcome, OperationOutcome::success("Total Points: 1"));
}

#[tokio::test]
async fn test_soft_deadline_passes_through_fast_results() {
    let outcome = with_soft_deadline(
        async { OperationOutcome::success("done") },
        Some(Duration::from_secs(1)),
        "timed out",
    )
    .await;
    assert_eq!(outcome, OperationOutcome::success("done"));

    let outcome = with_soft_deadline(
        std::future::pending::<OperationOutcome>(),
        Some(Duration::from_millis(20)),
        "Claiming proof points timed out",
    )
    .await;
    assert_eq!(outcome, OperationOutcome::error("Claiming proof points timed out"));
}

#[tokio::test]
async fn test_proxies_rotate_by_wallet_index() {
    let (factory, seen) = recording_factory(happy_api(false).build());
    let config = LayerEdgeConfig {
        task_set: vec![TaskKind::CheckPoints],
        ..test_config()
    };
    let runner = CampaignRunner::with_transport_factory(config, factory);

    let inputs = CampaignInputs {
        wallets: (0..5).map(|_| wallet()).collect(),
        proxies: vec!["10.0.0.1:8080".to_string(), "10.0.0.2:8080".to_string()],
    };
    let report = runner.run_cycle(inputs).await;

    assert_eq!(report.wallets.len(), 5);
    let hosts: Vec<String> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.as_ref().unwrap().host.clone())
        .collect();
    assert_eq!(
        hosts,
        vec!["10.0.0.1", "10.0.0.2", "10.0.0.1", "10.0.0.2", "10.0.0.1"]
    );
}

#[tokio::test]
async fn test_no_proxies_means_direct_and_sessions_attach_ids() {
    let (factory, seen) = recording_factory(happy_api(false).build());
    let config = LayerEdgeConfig {
        task_set: vec![TaskKind::CheckPoints],
        rotate_sessions: true,
        ..test_config()
    };
    let runner = CampaignRunner::with_transport_factory(config, factory);

    runner
        .run_cycle(CampaignInputs {
            wallets: vec![wallet()],
            proxies: Vec::new(),
        })
        .await;
    runner
        .run_cycle(CampaignInputs {
            wallets: vec![wallet()],
            proxies: vec!["http://u:p@gw.test:7777".to_string()],
        })
        .await;

    let seen = seen.lock().unwrap();
    assert!(seen[0].is_none());
    let session_id = seen[1].as_ref().unwrap().session_id.clone().unwrap();
    assert_eq!(session_id.len(), 8);
}

#[tokio::test]
async fn test_fan_out_isolates_bad_wallets() {
    let (factory, _) = recording_factory(happy_api(false).build());
    let config = LayerEdgeConfig {
        task_set: vec![TaskKind::CheckIn, TaskKind::CheckPoints],
        scheduling_mode: SchedulingMode::FanOut,
        ..test_config()
    };
    let runner = CampaignRunner::with_transport_factory(config, factory);

    let inputs = CampaignInputs {
        wallets: vec![wallet(), broken_wallet(), wallet(), wallet()],
        proxies: vec!["not a proxy".to_string(), "10.0.0.2:80".to_string()],
    };
    let report = runner.run_cycle(inputs).await;

    // Wallets 0 and 2 draw the malformed proxy and are skipped.
    assert_eq!(report.skipped, 2);
    assert_eq!(report.wallets.len(), 2);

    let broken = report.wallets.iter().find(|w| w.index == 1).unwrap();
    assert_eq!(broken.steps[0].outcome.status, OutcomeStatus::Error);
    assert_eq!(broken.steps[1].outcome, OperationOutcome::success("Total Points: 10"));

    let healthy = report.wallets.iter().find(|w| w.index == 3).unwrap();
    assert!(healthy.steps.iter().all(|s| s.outcome.is_success()));
}

#[tokio::test]
async fn test_load_inputs_tolerates_missing_and_corrupt_files() {
    let dir = tempdir().unwrap();
    let wallet_file = dir.path().join("config.json");
    let config = LayerEdgeConfig {
        wallet_file: wallet_file.display().to_string(),
        proxy_file: dir.path().join("proxy.txt").display().to_string(),
        ..test_config()
    };
    let runner = CampaignRunner::new(config);

    let inputs = runner.load_inputs().await;
    assert!(inputs.wallets.is_empty());
    assert!(inputs.proxies.is_empty());

    std::fs::write(&wallet_file, "[{ broken").unwrap();
    assert!(runner.load_inputs().await.wallets.is_empty());
}

#[tokio::test]
async fn test_once_mode_returns_after_one_cycle() {
    let dir = tempdir().unwrap();
    let config = LayerEdgeConfig {
        wallet_file: dir.path().join("config.json").display().to_string(),
        proxy_file: dir.path().join("proxy.txt").display().to_string(),
        ..test_config()
    };
    let runner = CampaignRunner::new(config);

    let token = tokio_util::sync::CancellationToken::new();
    tokio::time::timeout(Duration::from_secs(5), runner.run_forever(token, true))
        .await
        .expect("one cycle over zero wallets finishes quickly")
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_interrupts_cycle_sleep() {
    let dir = tempdir().unwrap();
    let config = LayerEdgeConfig {
        wallet_file: dir.path().join("config.json").display().to_string(),
        proxy_file: dir.path().join("proxy.txt").display().to_string(),
        cycle_interval_secs: 3600,
        ..test_config()
    };
    let runner = CampaignRunner::new(config);

    let token = tokio_util::sync::CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), runner.run_forever(token, false))
        .await
        .expect("shutdown ends the hour-long sleep")
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_interrupts_running_cycle() {
    let dir = tempdir().unwrap();
    let wallet_file = dir.path().join("config.json");
    core_logic::WalletStore::new(&wallet_file)
        .append(&wallet())
        .await
        .unwrap();

    let transport = RoutedTransport::new()
        .route("claim-node-points", Reply::Hang)
        .build();
    let (factory, _) = recording_factory(transport.clone());
    let config = LayerEdgeConfig {
        wallet_file: wallet_file.display().to_string(),
        proxy_file: dir.path().join("proxy.txt").display().to_string(),
        ..test_config()
    };
    let runner = CampaignRunner::with_transport_factory(config, factory);

    let token = tokio_util::sync::CancellationToken::new();
    let cancel = token.clone();
    let watched = transport.clone();
    tokio::spawn(async move {
        while watched.calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
    });

    tokio::time::timeout(Duration::from_secs(2), runner.run_forever(token, false))
        .await
        .expect("shutdown ends a cycle stuck on a hanging request")
        .unwrap();
    assert_eq!(transport.paths(), vec!["light-node/claim-node-points".to_string()]);
}

#[tokio::test]
async fn test_step_outcomes_are_logged_under_result_target() {
    let (logs, _guard) = capture_logs();
    let transport = happy_api(false).build();
    let session = AccountSession::new(wallet(), transport, &test_config());

    run_task_sequence(&session, &[TaskKind::CheckIn], None, "007").await;

    let output = logs.contents();
    let expected = format!("{}: [007] Check-in: SUCCESS", TASK_RESULT_TARGET);
    assert!(output.contains(&expected), "{}", output);
}
