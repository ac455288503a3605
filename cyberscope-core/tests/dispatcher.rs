mod support;

use std::sync::Arc;

use cyberscope_core::{
    LaunchOutcome, ScanError,
    model::{ScanStatus, ScanType, SessionId},
};
use support::{
    DENIED_DIAGNOSTIC, FakeScanner, REMEDIATION, ScannerBehavior, THREE_OPEN_PORTS, engine_with,
};
use tokio::sync::Notify;

fn expect_launched(outcome: LaunchOutcome) -> cyberscope_core::ScanHandle {
    match outcome {
        LaunchOutcome::Launched(handle) => handle,
        LaunchOutcome::Rejected { reason, .. } => panic!("unexpected rejection: {reason}"),
    }
}

#[tokio::test]
async fn successful_scan_completes_with_findings() {
    let scanner = Arc::new(FakeScanner::new(ScannerBehavior::Report(THREE_OPEN_PORTS.into())));
    let engine = engine_with(scanner.clone(), true);

    let submitted = engine.submit_scan("192.168.1.20", ScanType::Basic).await.unwrap();
    assert!(submitted.target.validation.is_private);
    assert_eq!(submitted.target.warning(), None);

    let handle = expect_launched(submitted.launch);
    handle.wait().await.unwrap();

    let session = engine.get_session(submitted.session.id).await.unwrap();
    assert_eq!(session.status, ScanStatus::Completed);
    assert_eq!(session.progress, 100.0);
    assert!(session.completed_at.is_some());
    assert!(session.error_message.is_none());

    let findings = engine.get_findings(session.id).await.unwrap();
    let ports: Vec<u16> = findings.iter().map(|f| f.port).collect();
    assert_eq!(ports, vec![22, 80, 443]);

    let finding = engine.get_finding(findings[1].id).await.unwrap();
    assert_eq!(finding.version.as_deref(), Some("nginx 1.18.0"));
    assert_eq!(scanner.calls(), 1);
    assert!(engine.in_flight().is_empty());
}

#[tokio::test]
async fn double_start_runs_exactly_one_execution() {
    let gate = Arc::new(Notify::new());
    let scanner = Arc::new(FakeScanner::gated(
        ScannerBehavior::Report(THREE_OPEN_PORTS.into()),
        gate.clone(),
    ));
    let engine = engine_with(scanner.clone(), true);

    let target = engine.register_target("10.1.2.3").await.unwrap();
    let session = engine.create_session(target.target.id, ScanType::Quick).await.unwrap();

    let first = expect_launched(engine.start_scan(session.id, "10.1.2.3").await.unwrap());
    let second = engine.start_scan(session.id, "10.1.2.3").await;
    assert!(matches!(second, Err(ScanError::AlreadyRunning(id)) if id == session.id));
    assert!(engine.in_flight().is_claimed(&session.id));

    gate.notify_one();
    first.wait().await.unwrap();

    assert_eq!(scanner.calls(), 1);
    assert_eq!(engine.get_session(session.id).await.unwrap().status, ScanStatus::Completed);
    assert_eq!(engine.get_findings(session.id).await.unwrap().len(), 3);

    let third = engine.start_scan(session.id, "10.1.2.3").await;
    assert!(matches!(third, Err(ScanError::SessionTerminal(_))));
    assert_eq!(scanner.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_launch_once_and_persist_one_finding_set() {
    let gate = Arc::new(Notify::new());
    let scanner = Arc::new(FakeScanner::gated(
        ScannerBehavior::Report(THREE_OPEN_PORTS.into()),
        gate.clone(),
    ));
    let engine = engine_with(scanner.clone(), true);

    let target = engine.register_target("10.1.2.4").await.unwrap();
    let session = engine.create_session(target.target.id, ScanType::Basic).await.unwrap();

    let (left, right) = tokio::join!(
        engine.start_scan(session.id, "10.1.2.4"),
        engine.start_scan(session.id, "10.1.2.4"),
    );

    let mut handles = Vec::new();
    let mut rejected = 0;
    for result in [left, right] {
        match result {
            Ok(outcome) => handles.push(expect_launched(outcome)),
            Err(ScanError::AlreadyRunning(id)) => {
                assert_eq!(id, session.id);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(handles.len(), 1);
    assert_eq!(rejected, 1);

    gate.notify_one();
    for handle in handles {
        handle.wait().await.unwrap();
    }

    assert_eq!(scanner.calls(), 1);
    let stored = engine.get_session(session.id).await.unwrap();
    assert_eq!(stored.status, ScanStatus::Completed);
    assert_eq!(stored.progress, 100.0);
    assert_eq!(engine.get_findings(session.id).await.unwrap().len(), 3);
    assert!(engine.in_flight().is_empty());
}

#[tokio::test]
async fn privilege_denied_fails_session_with_remediation() {
    let scanner = Arc::new(FakeScanner::new(ScannerBehavior::Report(THREE_OPEN_PORTS.into())));
    let engine = engine_with(scanner.clone(), false);

    let submitted = engine.submit_scan("192.168.1.1", ScanType::Basic).await.unwrap();
    let LaunchOutcome::Rejected { session, reason } = submitted.launch else {
        panic!("expected pre-flight rejection");
    };

    assert!(reason.starts_with(&format!("Insufficient privileges: {DENIED_DIAGNOSTIC}\n\n")));
    assert!(reason.contains(REMEDIATION));

    let stored = engine.get_session(session.id).await.unwrap();
    assert_eq!(stored.status, ScanStatus::Failed);
    assert_eq!(stored.progress, 0.0);
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.error_message.as_deref(), Some(reason.as_str()));
    assert!(engine.get_findings(session.id).await.unwrap().is_empty());

    assert_eq!(scanner.calls(), 0);
    assert!(engine.in_flight().is_empty());
}

#[tokio::test]
async fn malformed_report_fails_session() {
    let scanner = Arc::new(FakeScanner::new(ScannerBehavior::Report(
        "<nmaprun><host><ports>".into(),
    )));
    let engine = engine_with(scanner, true);

    let submitted = engine.submit_scan("10.0.0.9", ScanType::Basic).await.unwrap();
    expect_launched(submitted.launch).wait().await.unwrap();

    let session = engine.get_session(submitted.session.id).await.unwrap();
    assert_eq!(session.status, ScanStatus::Failed);
    assert!(session.completed_at.is_some());
    let message = session.error_message.unwrap();
    assert!(message.starts_with("Malformed scan report"), "{message}");
    assert!(session.progress >= 70.0 && session.progress < 100.0);
    assert!(engine.get_findings(session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn tool_failure_and_timeout_are_recorded() {
    for (behavior, prefix) in [
        (ScannerBehavior::ToolFailure("exit status 1".into()), "Scanner invocation failed"),
        (ScannerBehavior::Timeout, "Scan timed out after 30s"),
    ] {
        let engine = engine_with(Arc::new(FakeScanner::new(behavior)), true);
        let submitted = engine.submit_scan("10.0.0.10", ScanType::Basic).await.unwrap();
        expect_launched(submitted.launch).wait().await.unwrap();

        let session = engine.get_session(submitted.session.id).await.unwrap();
        assert_eq!(session.status, ScanStatus::Failed);
        assert_eq!(session.progress, 10.0);
        assert!(session.error_message.unwrap().starts_with(prefix));
    }
}

#[tokio::test]
async fn public_targets_carry_a_warning() {
    let engine = engine_with(
        Arc::new(FakeScanner::new(ScannerBehavior::Report(THREE_OPEN_PORTS.into()))),
        true,
    );
    let submitted = engine.submit_scan("scanme.nmap.org", ScanType::Quick).await.unwrap();
    assert!(submitted.target.warning().is_some());
    expect_launched(submitted.launch).wait().await.unwrap();
}

#[tokio::test]
async fn invalid_and_unknown_inputs_are_synchronous_errors() {
    let engine = engine_with(
        Arc::new(FakeScanner::new(ScannerBehavior::Timeout)),
        true,
    );

    assert!(matches!(
        engine.submit_scan("not a host!", ScanType::Basic).await,
        Err(ScanError::Validation(_))
    ));
    assert!(matches!(
        engine.start_scan(SessionId::new(), "10.0.0.1").await,
        Err(ScanError::NotFound(_))
    ));
    assert!(matches!(
        engine
            .create_session(cyberscope_core::model::TargetId::new(), ScanType::Basic)
            .await,
        Err(ScanError::NotFound(_))
    ));
    assert!(engine.in_flight().is_empty());
}

#[tokio::test]
async fn targets_are_deduplicated_and_sessions_listed_newest_first() {
    let engine = engine_with(
        Arc::new(FakeScanner::new(ScannerBehavior::Report(THREE_OPEN_PORTS.into()))),
        true,
    );

    let a = engine.register_target(" 192.168.5.5 ").await.unwrap();
    let b = engine.register_target("192.168.5.5").await.unwrap();
    assert_eq!(a.target.id, b.target.id);

    let first = engine.create_session(a.target.id, ScanType::Basic).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = engine.create_session(a.target.id, ScanType::Full).await.unwrap();

    let recent = engine.recent_sessions(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, second.id);
    assert_eq!(recent[1].id, first.id);

    let handle = expect_launched(engine.start_session(first.id).await.unwrap());
    handle.wait().await.unwrap();
    assert_eq!(engine.get_session(first.id).await.unwrap().status, ScanStatus::Completed);
}
