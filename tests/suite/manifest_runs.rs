//! End-to-end manifest runs under a paused clock.
//!
//! Timestamps are virtual milliseconds since `bootstrap`; the default
//! warm-up puts the first item at 125ms.

use std::io::Write;
use std::time::Duration;

use ignite_cli::{Manifest, RunOutcome};
use ignite_engine::{BootConfig, BootEvent, BootstrapError, ResolveError};
use ignite_types::{MissingMethodPolicy, Phase, SchedulerId, SchedulerState};

use crate::common::{drained_phases, item_starts, overruns, run, run_with};

const STAGED: &str = r#"
    root = "app"

    [[targets]]
    name = "app"
    methods = [{ name = "ready" }]

    [[targets]]
    name = "db"
    methods = [{ name = "connect", delay_ms = 40 }]

    [[targets]]
    name = "cache"
    methods = [{ name = "warm", delay_ms = 10 }, { name = "prime", delay_ms = 20 }]

    [[items]]
    phase = "framework_after_boot"
    target = "app"
    method = "ready"

    [[items]]
    phase = "before"
    target = "cache"
    method = "warm"

    [[items]]
    phase = "framework_before_boot"
    target = "db"
    method = "connect"

    [[items]]
    phase = "before"
    target = "cache"
    method = "prime"
"#;

#[tokio::test(start_paused = true)]
async fn test_staged_manifest_runs_phase_by_phase() {
    let report = run(STAGED).await;

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(
        item_starts(&report),
        vec![
            (125, "db.connect".to_string()),
            (165, "cache.warm".to_string()),
            (175, "cache.prime".to_string()),
            (195, "app.ready".to_string()),
        ]
    );
    assert_eq!(drained_phases(&report), Phase::ALL.to_vec());
    assert_eq!(report.elapsed, Duration::from_millis(195));
    assert!(overruns(&report).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_events_start_with_warmup_and_end_with_finish() {
    let report = run(STAGED).await;

    let first = report.events.first().expect("events recorded");
    assert_eq!(first.at, Duration::ZERO);
    assert_eq!(
        first.event,
        BootEvent::WarmupStarted {
            delay: Duration::from_millis(125)
        }
    );
    assert_eq!(report.events().last(), Some(&BootEvent::Finished));
    assert_eq!(report.events().filter(|event| event.is_terminal()).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_overrunning_item_warns_and_still_completes() {
    let report = run(
        r#"
        root = "svc"

        [[targets]]
        name = "svc"
        methods = [{ name = "migrate", delay_ms = 300 }, { name = "serve" }]

        [[items]]
        phase = "before"
        target = "svc"
        method = "migrate"
        timeout_ms = 100

        [[items]]
        phase = "after"
        target = "svc"
        method = "serve"
        "#,
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::Finished);
    let overruns = overruns(&report);
    assert_eq!(overruns.len(), 1);
    assert_eq!(overruns[0].0, 225);
    assert_eq!(overruns[0].1.to_string(), "svc.migrate");
    assert_eq!(
        item_starts(&report),
        vec![(125, "svc.migrate".to_string()), (425, "svc.serve".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_held_completion_hits_deadline() {
    let report = run_with(
        r#"
        root = "svc"

        [[targets]]
        name = "svc"
        methods = [{ name = "listen", complete = false }, { name = "after" }]

        [[items]]
        phase = "framework_before_boot"
        target = "svc"
        method = "listen"

        [[items]]
        phase = "after"
        target = "svc"
        method = "after"
        "#,
        BootConfig::default(),
        Some(Duration::from_secs(6)),
    )
    .await;

    assert_eq!(
        report.outcome,
        RunOutcome::DeadlineExceeded(SchedulerState::Running(Phase::FrameworkBeforeBoot))
    );
    // The default 5000ms watchdog still reports the hang.
    assert_eq!(overruns(&report).len(), 1);
    assert_eq!(overruns(&report)[0].0, 5125);
    assert_eq!(item_starts(&report).len(), 1);
    assert!(drained_phases(&report).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failing_factory_fails_run() {
    let report = run(
        r#"
        root = "app"

        [[targets]]
        name = "app"

        [[targets]]
        name = "disk"
        fail = "device not ready"
        methods = [{ name = "mount" }]

        [[items]]
        phase = "before"
        target = "disk"
        method = "mount"
        "#,
    )
    .await;

    let RunOutcome::Failed(BootstrapError::UnresolvedTarget {
        phase,
        target,
        source,
        ..
    }) = &report.outcome
    else {
        panic!("expected UnresolvedTarget, got {:?}", report.outcome);
    };
    assert_eq!(*phase, Phase::Before);
    assert_eq!(target.as_str(), "disk");
    assert!(matches!(
        source,
        ResolveError::FactoryFailed { message, .. } if message == "device not ready"
    ));
    assert_eq!(drained_phases(&report), vec![Phase::FrameworkBeforeBoot]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_root_fails_after_every_phase() {
    let report = run(
        r#"
        root = "ghost"

        [[targets]]
        name = "db"
        methods = [{ name = "connect" }]

        [[items]]
        phase = "after"
        target = "db"
        method = "connect"
        "#,
    )
    .await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Failed(BootstrapError::UnresolvedRoot { .. })
    ));
    assert_eq!(drained_phases(&report), Phase::ALL.to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_missing_method_respects_policy() {
    const MANIFEST: &str = r#"
        root = "app"

        [[targets]]
        name = "app"

        [[items]]
        phase = "before"
        target = "app"
        method = "configure"
    "#;

    let aborted = run(MANIFEST).await;
    assert!(matches!(
        aborted.outcome,
        RunOutcome::Failed(BootstrapError::MissingMethod { phase: Phase::Before, .. })
    ));

    let config = BootConfig {
        missing_method: MissingMethodPolicy::Stall,
        ..BootConfig::default()
    };
    let stalled = run_with(MANIFEST, config, Some(Duration::from_secs(1))).await;
    assert_eq!(
        stalled.outcome,
        RunOutcome::DeadlineExceeded(SchedulerState::Running(Phase::Before))
    );
    assert!(
        stalled
            .events()
            .any(|event| matches!(event, BootEvent::Stalled { phase: Phase::Before, .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_config_warmup_and_default_timeout_apply() {
    let config = BootConfig {
        warmup_ms: 0,
        default_timeout_ms: 50,
        ..BootConfig::default()
    };
    let report = run_with(
        r#"
        root = "svc"

        [[targets]]
        name = "svc"
        methods = [{ name = "boot", delay_ms = 80 }]

        [[items]]
        phase = "framework_before_boot"
        target = "svc"
        method = "boot"
        "#,
        config,
        None,
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(item_starts(&report), vec![(0, "svc.boot".to_string())]);
    assert_eq!(overruns(&report)[0].0, 50);
    assert_eq!(report.elapsed, Duration::from_millis(80));
}

#[tokio::test(start_paused = true)]
async fn test_manifest_loaded_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(STAGED.as_bytes()).unwrap();

    let manifest = Manifest::load(file.path()).unwrap();
    let report = ignite_cli::run(
        SchedulerId::new("disk").unwrap(),
        &manifest,
        BootConfig::default(),
        None,
    )
    .await;

    assert!(report.outcome.is_success());
    assert_eq!(item_starts(&report).len(), 4);
}
