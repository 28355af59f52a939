//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::time::Duration;

use ignite_cli::{Manifest, RunReport};
use ignite_engine::{BootConfig, BootEvent};
use ignite_types::{ItemKey, Phase, SchedulerId};

pub fn manifest(source: &str) -> Manifest {
    source.parse().expect("test manifest is valid")
}

pub async fn run(source: &str) -> RunReport {
    run_with(source, BootConfig::default(), None).await
}

pub async fn run_with(source: &str, config: BootConfig, deadline: Option<Duration>) -> RunReport {
    let id = SchedulerId::new("it").expect("non-empty id");
    ignite_cli::run(id, &manifest(source), config, deadline).await
}

/// `(elapsed ms, "target.method")` for every item start in `report`.
pub fn item_starts(report: &RunReport) -> Vec<(u128, String)> {
    report
        .events
        .iter()
        .filter_map(|timed| match &timed.event {
            BootEvent::ItemStarted { key, .. } => Some((timed.at.as_millis(), key.to_string())),
            _ => None,
        })
        .collect()
}

pub fn drained_phases(report: &RunReport) -> Vec<Phase> {
    report
        .events()
        .filter_map(|event| match event {
            BootEvent::PhaseDrained(phase) => Some(*phase),
            _ => None,
        })
        .collect()
}

pub fn overruns(report: &RunReport) -> Vec<(u128, ItemKey)> {
    report
        .events
        .iter()
        .filter_map(|timed| match &timed.event {
            BootEvent::WatchdogExpired { key, .. } => Some((timed.at.as_millis(), key.clone())),
            _ => None,
        })
        .collect()
}
