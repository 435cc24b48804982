//! Contract Test: Run Modes and Cycle Failures
//!
//! Verifies the worker's scheduling behavior under simulated time:
//! - Single-run mode ends after exactly one pass, even with nothing to do
//! - Daemon mode lists again only after the configured interval
//! - Resolve/list failures abort a single-run worker before reconciling
//! - The same failures are retried after the interval in daemon mode
//! - Cancellation interrupts the interval sleep
//!
//! If this test fails, the run mode is not being honored or a cycle
//! failure is handled with the wrong policy.

mod common;

use common::*;
use dyndns_core::error::Error;
use dyndns_core::{DomainWorker, RunMode, WorkerEvent, WorkerExit};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn single_run_terminates_after_one_pass() {
    let provider = FakeProvider::with_records(vec![a_record("rec-1", "mail.example.com", "2.2.2.2")]);

    let worker = DomainWorker::new(
        domain_config("example.com", &["mail"], 30),
        provider.boxed(),
        resolver(FixedMirror::answering("2.2.2.2")),
        RunMode::SingleRun,
    );

    let exit = tokio::time::timeout(Duration::from_secs(1), worker.run())
        .await
        .expect("single-run worker must not sleep");

    assert!(matches!(exit, WorkerExit::Completed(report) if report.updated == 0));
    assert_eq!(provider.list_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn daemon_lists_again_only_after_interval() {
    let provider = FakeProvider::with_records(vec![a_record("rec-1", "mail.example.com", "2.2.2.2")]);
    let shutdown = CancellationToken::new();

    let worker = DomainWorker::new(
        domain_config("example.com", &["mail"], 30),
        provider.boxed(),
        resolver(FixedMirror::answering("2.2.2.2")),
        RunMode::Daemon,
    )
    .with_shutdown(shutdown.clone());
    let handle = tokio::spawn(worker.run());

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(provider.list_count(), 1, "second list must wait for the interval");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(provider.list_count(), 2);

    let instants = provider.list_instants();
    assert!(instants[1] - instants[0] >= Duration::from_secs(30));

    shutdown.cancel();
    let exit = handle.await.unwrap();
    assert!(matches!(exit, WorkerExit::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn daemon_picks_up_ip_change_on_next_cycle() {
    let provider = FakeProvider::with_records(vec![a_record("rec-1", "mail.example.com", "1.1.1.1")]);
    let mirror = FixedMirror::answering("1.1.1.1");
    let shutdown = CancellationToken::new();

    let worker = DomainWorker::new(
        domain_config("example.com", &["mail"], 10),
        provider.boxed(),
        resolver(mirror.clone()),
        RunMode::Daemon,
    )
    .with_shutdown(shutdown.clone());
    let handle = tokio::spawn(worker.run());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.delete_count(), 0);

    mirror.set_answer(Some("2.2.2.2"));
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(provider.delete_count(), 1);
    assert_eq!(provider.create_count(), 1);
    assert_eq!(provider.records()[0].content, "2.2.2.2");

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn single_run_aborts_when_resolution_fails() {
    let provider = FakeProvider::with_records(vec![a_record("rec-1", "mail.example.com", "1.1.1.1")]);

    let worker = DomainWorker::new(
        domain_config("example.com", &["mail"], 30),
        provider.boxed(),
        resolver(FixedMirror::failing()),
        RunMode::SingleRun,
    );

    let exit = worker.run().await;

    assert!(matches!(exit, WorkerExit::Aborted(Error::ResolutionFailed { .. })));
    assert_eq!(provider.list_count(), 0, "listing must not run after a failed resolve");
}

#[tokio::test(start_paused = true)]
async fn single_run_aborts_when_listing_fails() {
    let provider = FakeProvider::with_records(vec![a_record("rec-1", "mail.example.com", "1.1.1.1")]);
    provider.fail_list(true);

    let worker = DomainWorker::new(
        domain_config("example.com", &["mail"], 30),
        provider.boxed(),
        resolver(FixedMirror::answering("2.2.2.2")),
        RunMode::SingleRun,
    );

    let exit = worker.run().await;

    assert!(matches!(exit, WorkerExit::Aborted(Error::ListFailed { ref domain, .. }) if domain == "example.com"));
    assert_eq!(provider.delete_count() + provider.create_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn daemon_retries_failed_cycle_after_interval() {
    let provider = FakeProvider::with_records(vec![a_record("rec-1", "mail.example.com", "1.1.1.1")]);
    let mirror = FixedMirror::failing();
    let shutdown = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(64);

    let worker = DomainWorker::new(
        domain_config("example.com", &["mail"], 20),
        provider.boxed(),
        resolver(mirror.clone()),
        RunMode::Daemon,
    )
    .with_shutdown(shutdown.clone())
    .with_events(tx);
    let handle = tokio::spawn(worker.run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(mirror.call_count(), 1);
    assert_eq!(provider.list_count(), 0);

    mirror.set_answer(Some("2.2.2.2"));
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(mirror.call_count(), 2);
    assert_eq!(provider.create_count(), 1);

    shutdown.cancel();
    handle.await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.iter().any(|e| matches!(e, WorkerEvent::CycleFailed { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        WorkerEvent::RecordUpdated { current, .. } if current == "2.2.2.2"
    )));
    assert!(matches!(events.last(), Some(WorkerEvent::Stopped { .. })));
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_long_interval() {
    let provider = FakeProvider::default();
    let shutdown = CancellationToken::new();

    let worker = DomainWorker::new(
        domain_config("example.com", &["mail"], 86_400),
        provider.boxed(),
        resolver(FixedMirror::answering("2.2.2.2")),
        RunMode::Daemon,
    )
    .with_shutdown(shutdown.clone());
    let handle = tokio::spawn(worker.run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    let started = tokio::time::Instant::now();
    shutdown.cancel();

    let exit = handle.await.unwrap();
    assert!(matches!(exit, WorkerExit::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(provider.list_count(), 1);
}
