// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn control() -> (ProcessControl, mpsc::Receiver<()>, watch::Sender<Option<WorkerExit>>) {
    let (kill_tx, kill_rx) = mpsc::channel(1);
    let (exit_tx, exit_rx) = watch::channel(None);
    (ProcessControl::new(kill_tx, exit_rx), kill_rx, exit_tx)
}

#[tokio::test]
async fn wait_exit_returns_published_status() {
    let (control, _kill_rx, exit_tx) = control();
    let waiter = tokio::spawn({
        let control = control.clone();
        async move { control.wait_exit().await }
    });

    exit_tx.send_replace(Some(WorkerExit { code: Some(3) }));

    let exit = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, WorkerExit { code: Some(3) });
    assert!(control.has_exited());
}

#[tokio::test]
async fn wait_exit_after_exit_returns_immediately() {
    let (control, _kill_rx, exit_tx) = control();
    exit_tx.send_replace(Some(WorkerExit { code: None }));

    assert_eq!(control.wait_exit().await, WorkerExit { code: None });
    assert_eq!(control.wait_exit().await, WorkerExit { code: None });
}

#[tokio::test]
async fn wait_exit_with_reaper_gone_returns_default() {
    let (control, _kill_rx, exit_tx) = control();
    drop(exit_tx);

    assert_eq!(control.wait_exit().await, WorkerExit::default());
}

#[test]
fn kill_is_idempotent() {
    let (control, mut kill_rx, _exit_tx) = control();
    control.kill();
    control.kill();

    assert!(kill_rx.try_recv().is_ok());
    assert!(kill_rx.try_recv().is_err());
}
