use super::core::SyncEngine;
use crate::application::ports::connectivity::ConnectivityEvent;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub(crate) struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncEngine {
    /// 定期同期と接続復帰時の同期を開始する。既に動作中なら false。
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut slot = self.scheduler.lock().await;
        if slot.is_some() {
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(run_interval(Arc::clone(self), shutdown_rx.clone())),
            tokio::spawn(watch_connectivity(Arc::clone(self), shutdown_rx)),
        ];
        *slot = Some(SchedulerHandle { shutdown, tasks });

        tracing::info!(
            target: "sync::engine",
            interval_secs = self.config.interval.as_secs(),
            "sync scheduler started"
        );
        true
    }

    /// 以降のパスのスケジュールを止める。実行中のパスは完了まで待つ。
    pub async fn stop(&self) -> bool {
        let Some(handle) = self.scheduler.lock().await.take() else {
            return false;
        };

        let _ = handle.shutdown.send(true);
        for result in join_all(handle.tasks).await {
            if let Err(err) = result {
                tracing::warn!(target: "sync::engine", error = %err, "scheduler task ended abnormally");
            }
        }

        tracing::info!(target: "sync::engine", "sync scheduler stopped");
        true
    }

    pub async fn is_scheduled(&self) -> bool {
        self.scheduler.lock().await.is_some()
    }
}

async fn run_interval(engine: Arc<SyncEngine>, mut shutdown: watch::Receiver<bool>) {
    // 最初の tick は即座に完了する
    let mut ticker = tokio::time::interval(engine.config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                engine.sync_now().await;
            }
        }
    }
}

async fn watch_connectivity(engine: Arc<SyncEngine>, mut shutdown: watch::Receiver<bool>) {
    let mut signal = engine.connectivity.subscribe();
    let mut was_online = *signal.borrow_and_update();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            changed = signal.changed() => {
                if changed.is_err() {
                    tracing::debug!(target: "sync::engine", "connectivity signal closed");
                    break;
                }
                let is_online = *signal.borrow_and_update();
                match ConnectivityEvent::from_transition(was_online, is_online) {
                    Some(ConnectivityEvent::BecameOnline) => {
                        tracing::info!(target: "sync::engine", "back online; starting sync pass");
                        engine.sync_now().await;
                    }
                    Some(ConnectivityEvent::BecameOffline) => {
                        tracing::debug!(target: "sync::engine", "went offline");
                    }
                    None => {}
                }
                was_online = is_online;
            }
        }
    }
}
