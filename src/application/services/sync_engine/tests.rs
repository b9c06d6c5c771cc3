use super::core::{SyncEngine, SyncEngineConfig};
use crate::application::ports::remote_replayer::{RemoteError, RemoteReplayer};
use crate::application::services::action_log::ActionLog;
use crate::domain::entities::offline::{ActionPayload, PendingAction, SyncSkipReason};
use crate::domain::entities::records::CustomerRecord;
use crate::domain::value_objects::offline::{
    EntityId, EntityKind, OperationKind, PendingActionId,
};
use crate::infrastructure::connectivity::ManualConnectivity;
use crate::infrastructure::offline::InMemoryActionLogStore;
use async_trait::async_trait;
use mockall::mock;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

mock! {
    pub Replayer {}

    #[async_trait]
    impl RemoteReplayer for Replayer {
        async fn replay(&self, action: &PendingAction) -> Result<(), RemoteError>;
    }
}

/// 解放されるまで replay を止めておく再送先
#[derive(Default)]
struct GatedReplayer {
    started: Notify,
    release: Notify,
    calls: Mutex<u32>,
}

#[async_trait]
impl RemoteReplayer for GatedReplayer {
    async fn replay(&self, _action: &PendingAction) -> Result<(), RemoteError> {
        *self.calls.lock().unwrap() += 1;
        self.started.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

struct SlowReplayer(Duration);

#[async_trait]
impl RemoteReplayer for SlowReplayer {
    async fn replay(&self, _action: &PendingAction) -> Result<(), RemoteError> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

fn memory_log() -> Arc<ActionLog> {
    Arc::new(ActionLog::new(
        Arc::new(InMemoryActionLogStore::new()),
        Arc::new(InMemoryActionLogStore::new()),
    ))
}

fn engine_with(
    log: Arc<ActionLog>,
    replayer: Arc<dyn RemoteReplayer>,
    connectivity: Arc<ManualConnectivity>,
    config: SyncEngineConfig,
) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(log, replayer, connectivity, config))
}

async fn enqueue_customer(log: &ActionLog, id: &str) -> PendingActionId {
    log.enqueue(
        EntityKind::Customer,
        OperationKind::Create,
        ActionPayload::Customer(CustomerRecord {
            id: EntityId::new(id.to_string()).unwrap(),
            name: format!("Customer {id}"),
            email: None,
            phone: None,
            address: None,
        }),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn offline_pass_is_skipped_without_replay() {
    let log = memory_log();
    enqueue_customer(&log, "c1").await;

    let mut replayer = MockReplayer::new();
    replayer.expect_replay().never();

    let engine = engine_with(
        log.clone(),
        Arc::new(replayer),
        Arc::new(ManualConnectivity::new(false)),
        SyncEngineConfig::default(),
    );

    let report = engine.sync_now().await;
    assert_eq!(report.skipped, Some(SyncSkipReason::Offline));
    assert_eq!(report.synced_count, 0);
    assert_eq!(log.pending_count().await, 1);
    assert!(engine.last_sync().await.is_none());
}

#[tokio::test]
async fn replays_in_fifo_order() {
    let log = memory_log();
    let expected = vec![
        enqueue_customer(&log, "a1").await,
        enqueue_customer(&log, "a2").await,
        enqueue_customer(&log, "a3").await,
    ];

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let mut replayer = MockReplayer::new();
    replayer.expect_replay().times(3).returning(move |action| {
        recorder.lock().unwrap().push(action.id.clone());
        Ok(())
    });

    let engine = engine_with(
        log.clone(),
        Arc::new(replayer),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig::default(),
    );

    let report = engine.sync_now().await;
    assert!(report.ran());
    assert_eq!(report.synced_count, 3);
    assert_eq!(*seen.lock().unwrap(), expected);
    assert_eq!(log.pending_count().await, 0);
    assert!(engine.last_sync().await.is_some());
}

#[tokio::test]
async fn concurrent_pass_is_rejected() {
    let log = memory_log();
    enqueue_customer(&log, "c1").await;

    let replayer = Arc::new(GatedReplayer::default());
    let engine = engine_with(
        log.clone(),
        replayer.clone(),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig::default(),
    );

    let first = engine.sync_now();
    let second = async {
        replayer.started.notified().await;
        assert!(engine.is_syncing());
        let report = engine.sync_now().await;
        replayer.release.notify_one();
        report
    };

    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.synced_count, 1);
    assert_eq!(second.skipped, Some(SyncSkipReason::AlreadyRunning));
    assert_eq!(second.synced_count, 0);
    assert_eq!(*replayer.calls.lock().unwrap(), 1);
    assert!(!engine.is_syncing());
    assert_eq!(engine.metrics().passes_skipped_busy, 1);
}

#[tokio::test]
async fn failed_replay_keeps_action_and_continues() {
    let log = memory_log();
    enqueue_customer(&log, "ok-1").await;
    let failing = enqueue_customer(&log, "bad").await;
    enqueue_customer(&log, "ok-2").await;

    let failing_id = failing.clone();
    let mut replayer = MockReplayer::new();
    replayer.expect_replay().times(3).returning(move |action| {
        if action.id == failing_id {
            Err(RemoteError::Network("connection reset".into()))
        } else {
            Ok(())
        }
    });

    let engine = engine_with(
        log.clone(),
        Arc::new(replayer),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig::default(),
    );

    let report = engine.sync_now().await;
    assert_eq!(report.synced_count, 2);
    assert_eq!(report.failed_count, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("connection reset"));

    let pending = log.list_pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, failing);
    assert_eq!(pending[0].attempts, 1);
    assert!(!pending[0].is_synced());
}

#[tokio::test]
async fn repeated_failures_dead_letter_the_action() {
    let log = memory_log();
    let id = enqueue_customer(&log, "poison").await;

    let mut replayer = MockReplayer::new();
    replayer.expect_replay().times(2).returning(|_| {
        Err(RemoteError::Rejected {
            status: 422,
            message: "malformed".into(),
        })
    });

    let engine = engine_with(
        log.clone(),
        Arc::new(replayer),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig {
            max_attempts: 2,
            ..SyncEngineConfig::default()
        },
    );

    let first = engine.sync_now().await;
    assert_eq!(first.dead_lettered_count, 0);

    let second = engine.sync_now().await;
    assert_eq!(second.dead_lettered_count, 1);

    // デッドレターは以降のパスで再送されない
    let third = engine.sync_now().await;
    assert!(third.ran());
    assert_eq!(third.failed_count, 0);

    let dead = log.dead_letters().await;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].id, id);
    assert_eq!(log.pending_count().await, 0);
    assert_eq!(engine.metrics().actions_dead_lettered, 1);
}

#[tokio::test]
async fn actions_behind_a_dead_letter_are_held_until_requeued() {
    let log = memory_log();
    let poisoned = enqueue_customer(&log, "p1").await;

    let healthy = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (flag, recorder) = (Arc::clone(&healthy), Arc::clone(&seen));
    let mut replayer = MockReplayer::new();
    replayer.expect_replay().returning(move |action| {
        recorder.lock().unwrap().push(action.id.clone());
        if flag.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Network("connection refused".into()))
        }
    });

    let engine = engine_with(
        log.clone(),
        Arc::new(replayer),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig {
            max_attempts: 1,
            ..SyncEngineConfig::default()
        },
    );

    let first = engine.sync_now().await;
    assert_eq!(first.dead_lettered_count, 1);

    healthy.store(true, AtomicOrdering::SeqCst);
    let later = enqueue_customer(&log, "p1").await;
    let other = enqueue_customer(&log, "q1").await;

    let second = engine.sync_now().await;
    assert_eq!(second.held_count, 1);
    assert_eq!(second.synced_count, 1);
    assert_eq!(log.list_pending().await[0].id, later);

    assert!(log.requeue(&poisoned).await.unwrap());
    let third = engine.sync_now().await;
    assert_eq!(third.synced_count, 2);
    assert_eq!(third.held_count, 0);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![poisoned.clone(), other, poisoned, later]
    );
    assert_eq!(log.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_replay_times_out() {
    let log = memory_log();
    enqueue_customer(&log, "c1").await;

    let engine = engine_with(
        log.clone(),
        Arc::new(SlowReplayer(Duration::from_secs(60))),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig {
            replay_timeout: Duration::from_secs(1),
            ..SyncEngineConfig::default()
        },
    );

    let report = engine.sync_now().await;
    assert_eq!(report.failed_count, 1);
    assert!(report.errors[0].contains("timed out"));
    assert_eq!(log.pending_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn scheduler_runs_immediately_and_on_each_interval() {
    let log = memory_log();
    enqueue_customer(&log, "c1").await;

    let mut replayer = MockReplayer::new();
    replayer.expect_replay().times(2).returning(|_| Ok(()));

    let engine = engine_with(
        log.clone(),
        Arc::new(replayer),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig {
            interval: Duration::from_secs(30),
            ..SyncEngineConfig::default()
        },
    );

    assert!(engine.start().await);
    assert!(!engine.start().await);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(log.pending_count().await, 0);

    enqueue_customer(&log, "c2").await;
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(log.pending_count().await, 0);
    assert!(engine.metrics().passes_run >= 2);

    assert!(engine.stop().await);
    assert!(!engine.stop().await);
    assert!(!engine.is_scheduled().await);
}

#[tokio::test(start_paused = true)]
async fn coming_back_online_triggers_a_pass() {
    let log = memory_log();
    let connectivity = Arc::new(ManualConnectivity::new(false));

    let mut replayer = MockReplayer::new();
    replayer.expect_replay().times(1).returning(|_| Ok(()));

    let engine = engine_with(
        log.clone(),
        Arc::new(replayer),
        connectivity.clone(),
        SyncEngineConfig {
            interval: Duration::from_secs(3600),
            ..SyncEngineConfig::default()
        },
    );
    engine.start().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    enqueue_customer(&log, "c1").await;
    assert_eq!(log.pending_count().await, 1);

    connectivity.set_online(true);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(log.pending_count().await, 0);
    assert!(engine.last_sync().await.is_some());
    assert_eq!(engine.metrics().passes_skipped_offline, 1);

    engine.stop().await;
}

#[tokio::test]
async fn stop_waits_for_in_progress_pass() {
    let log = memory_log();
    enqueue_customer(&log, "c1").await;

    let replayer = Arc::new(GatedReplayer::default());
    let engine = engine_with(
        log.clone(),
        replayer.clone(),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig {
            interval: Duration::from_secs(3600),
            ..SyncEngineConfig::default()
        },
    );
    engine.start().await;
    replayer.started.notified().await;

    let stop = engine.stop();
    let release = async {
        tokio::task::yield_now().await;
        replayer.release.notify_one();
    };
    let (stopped, ()) = tokio::join!(stop, release);

    assert!(stopped);
    // 実行中だったパスは最後まで完了している
    assert_eq!(log.pending_count().await, 0);
}
