use crate::application::ports::connectivity::{ConnectivityEvent, ConnectivitySignal};
use tokio::sync::watch;

/// ホスト（OS のネットワーク通知など）から状態を押し込む接続シグナル
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// 状態が変わった場合のみ購読者へ通知する
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEvent> {
        let mut event = None;
        self.tx.send_if_modified(|current| {
            event = ConnectivityEvent::from_transition(*current, online);
            *current = online;
            event.is_some()
        });

        if let Some(event) = event {
            tracing::info!(target: "sync::connectivity", ?event, "connectivity changed");
        }
        event
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivitySignal for ManualConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
