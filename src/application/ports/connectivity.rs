use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityEvent {
    BecameOnline,
    BecameOffline,
}

impl ConnectivityEvent {
    pub fn from_transition(was_online: bool, is_online: bool) -> Option<Self> {
        match (was_online, is_online) {
            (false, true) => Some(ConnectivityEvent::BecameOnline),
            (true, false) => Some(ConnectivityEvent::BecameOffline),
            _ => None,
        }
    }
}

/// プラットフォームの接続状態シグナル
pub trait ConnectivitySignal: Send + Sync {
    /// 呼び出し時点の接続状態（キャッシュしない）
    fn is_online(&self) -> bool;

    /// 状態変化を受け取るチャネル。値は変化時にのみ更新される。
    fn subscribe(&self) -> watch::Receiver<bool>;
}
