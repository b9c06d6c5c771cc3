use crate::application::ports::connectivity::{ConnectivityEvent, ConnectivitySignal};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 一定間隔で TCP 接続を試みて到達性を判定する接続シグナル
pub struct ProbeConnectivity {
    rx: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl ProbeConnectivity {
    /// 最初の判定が終わるまではオフライン扱い
    pub fn spawn(address: String, interval: Duration, timeout: Duration) -> Self {
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let online = probe(&address, timeout).await;

                let mut event = None;
                tx.send_if_modified(|current| {
                    event = ConnectivityEvent::from_transition(*current, online);
                    *current = online;
                    event.is_some()
                });
                if let Some(event) = event {
                    tracing::info!(
                        target: "sync::connectivity",
                        address = %address,
                        ?event,
                        "probe detected connectivity change"
                    );
                }

                if tx.is_closed() {
                    break;
                }
            }
        });

        Self { rx, task }
    }
}

async fn probe(address: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(_)) => true,
        Ok(Err(err)) => {
            tracing::trace!(target: "sync::connectivity", address, error = %err, "probe failed");
            false
        }
        Err(_) => {
            tracing::trace!(target: "sync::connectivity", address, "probe timed out");
            false
        }
    }
}

impl ConnectivitySignal for ProbeConnectivity {
    fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

impl Drop for ProbeConnectivity {
    fn drop(&mut self) {
        self.task.abort();
    }
}
