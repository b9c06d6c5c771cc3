use crate::shared::error::AppError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// 単一値（設定やカウンタなど）の楽観的キャッシュ
pub struct OptimisticCell<T: Clone + Send + Sync> {
    value: RwLock<T>,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T: Clone + Send + Sync> OptimisticCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            busy: AtomicBool::new(false),
        }
    }

    pub async fn get(&self) -> T {
        self.value.read().await.clone()
    }

    /// サーバーから受け取った値で上書きする
    pub async fn set(&self, value: T) {
        *self.value.write().await = value;
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn update_optimistic<F, Fut>(&self, next: T, commit: F) -> Result<T, AppError>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AppError::MutationInFlight("optimistic cell".to_string()));
        }
        let _guard = BusyGuard(&self.busy);

        let snapshot = {
            let mut value = self.value.write().await;
            std::mem::replace(&mut *value, next.clone())
        };

        match commit(next).await {
            Ok(confirmed) => {
                *self.value.write().await = confirmed.clone();
                Ok(confirmed)
            }
            Err(err) => {
                *self.value.write().await = snapshot;
                tracing::debug!(target: "sync::cache", error = %err, "optimistic value rolled back");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::RemoteError;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn rollback_restores_previous_value() {
        let cell = OptimisticCell::new(10_u32);
        let (tx, rx) = oneshot::channel::<()>();

        let update = cell.update_optimistic(25, |_| async move {
            let _ = rx.await;
            Err(AppError::Remote(RemoteError::Timeout))
        });
        let observe = async {
            tokio::task::yield_now().await;
            let during = cell.get().await;
            let overlapping = cell.update_optimistic(30, |v| async move { Ok(v) }).await;
            tx.send(()).unwrap();
            (during, overlapping)
        };

        let (result, (during, overlapping)) = tokio::join!(update, observe);

        assert_eq!(during, 25);
        assert!(matches!(overlapping, Err(AppError::MutationInFlight(_))));
        assert!(result.is_err());
        assert_eq!(cell.get().await, 10);
        assert!(!cell.is_busy());
    }

    #[tokio::test]
    async fn commit_result_becomes_the_value() {
        let cell = OptimisticCell::new(String::from("draft"));
        let confirmed = cell
            .update_optimistic("Final ".to_string(), |v| async move {
                Ok(v.trim().to_string())
            })
            .await
            .unwrap();

        assert_eq!(confirmed, "Final");
        assert_eq!(cell.get().await, "Final");
    }
}
