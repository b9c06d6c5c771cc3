use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

/// 処理中のキー集合。同一キーへの重複した楽観的更新を弾くために使う。
pub(crate) struct InFlightKeys<K: Eq + Hash + Clone> {
    keys: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> Default for InFlightKeys<K> {
    fn default() -> Self {
        Self {
            keys: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> InFlightKeys<K> {
    /// 既に処理中なら `None`
    pub(crate) fn try_acquire(&self, key: &K) -> Option<InFlightGuard<K>> {
        if !lock(&self.keys).insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key: key.clone(),
        })
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        lock(&self.keys).contains(key)
    }
}

/// drop でキーを解放する
pub(crate) struct InFlightGuard<K: Eq + Hash> {
    keys: Arc<Mutex<HashSet<K>>>,
    key: K,
}

impl<K: Eq + Hash> Drop for InFlightGuard<K> {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}

// ロックを保持したまま await しないので、poison は中身をそのまま使う
fn lock<K>(keys: &Mutex<HashSet<K>>) -> MutexGuard<'_, HashSet<K>> {
    keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
