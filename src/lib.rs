//! 現場業務クライアント向けのオフラインファースト同期コア
//!
//! 保留アクションの永続ログ、楽観的ビューキャッシュ、同期エンジン、
//! 接続状態モニタで構成される。組み立ては [`state::AppState`] が行う。

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod shared;
pub mod state;

pub use state::AppState;

/// ログ設定の初期化。二度目以降の呼び出しは何もしない。
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldops_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
