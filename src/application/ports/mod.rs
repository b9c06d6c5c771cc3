pub mod action_log_store;
pub mod connectivity;
pub mod remote_replayer;

pub use action_log_store::ActionLogStore;
pub use connectivity::{ConnectivityEvent, ConnectivitySignal};
pub use remote_replayer::{RemoteError, RemoteReplayer};
