pub mod manual;
pub mod probe;

pub use manual::ManualConnectivity;
pub use probe::ProbeConnectivity;
