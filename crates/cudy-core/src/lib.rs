// cudy-core: Router lifecycle between cudy-api and consumers (CLI).

pub mod command;
pub mod config;
pub mod error;
pub mod router;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{RouterConfig, TlsVerification};
pub use error::CoreError;
pub use router::{ConnectionState, Router};

// Re-export model types at the crate root for ergonomics.
pub use cudy_api::{
    DetectedModel, DeviceRecord, ModelFamily, Module, ModuleData, ModuleRecord, SensorValue,
    Snapshot, UNKNOWN, VpnState, WifiBand, WifiState,
};
