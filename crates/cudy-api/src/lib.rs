// cudy-api: Async Rust client for the LuCI web interface of Cudy routers

pub mod error;
pub mod html;
pub mod luci;
pub mod model;
pub mod probe;
pub mod profile;
pub mod schema;
pub mod transport;

pub use error::Error;
pub use luci::{AuthState, ClientConfig, LuciClient, Scheme};
pub use model::{
    DeviceRecord, Module, ModuleData, ModuleRecord, SensorValue, Snapshot, UNKNOWN, VpnState,
    WifiBand, WifiState,
};
pub use probe::{PageSource, get_snapshot};
pub use profile::{DetectedModel, ModelFamily, ProfileTable, detect_model};
pub use transport::{TlsMode, TransportConfig};
