pub mod config;
pub mod driver;
pub mod errors;
pub mod http_api;
pub mod logging;
pub mod probe;
pub mod records;
pub mod store;
pub mod stress;
pub mod utils;

pub use config::AppConfig;
pub use driver::TestDriver;
pub use errors::{
    ConfigValidationError, InitializationError, IoOperation, ProbeError, ServiceError,
    StorageError,
};
pub use http_api::{start_http_server, AppState};
pub use logging::setup_logging;
pub use probe::{HttpProber, ProbeResult, Prober};
pub use store::ResultStore;
pub use stress::StressController;
pub use utils::generate_run_id;
