mod app;
mod driver;
mod http;
mod logging;
mod probe;
mod storage;
mod stress;

pub use app::Config as AppConfig;
pub use driver::Config as DriverConfig;
pub use http::Config as HttpConfig;
pub use logging::Config as LoggingConfig;
pub use probe::Config as ProbeConfig;
pub use storage::Config as StorageConfig;
pub use stress::Config as StressConfig;
