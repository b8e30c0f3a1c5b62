mod config;
mod init;
mod io_operation;
mod probe;
mod service;
mod storage;

pub use config::ConfigValidationError;
pub use init::InitializationError;
pub use io_operation::IoOperation;
pub use probe::ProbeError;
pub use service::ServiceError;
pub use storage::StorageError;
