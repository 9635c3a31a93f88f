pub mod cli;
pub mod config;
pub mod executor;
pub mod host;
pub mod inventory;
pub mod precheck;

pub use executor::{CommandOutput, ExecutionError, RemoteExecutor};
pub use host::Host;
pub use precheck::{check_host, check_hosts, Precheck, PrecheckError, PrecheckOutcome};
