use super::{ConfigPrecheck, Precheck, PrecheckError};
use crate::config::PrecheckDefaults;
use crate::executor::RemoteExecutor;
use std::ffi::OsString;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecheckKind {
    Config,
}

impl FromStr for PrecheckKind {
    type Err = PrecheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "config" | "ConfigPrecheck" => Ok(PrecheckKind::Config),
            _ => Err(PrecheckError::Argument(format!(
                "precheck '{}' not supported",
                s
            ))),
        }
    }
}

impl PrecheckKind {
    /// Parses `raw_args` for the selected variant and constructs it.
    ///
    /// Argument errors are returned before any host is contacted.
    pub fn build<I, T>(
        self,
        raw_args: I,
        executor: Arc<dyn RemoteExecutor>,
        defaults: &PrecheckDefaults,
    ) -> Result<Arc<dyn Precheck>, PrecheckError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match self {
            PrecheckKind::Config => {
                let args = ConfigPrecheck::parse_args(raw_args, defaults)?;
                Ok(Arc::new(ConfigPrecheck::new(args, executor, defaults)))
            }
        }
    }
}
