use serde::Deserialize;

use crate::options::{Mutation, OptionsGroup, ParametrizedValue, Scope};
use crate::section::Section;

/// Request and server logging.
#[derive(Debug, Clone, Default)]
pub struct Logging;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingParams {
    /// Disable request logging.
    pub no_requests: Option<bool>,
    /// Log requests with 4xx response codes.
    pub log_4xx: Option<bool>,
    /// Log requests with 5xx response codes.
    pub log_5xx: Option<bool>,
}

/// Log destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logger {
    File { path: String },
    Syslog { app_name: String, facility: Option<String> },
    /// UDP or unix datagram socket.
    Socket { address: String },
    Stdio,
    Redis {
        address: Option<String>,
        command: Option<String>,
        prefix: Option<String>,
    },
}

impl Logger {
    fn into_value(self) -> ParametrizedValue {
        match self {
            Logger::File { path } => ParametrizedValue::new("file").arg(path),
            Logger::Syslog { app_name, facility } => ParametrizedValue::new("syslog")
                .joiner(",")
                .arg(app_name)
                .arg(facility)
                .requires_plugin("syslog"),
            Logger::Socket { address } => ParametrizedValue::new("socket")
                .arg(address)
                .requires_plugin("logsocket"),
            Logger::Stdio => ParametrizedValue::new("stdio").strip_separator(),
            Logger::Redis { address, command, prefix } => ParametrizedValue::new("redislog")
                .joiner(",")
                .arg(address)
                .arg(command)
                .arg(prefix)
                .strip_separator()
                .requires_plugin("redislog"),
        }
    }
}

impl OptionsGroup for Logging {
    const ID: &'static str = "logging";
    type Params = LoggingParams;

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        scope.set(Mutation::new("disable-logging", params.no_requests).flag());
        scope.set(Mutation::new("log-4xx", params.log_4xx).flag());
        scope.set(Mutation::new("log-5xx", params.log_5xx).flag());
        scope.into_section()
    }
}

impl<'a> Scope<'a, Logging> {
    /// Add a log destination. With `requests_only` it receives request logs only.
    pub fn add_logger(mut self, logger: Logger, requests_only: bool) -> &'a mut Section {
        self.set(Mutation::new(logger_key(requests_only), logger.into_value()).multi());
        self.into_section()
    }

    /// Add a log destination that routing rules and log routes can refer to by `name`.
    pub fn add_named_logger(mut self, name: &str, logger: Logger, requests_only: bool) -> &'a mut Section {
        let value = logger.into_value().alias(name);
        self.set(Mutation::new(logger_key(requests_only), value).multi());
        self.into_section()
    }
}

fn logger_key(requests_only: bool) -> &'static str {
    if requests_only { "req-logger" } else { "logger" }
}
