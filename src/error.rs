//! Error types for configuration building, rendering and the runtime façade.

use thiserror::Error;

/// Main error type for uwsgiconf operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration member is not a `Section`
    #[error("configuration member '{0}' is not a Section instance")]
    NotASection(String),

    /// Two sections in one configuration share a name
    #[error("section names must be unique within a configuration: '{0}' is used more than once")]
    DuplicateSectionName(String),

    /// An unnamed section was used as an include/fallback target
    #[error("section used as a reference target for '{0}' must be named")]
    UnnamedSection(String),

    /// Error page status code outside of the supported set
    #[error("code `{status}` for error pages is unsupported. Supported: {supported}")]
    UnsupportedStatus { status: u16, supported: String },

    /// Parameter table could not be applied to an option group
    #[error("invalid parameters for option group '{0}': {1}")]
    InvalidParams(String, String),

    /// Project file could not be parsed or is inconsistent
    #[error("invalid project config: {0}")]
    InvalidProject(String),

    /// Environment variable to copy from the current process is unset or not unicode
    #[error("environment variable '{0}' is not available: {1}")]
    MissingEnv(String, String),

    /// All 256 signal numbers are taken
    #[error("no uWSGI signals available")]
    NoSignalsAvailable,

    /// Offload message references a function nobody registered
    #[error("no offloaded function registered under '{0}'")]
    UnknownOffload(String),

    /// The embedding platform rejected a call
    #[error("platform error: {0}")]
    Platform(String),

    /// Writing the rendered configuration failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for uwsgiconf operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_section_display() {
        let err = ConfigError::NotASection("some".to_string());
        assert!(err.to_string().contains("Section"));
        assert!(err.to_string().contains("'some'"));
    }

    #[test]
    fn test_duplicate_name_display() {
        let err = ConfigError::DuplicateSectionName("uwsgi".to_string());
        assert!(err.to_string().contains("unique"));
    }

    #[test]
    fn test_unsupported_status_display() {
        let err = ConfigError::UnsupportedStatus {
            status: 418,
            supported: "403, 404, 500".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "code `418` for error pages is unsupported. Supported: 403, 404, 500"
        );
    }
}
