//! uwsgiconf: build uWSGI configuration from composable option groups.
//!
//! Option groups (workers, routing, python...) contribute `key = value` directives
//! into a section's ordered option store, activating the plugins they need along
//! the way. Sections render to INI; a `Configuration` renders many sections into
//! one document. The `runtime` module is a thin façade over the embedded uWSGI API
//! (mules, farms, signals).
//!
//! ```
//! use uwsgiconf::groups::{PythonParams, WorkersParams};
//! use uwsgiconf::Section;
//!
//! let mut section = Section::named("app");
//! section
//!     .workers()
//!     .call(WorkersParams { count: Some(4) })
//!     .python()
//!     .set_basic_params(PythonParams {
//!         python_home: Some("/srv/venv".into()),
//!         ..Default::default()
//!     });
//!
//! assert_eq!(
//!     section.to_string(),
//!     "[app]\nworkers = 4\nplugin = python\npyhome = /srv/venv\n"
//! );
//! ```

pub mod config;
pub mod configuration;
pub mod error;
pub mod groups;
pub mod options;
pub mod presets;
pub mod runtime;
pub mod section;

pub use config::{PresetKind, ProjectConfig, SectionConfig};
pub use configuration::{Configuration, Entry};
pub use error::{ConfigError, Result};
pub use groups::{apply_group_table, available_groups};
pub use options::{Arg, Condition, Mutation, OptionStore, OptionsGroup, ParametrizedValue, Scope, Value};
pub use section::{EmbeddedPlugins, PluginsParams, PrintStyle, Section, SectionParams, Target};
