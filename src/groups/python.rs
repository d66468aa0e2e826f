use std::fmt;

use serde::Deserialize;

use crate::options::{Mutation, OptionsGroup, OptionsTarget, Scope};
use crate::section::Section;

/// Python plugin. Using any of its options activates `python` (or `python<version>`).
#[derive(Debug, Clone, Default)]
pub struct Python {
    version: Option<PythonVersion>,
}

/// Python plugin version suffix: `3`, `34`, `3.11`...
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PythonVersion {
    Number(u32),
    Text(String),
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PythonVersion::Number(number) => write!(f, "{}", number),
            PythonVersion::Text(text) => f.write_str(text),
        }
    }
}

impl From<u32> for PythonVersion {
    fn from(number: u32) -> Self {
        PythonVersion::Number(number)
    }
}

impl From<&str> for PythonVersion {
    fn from(text: &str) -> Self {
        PythonVersion::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PythonParams {
    pub version: Option<PythonVersion>,
    /// Virtualenv directory.
    pub python_home: Option<String>,
    /// Directories added to the module search path.
    pub search_path: Option<Vec<String>>,
    pub optimization_level: Option<u8>,
}

impl OptionsGroup for Python {
    const ID: &'static str = "python";
    const AUTO_PLUGIN: bool = true;
    type Params = PythonParams;

    fn name(&self) -> String {
        match &self.version {
            Some(version) => format!("python{}", version),
            None => "python".to_string(),
        }
    }

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        if params.version.is_some() {
            scope.state().version = params.version;
        }
        scope.set(Mutation::new("pyhome", params.python_home));
        scope.set(Mutation::new("pythonpath", params.search_path).multi());
        scope.set(Mutation::new("optimize", params.optimization_level));
        scope.into_section()
    }
}

impl<'a> Scope<'a, Python> {
    /// Register the plugin even when no Python option is set.
    pub fn activate(mut self) -> &'a mut Section {
        let name = self.state().name();
        self.section_mut().activate_plugin(&name);
        self.into_section()
    }

    /// Load a WSGI module, optionally naming its callable (default `application`).
    pub fn set_wsgi_params(mut self, module: Option<&str>, callable_name: Option<&str>) -> &'a mut Section {
        self.set(Mutation::new("wsgi", module));
        self.set(Mutation::new("callable", callable_name));
        self.into_section()
    }
}
