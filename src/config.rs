//! Project files: a TOML description of sections, compiled into a `Configuration`.
//!
//! ```toml
//! autoinclude_sections = false
//!
//! [[sections]]
//! name = "app"
//! preset = "python"
//! wsgi_module = "app.wsgi"
//!
//! [sections.nice]
//! workers = 4
//!
//! [sections.python]
//! python_home = "/srv/venv"
//! ```
//!
//! Keys a section does not recognize are treated as per-group parameter tables
//! (`[sections.workers]`, `[sections.routing]`...). Tables for unknown groups and
//! unknown keys inside group tables are ignored.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::configuration::Configuration;
use crate::error::{ConfigError, Result};
use crate::groups::{Python, PythonParams};
use crate::options::OptionsGroup;
use crate::presets::nice::{configure_nice, configure_python, NiceParams};
use crate::section::{EmbeddedPlugins, PluginsParams, Section, SectionParams};

/// Top-level project description, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Make every section include every other named section.
    #[serde(default)]
    pub autoinclude_sections: bool,
    /// Start the output with the generation banner.
    #[serde(default = "default_banner")]
    pub banner: bool,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            autoinclude_sections: false,
            banner: default_banner(),
            sections: Vec::new(),
        }
    }
}

fn default_banner() -> bool {
    true
}

/// Built-in starting points for a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    /// Empty section.
    #[default]
    Plain,
    /// See [`crate::presets::nice`].
    Nice,
    /// Nice preset plus the Python plugin.
    Python,
}

/// One `[[sections]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionConfig {
    pub name: Option<String>,
    #[serde(default)]
    pub preset: PresetKind,
    /// Name of an earlier section to start from.
    pub derive_from: Option<String>,
    pub strict_config: Option<bool>,
    #[serde(default)]
    pub embedded_plugins: EmbeddedPlugins,
    /// Parameters of the `nice` and `python` presets.
    #[serde(default)]
    pub nice: NiceParams,
    /// WSGI module loaded by the `python` preset.
    pub wsgi_module: Option<String>,
    pub plugins: Option<PluginsParams>,
    /// Environment variables; an empty value copies it from the compiling process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Files or `:section` references to include.
    #[serde(default)]
    pub include: Vec<String>,
    /// File or `:section` reference loaded when this configuration fails.
    pub fallback: Option<String>,
    #[serde(default)]
    pub print_variables: bool,
    /// Per-group parameter tables.
    #[serde(flatten)]
    pub groups: toml::Table,
}

impl SectionConfig {
    fn effective_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or(crate::section::DEFAULT_SECTION_NAME)
    }

    fn build(&self, base: Option<&Section>) -> Result<Section> {
        let mut section = match base {
            Some(base) => Section::derive_from(base, self.name.as_deref()),
            None => match &self.name {
                Some(name) => Section::named(name.as_str()),
                None => Section::new(),
            },
        };

        if self.embedded_plugins != EmbeddedPlugins::None {
            section = section.with_embedded_plugins(self.embedded_plugins.clone());
        }

        let mut groups = self.groups.clone();

        match self.preset {
            PresetKind::Plain => {}
            PresetKind::Nice => {
                configure_nice(&mut section, &self.nice);
            }
            PresetKind::Python => {
                let python: PythonParams = match groups.remove(Python::ID) {
                    Some(table) => table.try_into().map_err(|e: toml::de::Error| {
                        ConfigError::InvalidParams(Python::ID.to_string(), e.to_string())
                    })?,
                    None => PythonParams::default(),
                };
                configure_python(&mut section, &self.nice, python, self.wsgi_module.as_deref());
            }
        }

        if self.strict_config.is_some() {
            section.set_basic_params(SectionParams {
                strict_config: self.strict_config,
            });
        }

        if let Some(plugins) = &self.plugins {
            section.set_plugins_params(plugins.clone());
        }

        section.apply_params(&groups)?;

        for (key, value) in &self.env {
            let value = (!value.is_empty()).then_some(value.as_str());
            section.env(key, value)?;
        }

        for target in &self.include {
            section.include(target)?;
        }

        if let Some(fallback) = &self.fallback {
            section.set_fallback(fallback)?;
        }

        if self.print_variables {
            section.print_variables();
        }

        tracing::debug!(section = %section.effective_name(), preset = ?self.preset, "section built");
        Ok(section)
    }
}

impl ProjectConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConfigError::InvalidProject(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Validate the project, failing fast before any section is built.
    pub fn validate(&self) -> Result<()> {
        let named: HashSet<&str> = self
            .sections
            .iter()
            .filter_map(|section| section.name.as_deref())
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        for section in &self.sections {
            let name = section.effective_name();

            if let Some(base) = &section.derive_from {
                if !seen.contains(base.as_str()) {
                    return Err(ConfigError::InvalidProject(format!(
                        "section '{}' derives from '{}', which is not defined before it",
                        name, base
                    )));
                }
            }

            if !seen.insert(name) {
                return Err(ConfigError::DuplicateSectionName(name.to_string()));
            }

            let references = section.include.iter().chain(section.fallback.iter());
            for reference in references {
                if let Some(target) = reference.strip_prefix(':') {
                    if !named.contains(target) {
                        return Err(ConfigError::InvalidProject(format!(
                            "section '{}' references unknown section '{}'",
                            name, target
                        )));
                    }
                }
            }

            if section.wsgi_module.is_some() && section.preset != PresetKind::Python {
                return Err(ConfigError::InvalidProject(format!(
                    "section '{}' sets 'wsgi_module' without the python preset",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Validate and build every section into one configuration.
    pub fn build(&self) -> Result<Configuration> {
        self.validate()?;

        let mut sections: Vec<Section> = Vec::with_capacity(self.sections.len());
        for config in &self.sections {
            let base = config
                .derive_from
                .as_deref()
                .and_then(|base| sections.iter().find(|s| s.effective_name() == base));
            let section = config.build(base)?;
            sections.push(section);
        }

        Ok(Configuration::new(sections)
            .with_autoinclude(self.autoinclude_sections)
            .with_banner(self.banner))
    }
}
