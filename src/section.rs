//! A named configuration unit: one option store plus the option groups bound to it.

use std::fmt;

use serde::Deserialize;

use crate::configuration::Configuration;
use crate::error::{ConfigError, Result};
use crate::groups;
use crate::options::mutation::{self, Mutation, OptionsTarget};
use crate::options::{GroupCache, OptionStore, OptionsGroup, Scope};

/// Header used for sections without a name.
pub const DEFAULT_SECTION_NAME: &str = "uwsgi";

/// Plugins embedded into the stock uWSGI build; these are never registered.
pub const BASIC_EMBEDDED_PLUGINS: &[&str] = &[
    "ping",
    "cache",
    "nagios",
    "rrdtool",
    "carbon",
    "rpc",
    "corerouter",
    "fastrouter",
    "http",
    "ugreen",
    "signal",
    "syslog",
    "rsyslog",
    "logsocket",
    "router_uwsgi",
    "router_redirect",
    "router_basicauth",
    "zergpool",
    "redislog",
    "mongodblog",
    "router_rewrite",
    "router_http",
    "logfile",
    "router_cache",
    "rawrouter",
    "router_static",
    "sslrouter",
    "spooler",
    "cheaper_busyness",
    "symcall",
    "transformation_tofile",
    "transformation_gzip",
    "transformation_chunked",
    "transformation_offload",
    "router_memcached",
    "router_redis",
    "router_hash",
    "router_expires",
    "router_metrics",
    "transformation_template",
    "stats_pusher_socket",
    "router_fcgi",
];

/// Which plugins the target uWSGI binary already has built in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EmbeddedPlugins {
    #[default]
    #[serde(skip)]
    None,
    /// `"basic"` preset, see [`BASIC_EMBEDDED_PLUGINS`].
    Preset(EmbeddedPreset),
    List(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddedPreset {
    Basic,
}

impl EmbeddedPlugins {
    fn names(&self) -> Vec<String> {
        match self {
            EmbeddedPlugins::None => Vec::new(),
            EmbeddedPlugins::Preset(EmbeddedPreset::Basic) => {
                BASIC_EMBEDDED_PLUGINS.iter().map(|p| p.to_string()).collect()
            }
            EmbeddedPlugins::List(names) => names.clone(),
        }
    }
}

/// Section-level basic params.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SectionParams {
    /// Fail on unknown options instead of ignoring them.
    pub strict_config: Option<bool>,
}

/// Plugin loading params.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PluginsParams {
    pub plugins: Vec<String>,
    /// Directories to search for plugins; always emitted first.
    pub search_dirs: Vec<String>,
    pub autoload: Option<bool>,
    /// Fail if a plugin cannot be loaded (`need-plugin` instead of `plugin`).
    pub required: bool,
}

/// Reference to another configuration: a file path or a section of the same file.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Path(&'a str),
    Section(&'a Section),
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(path: &'a str) -> Self {
        Target::Path(path)
    }
}

impl<'a> From<&'a String> for Target<'a> {
    fn from(path: &'a String) -> Self {
        Target::Path(path)
    }
}

impl<'a> From<&'a Section> for Target<'a> {
    fn from(section: &'a Section) -> Self {
        Target::Section(section)
    }
}

impl Target<'_> {
    /// Render the reference; sections render as `:name`.
    pub fn render(&self, directive: &str) -> Result<String> {
        match self {
            Target::Path(path) => Ok(path.to_string()),
            Target::Section(section) => section
                .name()
                .map(|name| format!(":{}", name))
                .ok_or_else(|| ConfigError::UnnamedSection(directive.to_string())),
        }
    }
}

/// ANSI styles for `print_out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStyle {
    Gray,
    Red,
    Green,
    Yellow,
    Blue,
}

impl PrintStyle {
    fn code(self) -> &'static str {
        match self {
            PrintStyle::Gray => "37;49",
            PrintStyle::Red => "31;49",
            PrintStyle::Green => "32;49",
            PrintStyle::Yellow => "33;49",
            PrintStyle::Blue => "34;49",
        }
    }
}

/// uWSGI magic variables and what they expand to.
const MAGIC_VARS: &[(&str, &str)] = &[
    ("v", "vassals directory (pwd)"),
    ("o", "original config filename"),
    ("p", "absolute path of the configuration file"),
    ("s", "filename of the configuration file"),
    ("d", "absolute path of the directory containing the configuration file"),
    ("e", "extension of the configuration file"),
    ("n", "filename without extension"),
    ("c", "name of the directory containing the config file"),
    ("t", "unix time (in seconds, gathered at instance startup)"),
    ("T", "unix time (in microseconds, gathered at instance startup)"),
    ("h", "hostname"),
    ("k", "detected cpu cores"),
    ("x", "current section identifier"),
    ("u", "uid of the user running the process"),
    ("U", "username of the user running the process"),
    ("g", "gid of the user running the process"),
    ("G", "group name of the user running the process"),
    ("j", "HEX representation of the djb33x hash of the full config path"),
];

/// One named configuration unit.
#[derive(Debug, Clone, Default)]
pub struct Section {
    name: Option<String>,
    options: OptionStore,
    plugins: Vec<String>,
    embedded_plugins: Vec<String>,
    style_prints: bool,
    pub(crate) groups: GroupCache,
}

impl Section {
    /// An unnamed section, rendered under the `[uwsgi]` header.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Section {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Independent copy of `other`, optionally renamed.
    pub fn derive_from(other: &Section, name: Option<&str>) -> Self {
        let mut section = other.clone();
        if let Some(name) = name {
            section.name = Some(name.to_string());
        }
        section
    }

    pub fn with_embedded_plugins(mut self, embedded: EmbeddedPlugins) -> Self {
        self.embedded_plugins = embedded.names();
        self
    }

    /// Wrap `print` directives in ANSI colors.
    pub fn with_style_prints(mut self, enabled: bool) -> Self {
        self.style_prints = enabled;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used in the header and for uniqueness checks.
    pub fn effective_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_SECTION_NAME)
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(str::to_string);
    }

    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    /// Plugins registered so far, in registration order.
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn embedded_plugins(&self) -> &[String] {
        &self.embedded_plugins
    }

    /// Group `G` bound to this section, instantiated on first access.
    pub fn group<G: OptionsGroup>(&mut self) -> Scope<'_, G> {
        Scope::new(self)
    }

    /// Instantiate group `G` with its basic params.
    pub fn init_group<G: OptionsGroup>(&mut self, params: G::Params) -> &mut Self {
        self.group::<G>().set_basic_params(params)
    }

    /// Apply a bag of per-group parameter tables (`{ workers = { count = 4 } }`).
    ///
    /// Tables for unknown groups and keys unknown to a group are ignored.
    pub fn apply_params(&mut self, params: &toml::Table) -> Result<&mut Self> {
        for (id, value) in params {
            if !value.is_table() {
                continue;
            }
            if !groups::apply_group_table(self, id, value.clone())? {
                tracing::debug!(section = %self.effective_name(), group = %id, "ignoring params for unknown option group");
            }
        }
        Ok(self)
    }

    pub fn set_basic_params(&mut self, params: SectionParams) -> &mut Self {
        self.set(Mutation::new("strict", params.strict_config).flag());
        self
    }

    /// Apply a mutation that belongs to no plugin-backed group.
    pub fn set(&mut self, mutation: Mutation) -> &mut Self {
        mutation::apply(self, mutation, None);
        self
    }

    pub fn set_plugins_params(&mut self, params: PluginsParams) -> &mut Self {
        let command = if params.required { "need-plugin" } else { "plugin" };
        for plugin in &params.plugins {
            self.register_plugin(plugin, command);
        }
        self.set(
            Mutation::new("plugins-dir", params.search_dirs)
                .multi()
                .priority(0),
        );
        self.set(Mutation::new("autoload", params.autoload).flag());
        self
    }

    /// List plugins on startup.
    pub fn print_plugins(&mut self) -> &mut Self {
        self.set(Mutation::new("plugins-list", true).flag())
    }

    /// Print `text` on startup, prefixed by `indent` (default `">   "`).
    pub fn print_out(&mut self, text: &str, indent: Option<&str>) -> &mut Self {
        self.print_styled(text, indent, PrintStyle::Gray)
    }

    pub fn print_styled(&mut self, text: &str, indent: Option<&str>, style: PrintStyle) -> &mut Self {
        let mut text = format!("{}{}", indent.unwrap_or(">   "), text);
        if self.style_prints {
            text = format!("%[[{}m{}%[[0m", style.code(), text);
        }
        self.set(Mutation::new("print", text).multi())
    }

    /// Print uWSGI magic variables with their values on startup.
    pub fn print_variables(&mut self) -> &mut Self {
        self.print_styled("===== variables =====", None, PrintStyle::Red);
        for (var, hint) in MAGIC_VARS {
            self.print_out(&format!("%{} = {} = %{}", var, hint, var), None);
        }
        self
    }

    /// Set an environment variable; `None` copies the value from the current process.
    pub fn env(&mut self, key: &str, value: Option<&str>) -> Result<&mut Self> {
        let value = match value {
            Some(value) => value.to_string(),
            None => std::env::var(key)
                .map_err(|e| ConfigError::MissingEnv(key.to_string(), e.to_string()))?,
        };
        Ok(self.set(Mutation::new("env", format!("{}={}", key, value)).multi()))
    }

    pub fn unset_env(&mut self, key: &str) -> &mut Self {
        self.set(Mutation::new("unenv", key).multi())
    }

    /// Include another configuration file or section.
    pub fn include<'t>(&mut self, target: impl Into<Target<'t>>) -> Result<&mut Self> {
        let value = target.into().render("ini")?;
        Ok(self.set(Mutation::new("ini", value).multi()))
    }

    /// Configuration to load if this one fails.
    pub fn set_fallback<'t>(&mut self, target: impl Into<Target<'t>>) -> Result<&mut Self> {
        let value = target.into().render("fallback-config")?;
        Ok(self.set(Mutation::new("fallback-config", value)))
    }

    /// Single-section configuration.
    pub fn as_configuration(self) -> Configuration {
        Configuration::new([self])
    }

    /// Render as INI text, optionally preceded by the generation banner.
    pub fn render(&self, banner: bool) -> String {
        let mut lines = Vec::with_capacity(self.options.len() + 2);
        if banner {
            lines.push(banner_line());
        }
        lines.push(format!("[{}]", self.effective_name()));
        for (key, value) in self.options.iter() {
            for line in value.lines() {
                lines.push(format!("{} = {}", key, line));
            }
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    fn register_plugin(&mut self, plugin: &str, command: &str) {
        if self.embedded_plugins.iter().any(|p| p == plugin) {
            tracing::debug!(section = %self.effective_name(), plugin = %plugin, "plugin is embedded, not registering");
            return;
        }
        if self.plugins.iter().any(|p| p == plugin) {
            return;
        }
        tracing::debug!(section = %self.effective_name(), plugin = %plugin, "activating plugin");
        self.plugins.push(plugin.to_string());
        self.set(Mutation::new(command, plugin).multi());
    }
}

impl OptionsTarget for Section {
    fn options_mut(&mut self) -> &mut OptionStore {
        &mut self.options
    }

    fn activate_plugin(&mut self, plugin: &str) {
        self.register_plugin(plugin, "plugin");
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Comment line opening generated files.
pub fn banner_line() -> String {
    format!(
        "; This configuration was automatically generated using uwsgiconf v{}",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Value;

    fn lines(section: &Section) -> Vec<String> {
        section.render(false).lines().map(str::to_string).collect()
    }

    #[test]
    fn test_unnamed_header_and_banner() {
        let section = Section::new();
        let text = section.render(true);
        assert!(text.contains("automatically generated"));
        assert!(text.contains("[uwsgi]"));
        assert_eq!(lines(&Section::named("mine")), vec!["[mine]"]);
    }

    #[test]
    fn test_strict_flag_set_and_unset() {
        let mut section = Section::new();
        section.set_basic_params(SectionParams {
            strict_config: Some(true),
        });
        assert_eq!(lines(&section), vec!["[uwsgi]", "strict = true"]);

        section.set_basic_params(SectionParams {
            strict_config: Some(false),
        });
        assert_eq!(lines(&section), vec!["[uwsgi]"]);

        section.set_basic_params(SectionParams {
            strict_config: Some(false),
        });
        assert!(section.options().is_empty());
    }

    #[test]
    fn test_print_plugins() {
        let mut section = Section::new();
        section.print_plugins();
        assert!(section.render(false).contains("plugins-list = true"));
    }

    #[test]
    fn test_print_out_styled() {
        let mut section = Section::new().with_style_prints(true);
        section.print_out("a", Some("AAA "));
        assert!(section.render(false).contains("print = %[[37;49mAAA a%[[0m"));
    }

    #[test]
    fn test_print_variables() {
        let mut section = Section::new();
        section.print_variables();
        let text = section.render(false);
        assert!(text.contains("print = >   ===== variables"));
        assert!(text.contains("%k = detected cpu cores = %k"));
    }

    #[test]
    fn test_env_and_unenv() {
        // SAFETY: test-only, no concurrent threads depend on this env var.
        unsafe { std::env::set_var("UWSGICONF_TEST_Q", "qq") };
        let mut section = Section::new();
        section
            .env("A", Some("aa"))
            .unwrap()
            .env("UWSGICONF_TEST_Q", None)
            .unwrap()
            .unset_env("B");
        assert_eq!(
            lines(&section),
            vec![
                "[uwsgi]",
                "env = A=aa",
                "env = UWSGICONF_TEST_Q=qq",
                "unenv = B"
            ]
        );
        // SAFETY: test-only cleanup.
        unsafe { std::env::remove_var("UWSGICONF_TEST_Q") };
    }

    #[test]
    fn test_env_missing_var_is_error() {
        let mut section = Section::new();
        let result = section.env("UWSGICONF_TEST_NEVER_SET", None);
        assert!(
            matches!(result, Err(ConfigError::MissingEnv(key, _)) if key == "UWSGICONF_TEST_NEVER_SET")
        );
        assert!(section.options().is_empty());
    }

    #[test]
    fn test_fallback_targets() {
        let mut section = Section::new();
        section.set_fallback("a/b.ini").unwrap();
        assert!(section.render(false).contains("fallback-config = a/b.ini"));

        let here = Section::named("here");
        let mut section = Section::new();
        section.set_fallback(&here).unwrap();
        assert!(section.render(false).contains("fallback-config = :here"));

        let unnamed = Section::new();
        let result = Section::new().set_fallback(&unnamed).map(|_| ());
        assert!(matches!(result, Err(ConfigError::UnnamedSection(d)) if d == "fallback-config"));
    }

    #[test]
    fn test_include_targets() {
        let here = Section::named("here");
        let mut section = Section::new();
        section.include("a/b.ini").unwrap().include(&here).unwrap();
        assert_eq!(
            lines(&section),
            vec!["[uwsgi]", "ini = a/b.ini", "ini = :here"]
        );

        let unnamed = Section::new();
        assert!(matches!(
            Section::new().include(&unnamed),
            Err(ConfigError::UnnamedSection(_))
        ));
    }

    #[test]
    fn test_plugins_params_dirs_first_and_deduplicated() {
        let mut section = Section::new();
        section.set_plugins_params(PluginsParams {
            plugins: vec!["plug".into(), "plug".into()],
            search_dirs: vec!["/here".into(), "/there".into()],
            autoload: Some(true),
            required: false,
        });
        assert_eq!(
            lines(&section),
            vec![
                "[uwsgi]",
                "plugins-dir = /here",
                "plugins-dir = /there",
                "plugin = plug",
                "autoload = true"
            ]
        );
        assert_eq!(section.plugins(), ["plug".to_string()]);
    }

    #[test]
    fn test_required_plugins() {
        let mut section = Section::new();
        section.set_plugins_params(PluginsParams {
            plugins: vec!["python3".into()],
            required: true,
            ..Default::default()
        });
        assert_eq!(lines(&section), vec!["[uwsgi]", "need-plugin = python3"]);
    }

    #[test]
    fn test_embedded_plugins_not_registered() {
        let mut section = Section::new().with_embedded_plugins(EmbeddedPlugins::Preset(EmbeddedPreset::Basic));
        section.set(Mutation::new("logger", "syslog:app").plugin("syslog").multi());
        assert!(!section.render(false).contains("plugin = syslog"));

        let mut section = Section::new().with_embedded_plugins(EmbeddedPlugins::List(vec!["geoip".into()]));
        section.set(Mutation::new("geoip-city", "x.dat").plugin("geoip"));
        section.set(Mutation::new("logger", "syslog:app").plugin("syslog").multi());
        let text = section.render(false);
        assert!(!text.contains("plugin = geoip"));
        assert!(text.contains("plugin = syslog"));
    }

    #[test]
    fn test_derive_from_is_independent() {
        let mut base = Section::named("mine");
        base.set(Mutation::new("workers", 3));

        let mut derived = Section::derive_from(&base, Some("other"));
        derived.set(Mutation::new("workers", 4));
        derived.set(Mutation::new("enable-threads", true).flag());

        base.set(Mutation::new("master", true).flag());

        assert_eq!(lines(&base), vec!["[mine]", "workers = 3", "master = true"]);
        assert_eq!(
            lines(&derived),
            vec!["[other]", "workers = 4", "enable-threads = true"]
        );

        let same_name = Section::derive_from(&base, None);
        assert_eq!(same_name.name(), Some("mine"));
    }

    #[test]
    fn test_multi_values_render_one_line_each() {
        let mut section = Section::new();
        section.set(Mutation::new("mount", "/a=a.py").multi());
        section.set(Mutation::new("chdir", "/srv"));
        section.set(Mutation::new("mount", "/b=b.py").multi());
        assert_eq!(
            lines(&section),
            vec!["[uwsgi]", "mount = /a=a.py", "mount = /b=b.py", "chdir = /srv"]
        );
        assert_eq!(
            section.options().get("mount"),
            Some(&Value::List(vec!["/a=a.py".into(), "/b=b.py".into()]))
        );
    }

    #[test]
    fn test_embedded_plugins_deserialize() {
        #[derive(Deserialize)]
        struct Holder {
            embedded: EmbeddedPlugins,
        }
        let preset: Holder = toml::from_str(r#"embedded = "basic""#).unwrap();
        assert_eq!(preset.embedded, EmbeddedPlugins::Preset(EmbeddedPreset::Basic));
        let list: Holder = toml::from_str(r#"embedded = ["a", "b"]"#).unwrap();
        assert_eq!(list.embedded, EmbeddedPlugins::List(vec!["a".into(), "b".into()]));
    }
}
