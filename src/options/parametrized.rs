//! Composable option values.
//!
//! A `ParametrizedValue` renders to a single directive value (`name:arg1 arg2`) but
//! may also redirect the directive to its own key, require a plugin, and carry
//! extra options that land in the section when the value is used.

use std::fmt;

use super::mutation::Arg;
use super::store::{OptionStore, Value};

/// A standalone composable value passed to option setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParametrizedValue {
    name: String,
    args: Vec<String>,
    alias: Option<String>,
    args_joiner: String,
    name_separator: String,
    name_separator_strip: bool,
    opt_key: Option<String>,
    plugin: Option<String>,
    options: OptionStore,
}

impl ParametrizedValue {
    pub fn new(name: impl Into<String>) -> Self {
        ParametrizedValue {
            name: name.into(),
            args: Vec::new(),
            alias: None,
            args_joiner: " ".to_string(),
            name_separator: ":".to_string(),
            name_separator_strip: false,
            opt_key: None,
            plugin: None,
            options: OptionStore::new(),
        }
    }

    /// Append a positional argument. Null arguments are skipped on render.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        let arg = arg.into();
        if !arg.is_null() {
            self.args.push(arg.render());
        }
        self
    }

    pub fn args<I, A>(self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        args.into_iter().fold(self, |value, arg| value.arg(arg))
    }

    /// Token rendered in front of the value (e.g. a named logger).
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn joiner(mut self, joiner: &str) -> Self {
        self.args_joiner = joiner.to_string();
        self
    }

    pub fn separator(mut self, separator: &str) -> Self {
        self.name_separator = separator.to_string();
        self
    }

    /// Strip leading and trailing separator characters from the rendered value.
    pub fn strip_separator(mut self) -> Self {
        self.name_separator_strip = true;
        self
    }

    /// File the value under `key` instead of the key the setter was called with.
    ///
    /// Values with their own key render without the `name:` prefix.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.opt_key = Some(key.into());
        self
    }

    pub fn requires_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// Extra option merged into the section when this value is used.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.options.insert(key, Value::Single(value.into().render()));
        self
    }

    /// Extra multi-valued option merged into the section when this value is used.
    pub fn with_options<I, A>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let values = values.into_iter().map(|v| v.into().render()).collect();
        self.options.extend_list(key, values);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opt_key(&self) -> Option<&str> {
        self.opt_key.as_deref()
    }

    pub fn plugin(&self) -> Option<&str> {
        self.plugin.as_deref()
    }

    pub fn options(&self) -> &OptionStore {
        &self.options
    }
}

impl fmt::Display for ParametrizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = String::new();

        if self.opt_key.is_none() {
            result.push_str(&self.name);
            result.push_str(&self.name_separator);
        }

        result.push_str(&self.args.join(&self.args_joiner));

        if let Some(alias) = &self.alias {
            result = format!("{} {}", alias, result);
        }

        let mut result = result.trim();

        if self.name_separator_strip {
            let separator = self.name_separator.as_str();
            result = result.trim_matches(|c| separator.contains(c));
        }

        f.write_str(result)
    }
}
