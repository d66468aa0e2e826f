//! The option mutation primitive shared by every option group.
//!
//! A `Mutation` describes one setter call: target key, value, condition, flag cast,
//! multiplicity, required plugin and priority. `apply` resolves plugin activation,
//! key replacement, nested contributions and list/priority placement against an
//! `OptionsTarget`.

use super::parametrized::ParametrizedValue;
use super::store::{OptionStore, Value};

/// Value argument accepted by option setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Null,
    Bool(bool),
    Text(String),
    Param(ParametrizedValue),
    /// Parts joined with spaces into one stored value.
    Tuple(Vec<Arg>),
    /// Elements of a multi-valued option.
    List(Vec<Arg>),
}

impl Arg {
    pub fn is_null(&self) -> bool {
        matches!(self, Arg::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Arg::Null => false,
            Arg::Bool(value) => *value,
            Arg::Text(value) => !value.is_empty(),
            Arg::Param(_) => true,
            Arg::Tuple(parts) | Arg::List(parts) => !parts.is_empty(),
        }
    }

    /// Textual form written into the section.
    pub fn render(&self) -> String {
        match self {
            Arg::Null => String::new(),
            Arg::Bool(value) => value.to_string(),
            Arg::Text(value) => value.clone(),
            Arg::Param(value) => value.to_string(),
            Arg::Tuple(parts) | Arg::List(parts) => join_parts(parts),
        }
    }

    fn into_elements(self) -> Vec<Arg> {
        match self {
            Arg::Null => Vec::new(),
            Arg::List(items) => items,
            other => vec![other],
        }
    }
}

fn join_parts(parts: &[Arg]) -> String {
    parts
        .iter()
        .map(Arg::render)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Text(value.clone())
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<ParametrizedValue> for Arg {
    fn from(value: ParametrizedValue) -> Self {
        Arg::Param(value)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Null, Into::into)
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(values: Vec<T>) -> Self {
        Arg::List(values.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Arg>, B: Into<Arg>> From<(A, B)> for Arg {
    fn from((a, b): (A, B)) -> Self {
        Arg::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: Into<Arg>, B: Into<Arg>, C: Into<Arg>> From<(A, B, C)> for Arg {
    fn from((a, b, c): (A, B, C)) -> Self {
        Arg::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

macro_rules! arg_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Text(value.to_string())
                }
            }
        )*
    };
}

arg_from_number!(u8, u16, u32, u64, usize, i32, i64);

/// When a mutation is allowed to touch the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Condition {
    /// Apply only when the value is not null.
    #[default]
    Default,
    /// Apply unconditionally, null values included.
    Always,
    Never,
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        if value {
            Condition::Always
        } else {
            Condition::Never
        }
    }
}

/// One setter call against a section's option store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    key: String,
    value: Arg,
    condition: Condition,
    flag: bool,
    multi: bool,
    plugin: Option<String>,
    priority: Option<usize>,
}

impl Mutation {
    pub fn new(key: impl Into<String>, value: impl Into<Arg>) -> Self {
        Mutation {
            key: key.into(),
            value: value.into(),
            condition: Condition::Default,
            flag: false,
            multi: false,
            plugin: None,
            priority: None,
        }
    }

    /// Treat the value as a boolean flag: truthy stores `true`, falsy removes the key.
    pub fn flag(mut self) -> Self {
        self.flag = true;
        self
    }

    /// Accumulate values under the key instead of replacing.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Plugin exposing this option; activated automatically.
    pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// Zero-based position of the key among the other entries.
    pub fn priority(mut self, position: usize) -> Self {
        self.priority = Some(position);
        self
    }

    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Anything owning an option store that mutations can be applied to.
pub trait OptionsTarget {
    fn options_mut(&mut self) -> &mut OptionStore;

    /// Register `plugin` for loading. De-duplication is up to the implementor.
    fn activate_plugin(&mut self, plugin: &str);
}

/// Final key for a value: a parametrized value's own key replaces the caller's.
pub fn resolve_key(key: String, value: &Arg) -> String {
    match value {
        Arg::Param(param) => param.opt_key().map_or(key, str::to_string),
        _ => key,
    }
}

/// Apply `mutation` to `target`.
///
/// `group_plugin` is the plugin of a plugin-backed option group issuing the call.
pub fn apply<T>(target: &mut T, mutation: Mutation, group_plugin: Option<&str>)
where
    T: OptionsTarget + ?Sized,
{
    let Mutation {
        key,
        mut value,
        condition,
        flag,
        multi,
        plugin,
        priority,
    } = mutation;

    let proceed = match condition {
        Condition::Default => !value.is_null(),
        Condition::Always => true,
        Condition::Never => false,
    };
    if !proceed {
        return;
    }

    if flag {
        if value.is_truthy() {
            value = Arg::Text("true".to_string());
        } else {
            target.options_mut().remove(&key);
            return;
        }
    }

    if let Some(group_plugin) = group_plugin {
        target.activate_plugin(group_plugin);
    }

    if let Some(plugin) = plugin.as_deref() {
        target.activate_plugin(plugin);
    }

    let mut key = key;

    if let Arg::Tuple(parts) = &value {
        for part in parts {
            key = absorb(target, key, part);
        }
        let joined = join_parts(parts);
        value = Arg::Text(joined);
    }

    if multi {
        let mut values = Vec::new();
        for element in value.into_elements() {
            key = absorb(target, key, &element);
            values.push(element.render());
        }

        if values.is_empty() {
            return;
        }

        let store = target.options_mut();
        match priority {
            Some(position) => store.insert_at(key, Value::List(values), position),
            None => store.extend_list(key, values),
        }
    } else {
        key = absorb(target, key, &value);
        let value = Value::Single(value.render());

        let store = target.options_mut();
        match priority {
            Some(position) => store.insert_at(key, value, position),
            None => store.insert(key, value),
        }
    }
}

/// Extract a parametrized value's side effects; returns the resolved key.
fn absorb<T>(target: &mut T, key: String, value: &Arg) -> String
where
    T: OptionsTarget + ?Sized,
{
    let Arg::Param(param) = value else {
        return key;
    };

    if let Some(plugin) = param.plugin() {
        target.activate_plugin(plugin);
    }

    if !param.options().is_empty() {
        target.options_mut().merge(param.options());
    }

    resolve_key(key, value)
}
