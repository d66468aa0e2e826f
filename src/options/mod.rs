//! Option groups and the machinery they share.
//!
//! An option group is a set of related setters (workers, routing, a plugin...)
//! bound to one `Section`. Each section lazily instantiates at most one instance of
//! every group type it is asked for and keeps it in its `GroupCache`; setters are
//! reached through a `Scope`, which borrows the section exclusively and hands it
//! back from every setter for chaining.

pub mod mutation;
pub mod parametrized;
pub mod store;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::section::Section;

pub use mutation::{Arg, Condition, Mutation, OptionsTarget};
pub use parametrized::ParametrizedValue;
pub use store::{OptionStore, Value};

/// A group of related options bound to a section.
pub trait OptionsGroup: Any + Clone + Default + fmt::Debug {
    /// Stable identifier. Also the table name of the group's basic params.
    const ID: &'static str;

    /// Using any option of the group registers the group's plugin (its `name()`).
    const AUTO_PLUGIN: bool = false;

    /// Basic parameters. Unknown keys are ignored when deserializing.
    type Params: DeserializeOwned + Default;

    /// Display name; the plugin name for plugin-backed groups.
    fn name(&self) -> String {
        Self::ID.to_string()
    }

    fn set_basic_params<'a>(scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section;
}

/// Handle to group `G` of one section.
pub struct Scope<'a, G: OptionsGroup> {
    section: &'a mut Section,
    group: PhantomData<G>,
}

impl<'a, G: OptionsGroup> Scope<'a, G> {
    pub(crate) fn new(section: &'a mut Section) -> Self {
        section.groups.get_or_init::<G>();
        Scope {
            section,
            group: PhantomData,
        }
    }

    /// Apply one mutation, activating the group's plugin when the group is plugin-backed.
    pub fn set(&mut self, mutation: Mutation) {
        let group_plugin = G::AUTO_PLUGIN.then(|| self.state().name());
        mutation::apply(&mut *self.section, mutation, group_plugin.as_deref());
    }

    pub fn set_basic_params(self, params: G::Params) -> &'a mut Section {
        G::set_basic_params(self, params)
    }

    /// Calling the group is the same as setting its basic params.
    pub fn call(self, params: G::Params) -> &'a mut Section {
        self.set_basic_params(params)
    }

    /// The group instance cached by the section.
    pub fn state(&mut self) -> &mut G {
        self.section.groups.get_or_init::<G>()
    }

    pub fn section_mut(&mut self) -> &mut Section {
        &mut *self.section
    }

    /// Finish with this group and hand the section back.
    pub fn into_section(self) -> &'a mut Section {
        self.section
    }
}

impl<G: OptionsGroup> fmt::Display for Scope<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .section
            .groups
            .get::<G>()
            .map_or_else(|| G::ID.to_string(), |group| group.name());
        f.write_str(&name)
    }
}

trait CachedGroup: Any + fmt::Debug {
    fn clone_boxed(&self) -> Box<dyn CachedGroup>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<G: OptionsGroup> CachedGroup for G {
    fn clone_boxed(&self) -> Box<dyn CachedGroup> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn CachedGroup> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Per-section cache of instantiated option groups, keyed by `OptionsGroup::ID`.
#[derive(Debug, Clone, Default)]
pub struct GroupCache {
    groups: BTreeMap<&'static str, Box<dyn CachedGroup>>,
}

impl GroupCache {
    pub fn get<G: OptionsGroup>(&self) -> Option<&G> {
        self.groups
            .get(G::ID)
            .and_then(|group| group.as_any().downcast_ref::<G>())
    }

    pub fn get_or_init<G: OptionsGroup>(&mut self) -> &mut G {
        let slot = self.groups.entry(G::ID).or_insert_with(|| {
            tracing::debug!(group = G::ID, "instantiating option group");
            Box::new(G::default())
        });

        if !slot.as_any().is::<G>() {
            tracing::warn!(
                group = G::ID,
                requested = std::any::type_name::<G>(),
                "option group identifier shared by another type, dropping its cached state"
            );
            *slot = Box::new(G::default());
        }

        match slot.as_any_mut().downcast_mut::<G>() {
            Some(group) => group,
            None => unreachable!("group slot holds the requested type"),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    /// Identifiers of instantiated groups.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.groups.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default)]
    struct Counter {
        version: Option<u32>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct CounterParams {
        version: Option<u32>,
        home: Option<String>,
    }

    impl OptionsGroup for Counter {
        const ID: &'static str = "counter";
        const AUTO_PLUGIN: bool = true;
        type Params = CounterParams;

        fn name(&self) -> String {
            match self.version {
                Some(version) => format!("counter{}", version),
                None => "counter".to_string(),
            }
        }

        fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
            if params.version.is_some() {
                scope.state().version = params.version;
            }
            scope.set(Mutation::new("counter-home", params.home));
            scope.into_section()
        }
    }

    #[test]
    fn test_group_instantiated_once() {
        let mut section = Section::new();
        assert!(section.groups.is_empty());

        section.group::<Counter>().state().version = Some(3);
        assert_eq!(section.groups.len(), 1);
        assert_eq!(section.groups.get::<Counter>().unwrap().version, Some(3));

        // Second access returns the cached instance.
        assert_eq!(section.group::<Counter>().state().version, Some(3));
        assert_eq!(section.groups.ids().collect::<Vec<_>>(), vec!["counter"]);
    }

    #[test]
    fn test_auto_plugin_uses_group_state_name() {
        let mut section = Section::new();
        section.group::<Counter>().set_basic_params(CounterParams {
            version: Some(34),
            home: Some("/here".into()),
        });
        let rendered = section.to_string();
        assert!(rendered.contains("plugin = counter34"), "{}", rendered);
        assert!(rendered.contains("counter-home = /here"));
    }

    #[test]
    fn test_call_equals_set_basic_params() {
        let mut a = Section::new();
        a.group::<Counter>().call(CounterParams {
            home: Some("/x".into()),
            ..Default::default()
        });
        let mut b = Section::new();
        b.init_group::<Counter>(CounterParams {
            home: Some("/x".into()),
            ..Default::default()
        });
        assert_eq!(a.options(), b.options());
    }

    #[test]
    fn test_all_null_params_leave_store_unchanged() {
        let mut section = Section::new();
        section.group::<Counter>().set_basic_params(CounterParams::default());
        assert!(section.options().is_empty());
    }

    #[test]
    fn test_scope_display_is_group_name() {
        let mut section = Section::new();
        let mut scope = section.group::<Counter>();
        assert_eq!(scope.to_string(), "counter");
        scope.state().version = Some(2);
        assert_eq!(scope.to_string(), "counter2");
    }

    #[derive(Debug, Clone, Default)]
    struct Impostor {
        marker: bool,
    }

    impl OptionsGroup for Impostor {
        const ID: &'static str = "counter";
        type Params = CounterParams;

        fn set_basic_params<'a>(scope: Scope<'a, Self>, _params: Self::Params) -> &'a mut Section {
            scope.into_section()
        }
    }

    #[test]
    fn test_shared_identifier_replaces_cached_group() {
        let mut cache = GroupCache::default();
        cache.get_or_init::<Counter>().version = Some(5);
        cache.get_or_init::<Impostor>().marker = true;

        assert_eq!(cache.len(), 1);
        assert!(cache.get::<Counter>().is_none());
        assert!(cache.get::<Impostor>().unwrap().marker);

        // Switching back starts from a fresh default.
        assert_eq!(cache.get_or_init::<Counter>().version, None);
    }

    #[test]
    fn test_cache_cloned_with_section() {
        let mut section = Section::new();
        section.group::<Counter>().state().version = Some(7);
        let copy = section.clone();
        assert_eq!(copy.groups.get::<Counter>().unwrap().version, Some(7));
    }
}
