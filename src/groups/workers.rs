use std::fmt;

use serde::Deserialize;

use crate::options::{Mutation, OptionsGroup, Scope};
use crate::section::Section;

/// Worker processes: count, threads, mules and farms.
#[derive(Debug, Clone, Default)]
pub struct Workers;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkersParams {
    /// Number of worker processes.
    pub count: Option<u32>,
}

/// A named group of mules; messages sent to the farm are picked by any member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmSpec {
    pub name: String,
    pub mules: Vec<u32>,
}

impl FarmSpec {
    pub fn new(name: impl Into<String>, mules: impl IntoIterator<Item = u32>) -> Self {
        FarmSpec {
            name: name.into(),
            mules: mules.into_iter().collect(),
        }
    }
}

impl fmt::Display for FarmSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mules: Vec<String> = self.mules.iter().map(u32::to_string).collect();
        write!(f, "{}:{}", self.name, mules.join(","))
    }
}

impl OptionsGroup for Workers {
    const ID: &'static str = "workers";
    type Params = WorkersParams;

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        scope.set(Mutation::new("workers", params.count));
        scope.into_section()
    }
}

impl<'a> Scope<'a, Workers> {
    /// One worker per detected CPU core.
    pub fn set_count_auto(mut self) -> &'a mut Section {
        self.set(Mutation::new("workers", "%k"));
        self.into_section()
    }

    pub fn set_thread_params(mut self, enable: Option<bool>, per_worker: Option<u32>) -> &'a mut Section {
        self.set(Mutation::new("enable-threads", enable).flag());
        self.set(Mutation::new("threads", per_worker));
        self.into_section()
    }

    /// Spawn `count` mules and group them into `farms`.
    pub fn set_mules_params(mut self, count: Option<u32>, farms: Vec<FarmSpec>) -> &'a mut Section {
        self.set(Mutation::new("mules", count));
        let farms: Vec<String> = farms.iter().map(FarmSpec::to_string).collect();
        self.set(Mutation::new("farm", farms).multi());
        self.into_section()
    }
}
