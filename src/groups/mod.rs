//! Built-in option groups.
//!
//! Each group covers one uWSGI subsystem and only talks to its section through the
//! mutation primitive. Groups are reachable from a section by accessor
//! (`section.workers()`) or by identifier through [`apply_group_table`], which is
//! what parameter bags (TOML tables) use.

mod applications;
mod locks;
mod logging;
mod main_process;
mod master_process;
mod networking;
mod python;
pub mod routing;
mod workers;

pub use applications::{Applications, ApplicationsParams};
pub use locks::{Locks, LocksParams};
pub use logging::{Logger, Logging, LoggingParams};
pub use main_process::{MainProcess, MainProcessParams};
pub use master_process::{MasterProcess, MasterProcessParams};
pub use networking::{Networking, NetworkingParams, Socket};
pub use python::{Python, PythonParams, PythonVersion};
pub use routing::{Action, RouteRule, Router, Routing, RoutingParams, Stage, Subject};
pub use workers::{FarmSpec, Workers, WorkersParams};

use crate::error::{ConfigError, Result};
use crate::options::{OptionsGroup, Scope};
use crate::section::Section;

impl Section {
    pub fn applications(&mut self) -> Scope<'_, Applications> {
        self.group()
    }

    pub fn locks(&mut self) -> Scope<'_, Locks> {
        self.group()
    }

    pub fn logging(&mut self) -> Scope<'_, Logging> {
        self.group()
    }

    pub fn main_process(&mut self) -> Scope<'_, MainProcess> {
        self.group()
    }

    pub fn master_process(&mut self) -> Scope<'_, MasterProcess> {
        self.group()
    }

    pub fn networking(&mut self) -> Scope<'_, Networking> {
        self.group()
    }

    pub fn python(&mut self) -> Scope<'_, Python> {
        self.group()
    }

    pub fn routing(&mut self) -> Scope<'_, Routing> {
        self.group()
    }

    pub fn workers(&mut self) -> Scope<'_, Workers> {
        self.group()
    }
}

type ApplyTableFn = fn(&mut Section, toml::Value) -> Result<()>;

const GROUPS: &[(&str, ApplyTableFn)] = &[
    (Applications::ID, apply_table::<Applications>),
    (Locks::ID, apply_table::<Locks>),
    (Logging::ID, apply_table::<Logging>),
    (MainProcess::ID, apply_table::<MainProcess>),
    (MasterProcess::ID, apply_table::<MasterProcess>),
    (Networking::ID, apply_table::<Networking>),
    (Python::ID, apply_table::<Python>),
    (Routing::ID, apply_table::<Routing>),
    (Workers::ID, apply_table::<Workers>),
];

/// Apply a parameter table to the group identified by `id`.
///
/// Returns `Ok(false)` when `id` names no built-in group.
pub fn apply_group_table(section: &mut Section, id: &str, table: toml::Value) -> Result<bool> {
    match GROUPS.iter().find(|(group_id, _)| *group_id == id) {
        Some((_, apply)) => {
            apply(section, table)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Returns a sorted list of all built-in group identifiers.
pub fn available_groups() -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = GROUPS.iter().map(|(id, _)| *id).collect();
    ids.sort_unstable();
    ids
}

fn apply_table<G: OptionsGroup>(section: &mut Section, table: toml::Value) -> Result<()> {
    let params: G::Params = table
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidParams(G::ID.to_string(), e.to_string()))?;
    section.init_group::<G>(params);
    Ok(())
}
