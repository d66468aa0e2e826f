use serde::Deserialize;

use crate::options::{Mutation, OptionsGroup, Scope};
use crate::section::Section;

/// Locking subsystem.
#[derive(Debug, Clone, Default)]
pub struct Locks;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocksParams {
    /// Serialize `accept()` usage across workers.
    pub thunder_lock: Option<bool>,
}

impl OptionsGroup for Locks {
    const ID: &'static str = "locks";
    type Params = LocksParams;

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        scope.set(Mutation::new("thunder-lock", params.thunder_lock).flag());
        scope.into_section()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thunder_lock() {
        let mut section = Section::new();
        section.locks().call(LocksParams { thunder_lock: Some(true) });
        assert_eq!(section.render(false), "[uwsgi]\nthunder-lock = true\n");
    }
}
