use serde::Deserialize;

use crate::options::{Mutation, OptionsGroup, Scope};
use crate::section::Section;

/// The master process supervising workers.
#[derive(Debug, Clone, Default)]
pub struct MasterProcess;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MasterProcessParams {
    #[serde(alias = "enabled")]
    pub enable: Option<bool>,
}

impl OptionsGroup for MasterProcess {
    const ID: &'static str = "master_process";
    type Params = MasterProcessParams;

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        scope.set(Mutation::new("master", params.enable).flag());
        scope.into_section()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_and_disable() {
        let mut section = Section::new();
        section.master_process().call(MasterProcessParams { enable: Some(true) });
        assert_eq!(section.render(false), "[uwsgi]\nmaster = true\n");

        section.master_process().call(MasterProcessParams { enable: Some(false) });
        assert!(section.options().is_empty());
    }
}
