use serde::Deserialize;

use crate::options::{Mutation, OptionsGroup, Scope};
use crate::section::Section;

/// Main process lifecycle: reload triggers, pid file, naming.
#[derive(Debug, Clone, Default)]
pub struct MainProcess;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MainProcessParams {
    /// Reload uWSGI when any of these files is touched.
    pub touch_reload: Option<Vec<String>>,
    /// Remove generated files and sockets on exit.
    pub vacuum: Option<bool>,
    pub pid_file: Option<String>,
}

impl OptionsGroup for MainProcess {
    const ID: &'static str = "main_process";
    type Params = MainProcessParams;

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        scope.set(Mutation::new("touch-reload", params.touch_reload).multi());
        scope.set(Mutation::new("vacuum", params.vacuum).flag());
        scope.set(Mutation::new("pidfile", params.pid_file));
        scope.into_section()
    }
}

impl<'a> Scope<'a, MainProcess> {
    /// Process naming: automatic meaningful names and a common prefix.
    pub fn set_naming_params(mut self, autonaming: Option<bool>, prefix: Option<&str>) -> &'a mut Section {
        self.set(Mutation::new("auto-procname", autonaming).flag());
        self.set(Mutation::new("procname-prefix", prefix));
        self.into_section()
    }
}
