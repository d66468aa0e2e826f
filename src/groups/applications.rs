use serde::Deserialize;

use crate::options::{Mutation, OptionsGroup, Scope};
use crate::section::Section;

/// Application loading and mounting.
#[derive(Debug, Clone, Default)]
pub struct Applications;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationsParams {
    /// Exit if no app can be loaded.
    pub exit_if_none: Option<bool>,
    /// Maximum number of per-worker applications.
    pub max_per_worker: Option<u32>,
    /// Load every app into the same interpreter.
    pub single_interpreter: Option<bool>,
    /// Do not fall back to the default app.
    pub no_default: Option<bool>,
}

impl OptionsGroup for Applications {
    const ID: &'static str = "applications";
    type Params = ApplicationsParams;

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        scope.set(Mutation::new("need-app", params.exit_if_none).flag());
        scope.set(Mutation::new("max-apps", params.max_per_worker));
        scope.set(Mutation::new("single-interpreter", params.single_interpreter).flag());
        scope.set(Mutation::new("no-default-app", params.no_default).flag());
        scope.into_section()
    }
}

impl<'a> Scope<'a, Applications> {
    /// Chdir to `to` before apps are loaded, or after when `after_load` is set.
    pub fn change_dir(mut self, to: &str, after_load: bool) -> &'a mut Section {
        let key = if after_load { "chdir2" } else { "chdir" };
        self.set(Mutation::new(key, to));
        self.into_section()
    }

    /// Load `app` under `mountpoint` (host name, URL part...).
    ///
    /// With `into_worker` the app is mounted in workers after they spawn.
    pub fn mount(mut self, mountpoint: &str, app: &str, into_worker: bool) -> &'a mut Section {
        let key = if into_worker { "worker-mount" } else { "mount" };
        self.set(Mutation::new(key, format!("{}={}", mountpoint, app)).multi());
        self.into_section()
    }

    /// Put uWSGI in cheap mode after `timeout` seconds of inactivity.
    pub fn set_idle_params(mut self, timeout: Option<u32>, exit: Option<bool>) -> &'a mut Section {
        self.set(Mutation::new("idle", timeout));
        self.set(Mutation::new("die-on-idle", exit).flag());
        self.into_section()
    }

    /// Load apps in workers instead of master.
    ///
    /// With `affect_master` only workers are reloaded by reload signals.
    pub fn switch_into_lazy_mode(mut self, affect_master: bool) -> &'a mut Section {
        let key = if affect_master { "lazy" } else { "lazy-apps" };
        self.set(Mutation::new(key, true).flag());
        self.into_section()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_params() {
        let mut section = Section::new();
        section.applications().call(ApplicationsParams {
            exit_if_none: Some(true),
            max_per_worker: Some(5),
            single_interpreter: Some(false),
            no_default: Some(true),
        });
        assert_eq!(
            section.render(false),
            "[uwsgi]\nneed-app = true\nmax-apps = 5\nno-default-app = true\n"
        );
    }

    #[test]
    fn test_mounts_and_dirs() {
        let mut section = Section::new();
        section
            .applications()
            .mount("/app1", "app1.py", false)
            .applications()
            .mount("example.com", "app2.py", false)
            .applications()
            .mount("/w", "w.py", true)
            .applications()
            .change_dir("/srv", true);
        assert_eq!(
            section.render(false),
            "[uwsgi]\nmount = /app1=app1.py\nmount = example.com=app2.py\n\
             worker-mount = /w=w.py\nchdir2 = /srv\n"
        );
    }

    #[test]
    fn test_idle_and_lazy() {
        let mut section = Section::new();
        section.applications().set_idle_params(Some(30), Some(true));
        section.applications().switch_into_lazy_mode(false);
        assert_eq!(
            section.render(false),
            "[uwsgi]\nidle = 30\ndie-on-idle = true\nlazy-apps = true\n"
        );
    }
}
