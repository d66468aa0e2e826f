//! A sensible baseline: strict parsing, master process, vacuum, thunder lock,
//! automatic process names and one worker per CPU unless told otherwise.

use serde::Deserialize;

use crate::groups::{
    LocksParams, MainProcessParams, MasterProcessParams, PythonParams, WorkersParams,
};
use crate::section::{Section, SectionParams};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NiceParams {
    pub name: Option<String>,
    /// Reload uWSGI when any of these files or directories is touched.
    pub touch_reload: Option<Vec<String>>,
    /// Worker processes; defaults to the number of CPU cores.
    pub workers: Option<u32>,
    /// Threads per worker.
    pub threads: Option<u32>,
}

/// Apply the nice baseline to an existing section.
pub fn configure_nice<'a>(section: &'a mut Section, params: &NiceParams) -> &'a mut Section {
    section.set_basic_params(SectionParams {
        strict_config: Some(true),
    });

    if params.touch_reload.is_some() {
        section.main_process().call(MainProcessParams {
            touch_reload: params.touch_reload.clone(),
            ..Default::default()
        });
    }

    match params.workers {
        Some(count) if count > 0 => section.workers().call(WorkersParams { count: Some(count) }),
        _ => section.workers().set_count_auto(),
    };

    section.workers().set_thread_params(None, params.threads);
    section.main_process().call(MainProcessParams {
        vacuum: Some(true),
        ..Default::default()
    });
    section.main_process().set_naming_params(Some(true), None);
    section.master_process().call(MasterProcessParams { enable: Some(true) });
    section.locks().call(LocksParams {
        thunder_lock: Some(true),
    })
}

/// Nice baseline plus the Python plugin and an optional WSGI module
/// (`package.module` or `package.module:callable`).
pub fn configure_python<'a>(
    section: &'a mut Section,
    params: &NiceParams,
    python: PythonParams,
    wsgi_module: Option<&str>,
) -> &'a mut Section {
    configure_nice(section, params);
    section.python().call(python);
    section.python().activate();
    section.python().set_wsgi_params(wsgi_module, None)
}

pub fn nice_section(params: NiceParams) -> Section {
    let mut section = new_section(&params);
    configure_nice(&mut section, &params);
    section
}

pub fn python_section(params: NiceParams, python: PythonParams, wsgi_module: Option<&str>) -> Section {
    let mut section = new_section(&params);
    configure_python(&mut section, &params, python, wsgi_module);
    section
}

fn new_section(params: &NiceParams) -> Section {
    match &params.name {
        Some(name) => Section::named(name.as_str()),
        None => Section::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nice_defaults() {
        let section = nice_section(NiceParams::default());
        assert_eq!(
            section.render(false),
            "[uwsgi]\nstrict = true\nworkers = %k\nvacuum = true\nauto-procname = true\n\
             master = true\nthunder-lock = true\n"
        );
    }

    #[test]
    fn test_nice_explicit_workers_and_reload() {
        let section = nice_section(NiceParams {
            name: Some("app".into()),
            touch_reload: Some(vec!["/srv/app/reload".into()]),
            workers: Some(13),
            threads: Some(4),
        });
        let text = section.render(false);
        assert!(text.starts_with("[app]\n"));
        assert!(text.contains("workers = 13\n"));
        assert!(text.contains("touch-reload = /srv/app/reload\n"));
        assert!(text.contains("threads = 4\n"));
        assert!(!text.contains("enable-threads"));
    }

    #[test]
    fn test_python_preset() {
        let section = python_section(
            NiceParams::default(),
            PythonParams {
                python_home: Some("/home/idle/venv/".into()),
                search_path: Some(vec!["/home/idle/apps/".into()]),
                ..Default::default()
            },
            Some("somepackage.module"),
        );
        let text = section.render(false);
        assert!(
            text.contains("plugin = python\npyhome = /home/idle/venv/\npythonpath = /home/idle/apps/"),
            "{}",
            text
        );
        assert!(text.contains("wsgi = somepackage.module"));
        assert_eq!(text.matches("plugin = python").count(), 1);
    }
}
