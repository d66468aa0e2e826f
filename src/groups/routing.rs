//! Internal routing: route rules, error pages, header manipulation and dedicated routers.
//!
//! A route rule pairs an [`Action`] with an optional [`Subject`] check and is
//! processed at one request [`Stage`]:
//!
//! ```
//! use uwsgiconf::groups::routing::{Action, RouteRule, Stage, Subject};
//! use uwsgiconf::Section;
//!
//! let mut section = Section::new();
//! section.routing().register_route(
//!     vec![
//!         RouteRule::on("^/old/", Action::Redirect { url: "/new/".into(), permanent: true }),
//!         RouteRule::new(Action::Log { message: "done".into() }, None, Stage::Final),
//!     ],
//!     None,
//! );
//! let text = section.to_string();
//! assert!(text.contains("route = ^/old/ redirect-301:/new/"));
//! assert!(text.contains("final-route-run = log:done"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::options::{Arg, Mutation, OptionsGroup, ParametrizedValue, Scope};
use crate::section::Section;

/// Statuses uWSGI can serve managed error pages for.
pub const ERROR_PAGE_STATUSES: [u16; 3] = [403, 404, 500];

/// Request processing stage (chain) a rule belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    /// Before the request is passed to the plugin.
    #[default]
    Request,
    /// As soon as an HTTP status code is generated. Recursive.
    Error,
    /// After the last response header, just before the body.
    Response,
    /// After the response has been sent.
    Final,
}

impl Stage {
    fn prefix(self) -> &'static str {
        match self {
            Stage::Request => "",
            Stage::Error => "error",
            Stage::Response => "response",
            Stage::Final => "final",
        }
    }
}

/// Check applied by a custom subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Exists,
    IsFile,
    IsDir,
    IsLink,
    IsExec,
    Empty,
    Equal(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Regexp(String),
    IsHigher(String),
    IsLower(String),
}

impl Check {
    fn render(&self, subject: &str) -> String {
        let (name, operand) = match self {
            Check::Exists => ("exists", None),
            Check::IsFile => ("isfile", None),
            Check::IsDir => ("isdir", None),
            Check::IsLink => ("islink", None),
            Check::IsExec => ("isexec", None),
            Check::Empty => ("empty", None),
            Check::Equal(operand) => ("equal", Some(operand)),
            Check::StartsWith(operand) => ("startswith", Some(operand)),
            Check::EndsWith(operand) => ("endswith", Some(operand)),
            Check::Contains(operand) => ("contains", Some(operand)),
            Check::Regexp(operand) => ("regexp", Some(operand)),
            Check::IsHigher(operand) => ("ishigher", Some(operand)),
            Check::IsLower(operand) => ("islower", Some(operand)),
        };
        match operand {
            Some(operand) => format!("{}:{};{}", name, subject, operand),
            None => format!("{}:{}", name, subject),
        }
    }
}

/// What a route rule checks before running its action.
///
/// Builtin subjects match a request attribute against a regular expression and are
/// optimized by uWSGI at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    HttpHost(String),
    HttpReferer(String),
    HttpUserAgent(String),
    PathInfo(String),
    QueryString(String),
    RemoteAddr(String),
    RemoteUser(String),
    RequestUri(String),
    Status(String),
    /// Any value (usually a `${VAR}`) under a check; `negate` inverts the result.
    Custom {
        subject: String,
        check: Check,
        negate: bool,
    },
}

impl Subject {
    pub fn custom(subject: impl Into<String>, check: Check) -> Self {
        Subject::Custom {
            subject: subject.into(),
            check,
            negate: false,
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Subject::Custom { subject, check, negate } => Subject::Custom {
                subject,
                check,
                negate: !negate,
            },
            builtin => builtin,
        }
    }

    /// Command suffix and rule text.
    fn parts(&self) -> (&'static str, String) {
        match self {
            Subject::HttpHost(regexp) => ("host", regexp.clone()),
            Subject::HttpReferer(regexp) => ("referer", regexp.clone()),
            Subject::HttpUserAgent(regexp) => ("user-agent", regexp.clone()),
            Subject::PathInfo(regexp) => ("", regexp.clone()),
            Subject::QueryString(regexp) => ("qs", regexp.clone()),
            Subject::RemoteAddr(regexp) => ("remote-addr", regexp.clone()),
            Subject::RemoteUser(regexp) => ("remote-user", regexp.clone()),
            Subject::RequestUri(regexp) => ("uri", regexp.clone()),
            Subject::Status(regexp) => ("status", regexp.clone()),
            Subject::Custom { subject, check, negate } => {
                let command = if *negate { "if-not" } else { "if" };
                (command, check.render(subject))
            }
        }
    }
}

/// Plain strings are `PATH_INFO` regular expressions.
impl From<&str> for Subject {
    fn from(regexp: &str) -> Self {
        Subject::PathInfo(regexp.to_string())
    }
}

impl From<String> for Subject {
    fn from(regexp: String) -> Self {
        Subject::PathInfo(regexp)
    }
}

/// Route actions and response transformations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Stop scanning and close the request, optionally with a status.
    /// `return_body` also sends the status body.
    Break { status: Option<u16>, return_body: bool },
    /// Stop scanning and run the request.
    Continue,
    /// Jump to a label.
    Goto { label: String },
    Log { message: String },
    Redirect { url: String, permanent: bool },
    /// Rewrite `PATH_INFO`; with `last` stop scanning afterwards.
    Rewrite { rule: String, last: bool },
    HeaderAdd { name: String, value: String },
    HeaderRemove { name: String },
    HeadersOff,
    HeadersReset { status: u16 },
    Send { data: String, crnl: bool },
    ServeStatic { path: String },
    SetHarakiri { timeout: u32 },
    Signal { num: u8 },
    AuthBasic {
        realm: String,
        user: String,
        password: Option<String>,
    },
    SetVarPathInfo { value: String },
    FixVarPathInfo,
    /// Gzip the response body.
    Gzip,
    /// Chunk the response.
    Chunked,
    /// Store the response into a file.
    ToFile { path: String },
}

impl Action {
    fn into_value(self) -> ParametrizedValue {
        match self {
            Action::Break { status, return_body } => {
                let name = if return_body { "return" } else { "break" };
                ParametrizedValue::new(name).arg(status).strip_separator()
            }
            Action::Continue => ParametrizedValue::new("continue").strip_separator(),
            Action::Goto { label } => ParametrizedValue::new("goto").arg(label),
            Action::Log { message } => ParametrizedValue::new("log").arg(message),
            Action::Redirect { url, permanent } => {
                let name = if permanent { "redirect-301" } else { "redirect-302" };
                ParametrizedValue::new(name)
                    .arg(url)
                    .requires_plugin("router_redirect")
            }
            Action::Rewrite { rule, last } => {
                let name = if last { "rewrite-last" } else { "rewrite" };
                ParametrizedValue::new(name)
                    .arg(rule)
                    .requires_plugin("router_rewrite")
            }
            Action::HeaderAdd { name, value } => {
                ParametrizedValue::new("addheader").arg(format!("{}: {}", name, value))
            }
            Action::HeaderRemove { name } => ParametrizedValue::new("delheader").arg(name),
            Action::HeadersOff => ParametrizedValue::new("disableheaders").strip_separator(),
            Action::HeadersReset { status } => ParametrizedValue::new("clearheaders").arg(status),
            Action::Send { data, crnl } => {
                let name = if crnl { "send-crnl" } else { "send" };
                ParametrizedValue::new(name).arg(data)
            }
            Action::ServeStatic { path } => ParametrizedValue::new("static")
                .arg(path)
                .requires_plugin("router_static"),
            Action::SetHarakiri { timeout } => ParametrizedValue::new("harakiri").arg(timeout),
            Action::Signal { num } => ParametrizedValue::new("signal").arg(num),
            Action::AuthBasic { realm, user, password } => {
                let credentials = match password {
                    Some(password) => format!("{}:{}", user, password),
                    None => user,
                };
                ParametrizedValue::new("basicauth")
                    .joiner(",")
                    .args([realm, credentials])
                    .requires_plugin("router_basicauth")
            }
            Action::SetVarPathInfo { value } => ParametrizedValue::new("setpathinfo").arg(value),
            Action::FixVarPathInfo => ParametrizedValue::new("fixpathinfo").strip_separator(),
            Action::Gzip => ParametrizedValue::new("gzip")
                .strip_separator()
                .requires_plugin("transformation_gzip"),
            Action::Chunked => ParametrizedValue::new("chunked")
                .strip_separator()
                .requires_plugin("transformation_chunked"),
            Action::ToFile { path } => ParametrizedValue::new("tofile")
                .arg(format!("filename={}", path))
                .requires_plugin("transformation_tofile"),
        }
    }
}

/// An action with an optional subject check, bound to a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    action: Action,
    subject: Option<Subject>,
    stage: Stage,
}

impl RouteRule {
    /// Without a subject the action always runs.
    pub fn new(action: Action, subject: Option<Subject>, stage: Stage) -> Self {
        RouteRule {
            action,
            subject,
            stage,
        }
    }

    /// Request-stage rule run when `subject` matches.
    pub fn on(subject: impl Into<Subject>, action: Action) -> Self {
        Self::new(action, Some(subject.into()), Stage::Request)
    }

    /// Request-stage rule that always runs.
    pub fn run(action: Action) -> Self {
        Self::new(action, None, Stage::Request)
    }

    pub fn at_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    /// Directive name, e.g. `route`, `route-host`, `error-route-if-not`, `final-route-run`.
    pub fn command(&self) -> String {
        let subject = match &self.subject {
            Some(subject) => subject.parts().0,
            None => "run",
        };
        staged(self.stage, &format!("route-{}", subject))
    }

    /// Directive marking a label in this rule's chain.
    pub fn label_command(&self) -> String {
        staged(self.stage, "route-label")
    }

    fn value(self) -> Arg {
        let rule = self.subject.map(|subject| subject.parts().1).unwrap_or_default();
        Arg::from((rule, self.action.into_value()))
    }
}

fn staged(stage: Stage, command: &str) -> String {
    format!("{}-{}", stage.prefix(), command)
        .trim_matches('-')
        .to_string()
}

impl fmt::Display for RouteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.command(), self.clone().value().render())
    }
}

/// Dedicated routers (gateways) run by the master process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Router {
    Http {
        on: String,
        forward_to: Vec<String>,
    },
    Https {
        on: String,
        cert: String,
        key: String,
        forward_to: Vec<String>,
    },
    Ssl {
        on: String,
        cert: String,
        key: String,
        forward_to: Vec<String>,
    },
    Fast {
        on: String,
        forward_to: Vec<String>,
    },
    Raw {
        on: String,
        forward_to: Vec<String>,
    },
}

impl Router {
    /// Bind value filed under the router's own key, carrying its forward targets.
    fn into_value(self) -> ParametrizedValue {
        let (plugin, key, bind, forward_to) = match self {
            Router::Http { on, forward_to } => ("http", "http", vec![on], forward_to),
            Router::Https {
                on,
                cert,
                key,
                forward_to,
            } => ("http", "https", vec![on, cert, key], forward_to),
            Router::Ssl {
                on,
                cert,
                key,
                forward_to,
            } => ("sslrouter", "sslrouter", vec![on, cert, key], forward_to),
            Router::Fast { on, forward_to } => ("fastrouter", "fastrouter", vec![on], forward_to),
            Router::Raw { on, forward_to } => ("rawrouter", "rawrouter", vec![on], forward_to),
        };

        let value = ParametrizedValue::new(key)
            .key(key)
            .joiner(",")
            .args(bind)
            .requires_plugin(plugin);

        if forward_to.is_empty() {
            value
        } else {
            value.with_options(format!("{}-to", plugin), forward_to)
        }
    }
}

/// Internal routing subsystem.
#[derive(Debug, Clone, Default)]
pub struct Routing;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutingParams {
    /// Print supported routing rules on startup.
    pub print_rules: Option<bool>,
    pub geoip_country: Option<String>,
    pub geoip_city: Option<String>,
}

impl OptionsGroup for Routing {
    const ID: &'static str = "routing";
    type Params = RoutingParams;

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        scope.set(Mutation::new("routers-list", params.print_rules).flag());
        scope.set_geoip(params.geoip_country, params.geoip_city);
        scope.into_section()
    }
}

impl<'a> Scope<'a, Routing> {
    /// Register rules in order. A `label` marks the first rule's chain position.
    pub fn register_route(mut self, rules: Vec<RouteRule>, label: Option<&str>) -> &'a mut Section {
        if let (Some(first), Some(label)) = (rules.first(), label) {
            self.set(Mutation::new(first.label_command(), label).multi());
        }
        for rule in rules {
            let command = rule.command();
            self.set(Mutation::new(command, rule.value()).multi());
        }
        self.into_section()
    }

    pub fn print_routing_rules(mut self) -> &'a mut Section {
        self.set(Mutation::new("routers-list", true).flag());
        self.into_section()
    }

    /// Serve `path` for a managed 403, 404 or 500 response.
    pub fn set_error_page(mut self, status: u16, path: &str) -> Result<&'a mut Section> {
        self.set(error_page(status, path)?);
        Ok(self.into_section())
    }

    /// Error pages for several statuses at once.
    ///
    /// Without `pages` every managed status maps to `<status>.html`; `common_prefix`
    /// is joined in front of each path.
    pub fn set_error_pages(
        mut self,
        pages: Option<BTreeMap<u16, String>>,
        common_prefix: Option<&str>,
    ) -> Result<&'a mut Section> {
        let pages = pages.unwrap_or_else(|| {
            ERROR_PAGE_STATUSES
                .iter()
                .map(|status| (*status, format!("{}.html", status)))
                .collect()
        });

        for (status, path) in pages {
            let path = match common_prefix {
                Some(prefix) => Path::new(prefix).join(path).display().to_string(),
                None => path,
            };
            self.set(error_page(status, &path)?);
        }
        Ok(self.into_section())
    }

    pub fn set_geoip_params(mut self, db_country: Option<&str>, db_city: Option<&str>) -> &'a mut Section {
        self.set_geoip(db_country.map(str::to_string), db_city.map(str::to_string));
        self.into_section()
    }

    /// Add a header to every response.
    pub fn header_add(mut self, name: &str, value: &str) -> &'a mut Section {
        self.set(Mutation::new("add-header", format!("{}: {}", name, value)).multi());
        self.into_section()
    }

    /// Remove a header from every response.
    pub fn header_remove(mut self, name: &str) -> &'a mut Section {
        self.set(Mutation::new("del-header", name).multi());
        self.into_section()
    }

    /// Store response header `name` in request var `target_var`; `pull` also removes it.
    pub fn header_collect(mut self, name: &str, target_var: &str, pull: bool) -> &'a mut Section {
        let key = if pull { "pull-header" } else { "collect-header" };
        self.set(Mutation::new(key, format!("{} {}", name, target_var)).multi());
        self.into_section()
    }

    /// Run a dedicated router. `force` bypasses the master process requirement.
    pub fn use_router(mut self, router: Router, force: Option<bool>) -> &'a mut Section {
        self.set(Mutation::new("force-gateway", force).flag());
        self.set(Mutation::new("gateway", router.into_value()));
        self.into_section()
    }

    fn set_geoip(&mut self, db_country: Option<String>, db_city: Option<String>) {
        self.set(Mutation::new("geoip-country", db_country).plugin("geoip"));
        self.set(Mutation::new("geoip-city", db_city).plugin("geoip"));
    }
}

fn error_page(status: u16, path: &str) -> Result<Mutation> {
    if !ERROR_PAGE_STATUSES.contains(&status) {
        let supported: Vec<String> = ERROR_PAGE_STATUSES.iter().map(u16::to_string).collect();
        return Err(ConfigError::UnsupportedStatus {
            status,
            supported: supported.join(", "),
        });
    }
    Ok(Mutation::new(format!("error-page-{}", status), path).multi())
}
