//! Mules, farms and function offloading.
//!
//! Offloading sends a JSON envelope naming a registered function and its
//! arguments to a mule or farm; the receiving mule hands the raw message to its
//! own [`OffloadRegistry::handle_message`], which runs the function.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MessageOptions, Platform};
use crate::error::{ConfigError, Result};

/// Envelope marker telling offload messages apart from any other mule traffic.
const OFFLOAD_MARKER: &str = "uwcf";

/// Offloaded function: positional and keyword arguments in, result out.
pub type OffloadFn = Arc<dyn Fn(&[Value], &Map<String, Value>) -> Value + Send + Sync>;

/// Where a mule message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuleTarget {
    /// A mule by id; `0` is the first available mule.
    Mule(u32),
    Farm(String),
}

impl Default for MuleTarget {
    fn default() -> Self {
        MuleTarget::Mule(0)
    }
}

impl From<&Mule> for MuleTarget {
    fn from(mule: &Mule) -> Self {
        MuleTarget::Mule(mule.id)
    }
}

impl From<&Farm> for MuleTarget {
    fn from(farm: &Farm) -> Self {
        MuleTarget::Farm(farm.name.clone())
    }
}

impl fmt::Display for MuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuleTarget::Mule(id) => write!(f, "mule{}", id),
            MuleTarget::Farm(name) => write!(f, "farm {}", name),
        }
    }
}

/// A uWSGI mule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mule {
    id: u32,
}

impl Mule {
    pub fn new(id: u32) -> Self {
        Mule { id }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Id of the current mule, `0` when not running in a mule.
    pub fn current_id(platform: &dyn Platform) -> u32 {
        platform.mule_id()
    }

    pub fn current(platform: &dyn Platform) -> Option<Mule> {
        match platform.mule_id() {
            0 => None,
            id => Some(Mule::new(id)),
        }
    }

    /// Block until a message for the current mule arrives.
    ///
    /// Fails when not called from a mule.
    pub fn get_message(platform: &dyn Platform, options: &MessageOptions) -> Result<Option<String>> {
        let message = platform.mule_get_msg(options)?;
        Ok(message.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn send(&self, platform: &dyn Platform, message: &[u8]) -> Result<bool> {
        platform.mule_msg(message, &MuleTarget::from(self))
    }
}

/// A named group of mules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Farm {
    name: String,
}

impl Farm {
    pub fn new(name: impl Into<String>) -> Self {
        Farm { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the current mule belongs to this farm.
    pub fn is_mine(&self, platform: &dyn Platform) -> bool {
        platform.in_farm(&self.name)
    }

    pub fn get_message(platform: &dyn Platform) -> Result<Option<String>> {
        let message = platform.farm_get_msg()?;
        Ok(message.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn send(&self, platform: &dyn Platform, message: &[u8]) -> Result<()> {
        platform.farm_msg(&self.name, message)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    marker: String,
    func: String,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    kwargs: Map<String, Value>,
}

/// Handle to a registered function, bound to the mule or farm running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offload {
    func: String,
    target: MuleTarget,
}

impl Offload {
    pub fn func(&self) -> &str {
        &self.func
    }

    pub fn target(&self) -> &MuleTarget {
        &self.target
    }

    /// Ask the target to run the function. Returns whether the message was queued.
    pub fn send(
        &self,
        platform: &dyn Platform,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<bool> {
        let envelope = Envelope {
            marker: OFFLOAD_MARKER.to_string(),
            func: self.func.clone(),
            args,
            kwargs,
        };
        let message = serde_json::to_vec(&envelope)
            .map_err(|e| ConfigError::Platform(format!("cannot encode offload message: {}", e)))?;
        tracing::debug!(func = %self.func, target = %self.target, "offloading function");
        platform.mule_msg(&message, &self.target)
    }
}

/// Functions that may be run in mules, by name.
///
/// Both the sending process and the mule must register the same functions.
#[derive(Default, Clone)]
pub struct OffloadRegistry {
    functions: HashMap<String, OffloadFn>,
}

impl OffloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`, to be run by `target`.
    pub fn register(&mut self, name: &str, target: MuleTarget, func: OffloadFn) -> Offload {
        tracing::debug!(func = %name, target = %target, "registering offload function");
        self.functions.insert(name.to_string(), func);
        Offload {
            func: name.to_string(),
            target,
        }
    }

    /// Handle to an already registered function.
    pub fn get(&self, name: &str, target: MuleTarget) -> Result<Offload> {
        if !self.functions.contains_key(name) {
            return Err(ConfigError::UnknownOffload(name.to_string()));
        }
        Ok(Offload {
            func: name.to_string(),
            target,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Names of registered functions, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the function an offload message asks for.
    ///
    /// Returns `None` for messages that are not offload envelopes and for
    /// functions this registry does not know.
    pub fn handle_message(&self, message: &[u8]) -> Option<Value> {
        let envelope: Envelope = match serde_json::from_slice(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring undecodable mule message");
                return None;
            }
        };

        if envelope.marker != OFFLOAD_MARKER {
            return None;
        }

        match self.functions.get(&envelope.func) {
            Some(func) => Some(func(&envelope.args, &envelope.kwargs)),
            None => {
                tracing::warn!(func = %envelope.func, "no offload function registered");
                None
            }
        }
    }
}

impl fmt::Debug for OffloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffloadRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
