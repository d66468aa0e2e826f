//! uWSGI signals: numbers 0-255 with handlers registered against delivery targets.

use std::fmt;

use super::{Platform, SignalHandler};
use crate::error::{ConfigError, Result};

/// Where a raised signal is delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SignalTarget {
    /// First available worker.
    #[default]
    Worker,
    Workers,
    WorkerN(u32),
    /// All non-cheaped workers.
    ActiveWorkers,
    /// First available mule.
    Mule,
    Mules,
    MuleN(u32),
    /// First available spooler.
    Spooler,
    FarmN(u32),
    FarmNamed(String),
}

impl fmt::Display for SignalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalTarget::Worker => f.write_str("worker"),
            SignalTarget::Workers => f.write_str("workers"),
            SignalTarget::WorkerN(n) => write!(f, "worker{}", n),
            SignalTarget::ActiveWorkers => f.write_str("active-workers"),
            SignalTarget::Mule => f.write_str("mule"),
            SignalTarget::Mules => f.write_str("mules"),
            SignalTarget::MuleN(n) => write!(f, "mule{}", n),
            SignalTarget::Spooler => f.write_str("spooler"),
            SignalTarget::FarmN(n) => write!(f, "farm{}", n),
            SignalTarget::FarmNamed(name) => write!(f, "farm_{}", name),
        }
    }
}

/// A registered signal.
#[derive(Clone)]
pub struct SignalDescription {
    pub num: u8,
    pub target: SignalTarget,
    pub handler: SignalHandler,
}

impl fmt::Debug for SignalDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalDescription")
            .field("num", &self.num)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Signals registered by this process, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    signals: Vec<SignalDescription>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, num: u8) -> Option<&SignalDescription> {
        self.signals.iter().find(|signal| signal.num == num)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalDescription> {
        self.signals.iter()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// First signal number without a registered handler.
pub fn get_available_num(platform: &dyn Platform) -> Result<u8> {
    (0..=u8::MAX)
        .find(|num| !platform.signal_registered(*num))
        .ok_or(ConfigError::NoSignalsAvailable)
}

/// The last signal received by this process.
pub fn get_last_received(platform: &dyn Platform) -> Signal {
    Signal::new(platform.signal_received())
}

/// A uWSGI signal number.
///
/// Handlers only run in the process that registered them; register in the master
/// so every worker sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    num: u8,
}

impl Signal {
    pub fn new(num: u8) -> Self {
        Signal { num }
    }

    /// Signal with the first available number.
    pub fn available(platform: &dyn Platform) -> Result<Self> {
        get_available_num(platform).map(Signal::new)
    }

    pub fn num(&self) -> u8 {
        self.num
    }

    pub fn registered(&self, platform: &dyn Platform) -> bool {
        platform.signal_registered(self.num)
    }

    /// Register `handler` for this signal, delivered to `target` (first worker by default).
    pub fn register_handler(
        &self,
        platform: &dyn Platform,
        registry: &mut SignalRegistry,
        target: Option<SignalTarget>,
        handler: SignalHandler,
    ) -> Result<()> {
        let target = target.unwrap_or_default();
        tracing::debug!(signal = self.num, target = %target, "registering signal handler");

        platform.register_signal(self.num, &target.to_string(), handler.clone())?;
        registry.signals.push(SignalDescription {
            num: self.num,
            target,
            handler,
        });
        Ok(())
    }

    /// Raise the signal on the master, or on a `remote` address.
    pub fn send(&self, platform: &dyn Platform, remote: Option<&str>) -> Result<()> {
        platform.signal(self.num, remote)
    }

    /// Block until this signal is received.
    pub fn wait(&self, platform: &dyn Platform) -> Result<()> {
        platform.signal_wait(Some(self.num))
    }
}

impl From<Signal> for u8 {
    fn from(signal: Signal) -> Self {
        signal.num
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU8, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::runtime::fake::FakePlatform;

    #[test]
    fn test_available_num_skips_registered() {
        let platform = FakePlatform::with_registered([0, 1, 3]);
        assert_eq!(get_available_num(&platform).unwrap(), 2);
        assert_eq!(Signal::available(&platform).unwrap().num(), 2);
    }

    #[test]
    fn test_no_signals_available() {
        let platform = FakePlatform::with_registered(0..=u8::MAX);
        let result = get_available_num(&platform);
        assert!(matches!(result, Err(ConfigError::NoSignalsAvailable)));
    }

    #[test]
    fn test_register_handler_records_target() {
        let platform = FakePlatform::default();
        let mut registry = SignalRegistry::new();
        let hits = Arc::new(AtomicU8::new(0));
        let counter = hits.clone();

        let signal = Signal::new(5);
        assert!(!signal.registered(&platform));

        signal
            .register_handler(
                &platform,
                &mut registry,
                Some(SignalTarget::FarmNamed("jobs".into())),
                Arc::new(move |num: u8| {
                    counter.fetch_add(num, Ordering::SeqCst);
                }),
            )
            .unwrap();
        Signal::new(6)
            .register_handler(&platform, &mut registry, None, Arc::new(|_: u8| {}))
            .unwrap();

        assert!(signal.registered(&platform));
        assert_eq!(platform.registered.borrow()[0].1, "farm_jobs");
        assert_eq!(platform.registered.borrow()[1].1, "worker");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(6).unwrap().target, SignalTarget::Worker);

        (registry.get(5).unwrap().handler)(5);
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_send_and_last_received() {
        let platform = FakePlatform::default();
        Signal::new(17).send(&platform, Some("10.0.0.1:1717")).unwrap();
        assert_eq!(
            platform.raised.borrow()[0],
            (17, Some("10.0.0.1:1717".to_string()))
        );
        assert_eq!(get_last_received(&platform), Signal::new(17));
        assert_eq!(u8::from(get_last_received(&platform)), 17);
        assert!(Signal::new(17).wait(&platform).is_ok());
    }

    #[test]
    fn test_target_names() {
        let names: Vec<String> = [
            SignalTarget::Workers,
            SignalTarget::WorkerN(2),
            SignalTarget::ActiveWorkers,
            SignalTarget::Mule,
            SignalTarget::MuleN(1),
            SignalTarget::Spooler,
            SignalTarget::FarmN(3),
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            names,
            ["workers", "worker2", "active-workers", "mule", "mule1", "spooler", "farm3"]
        );
    }
}
