//! Runtime façade over the embedded uWSGI API: mules, farms and signals.
//!
//! Nothing here talks to uWSGI directly. Every call goes through a [`Platform`],
//! implemented by whatever binds the running server process; the façade adds typed
//! targets, the offload message envelope and the handler registries on top.

pub mod mules;
pub mod signals;

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

pub use mules::{Farm, Mule, MuleTarget, Offload, OffloadFn, OffloadRegistry};
pub use signals::{
    get_available_num, get_last_received, Signal, SignalDescription, SignalRegistry, SignalTarget,
};

/// Signal handler; receives the signal number.
pub type SignalHandler = Arc<dyn Fn(u8) + Send + Sync>;

/// How to wait for a mule message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageOptions {
    /// Let registered signal handlers run while waiting.
    pub signals: bool,
    /// Also receive messages sent to farms the mule belongs to.
    pub farms: bool,
    pub buffer_size: usize,
    /// `None` blocks until a message arrives.
    pub timeout: Option<Duration>,
}

impl Default for MessageOptions {
    fn default() -> Self {
        MessageOptions {
            signals: true,
            farms: false,
            buffer_size: 65536,
            timeout: None,
        }
    }
}

/// The embedded server API.
///
/// Errors reported by the server are surfaced as `ConfigError::Platform`.
pub trait Platform {
    /// Current mule id, `0` outside of mules.
    fn mule_id(&self) -> u32;

    /// Send `message` to a mule or farm. Returns whether it was queued.
    fn mule_msg(&self, message: &[u8], target: &MuleTarget) -> Result<bool>;

    /// Block for the next mule message. `None` on timeout.
    fn mule_get_msg(&self, options: &MessageOptions) -> Result<Option<Vec<u8>>>;

    fn farm_msg(&self, farm: &str, message: &[u8]) -> Result<()>;

    /// Next message for a farm of the current mule, if any.
    fn farm_get_msg(&self) -> Result<Option<Vec<u8>>>;

    fn in_farm(&self, farm: &str) -> bool;

    fn signal_registered(&self, num: u8) -> bool;

    fn register_signal(&self, num: u8, target: &str, handler: SignalHandler) -> Result<()>;

    /// Raise `num` on the master, or on `remote` when given.
    fn signal(&self, num: u8, remote: Option<&str>) -> Result<()>;

    /// Block until `num` (or any signal with `None`) is received.
    fn signal_wait(&self, num: Option<u8>) -> Result<()>;

    fn signal_received(&self) -> u8;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use super::*;
    use crate::error::ConfigError;

    /// In-memory platform recording every call.
    #[derive(Default)]
    pub struct FakePlatform {
        pub mule_id: u32,
        pub farms: Vec<String>,
        pub sent: RefCell<Vec<(Vec<u8>, MuleTarget)>>,
        pub farm_sent: RefCell<Vec<(String, Vec<u8>)>>,
        pub inbox: RefCell<VecDeque<Vec<u8>>>,
        pub registered: RefCell<Vec<(u8, String, SignalHandler)>>,
        pub raised: RefCell<Vec<(u8, Option<String>)>>,
        pub last_received: Cell<u8>,
    }

    impl FakePlatform {
        pub fn with_registered(nums: impl IntoIterator<Item = u8>) -> Self {
            let platform = FakePlatform::default();
            for num in nums {
                let handler: SignalHandler = Arc::new(|_: u8| {});
                platform
                    .registered
                    .borrow_mut()
                    .push((num, "worker".to_string(), handler));
            }
            platform
        }
    }

    impl Platform for FakePlatform {
        fn mule_id(&self) -> u32 {
            self.mule_id
        }

        fn mule_msg(&self, message: &[u8], target: &MuleTarget) -> Result<bool> {
            self.sent.borrow_mut().push((message.to_vec(), target.clone()));
            Ok(true)
        }

        fn mule_get_msg(&self, _options: &MessageOptions) -> Result<Option<Vec<u8>>> {
            if self.mule_id == 0 {
                return Err(ConfigError::Platform("not a mule".to_string()));
            }
            Ok(self.inbox.borrow_mut().pop_front())
        }

        fn farm_msg(&self, farm: &str, message: &[u8]) -> Result<()> {
            self.farm_sent
                .borrow_mut()
                .push((farm.to_string(), message.to_vec()));
            Ok(())
        }

        fn farm_get_msg(&self) -> Result<Option<Vec<u8>>> {
            Ok(self.inbox.borrow_mut().pop_front())
        }

        fn in_farm(&self, farm: &str) -> bool {
            self.farms.iter().any(|f| f == farm)
        }

        fn signal_registered(&self, num: u8) -> bool {
            self.registered.borrow().iter().any(|(n, _, _)| *n == num)
        }

        fn register_signal(&self, num: u8, target: &str, handler: SignalHandler) -> Result<()> {
            self.registered
                .borrow_mut()
                .push((num, target.to_string(), handler));
            Ok(())
        }

        fn signal(&self, num: u8, remote: Option<&str>) -> Result<()> {
            self.raised
                .borrow_mut()
                .push((num, remote.map(str::to_string)));
            self.last_received.set(num);
            Ok(())
        }

        fn signal_wait(&self, _num: Option<u8>) -> Result<()> {
            Ok(())
        }

        fn signal_received(&self) -> u8 {
            self.last_received.get()
        }
    }
}
