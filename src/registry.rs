//! # Name Registry
//!
//! Maps names to pids so actors can be found without passing pids around. The map is the
//! only process-wide mutable state in the runtime and sits behind a single lock.
//!
//! Entries are not removed when an actor stops; [`Registry::whereis`] drops a dead entry the
//! next time it is looked up, and `register` accepts a name whose holder has terminated.

use crate::pid::Pid;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Registry {
    names: Mutex<BTreeMap<String, Pid>>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            names: parking_lot::const_mutex(BTreeMap::new()),
        }
    }

    /// Returns `false` if the name is held by a live actor.
    pub fn register(&self, name: impl Into<String>, pid: &Pid) -> bool {
        let name = name.into();
        let mut names = self.names.lock();
        if names.get(&name).is_some_and(Pid::is_alive) {
            return false;
        }
        debug!(%name, %pid, "Registered");
        names.insert(name, pid.clone());
        true
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.names.lock().remove(name).is_some()
    }

    pub fn whereis(&self, name: &str) -> Option<Pid> {
        let mut names = self.names.lock();
        let pid = names.get(name)?.clone();
        if pid.is_alive() {
            return Some(pid);
        }
        debug!(name, "Pruned registration of terminated actor");
        names.remove(name);
        None
    }

    /// Registered names in sorted order.
    pub fn registered(&self) -> Vec<String> {
        self.names.lock().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.names.lock().clear();
    }
}

static GLOBAL: Registry = Registry::new();

pub fn register(name: impl Into<String>, pid: &Pid) -> bool {
    GLOBAL.register(name, pid)
}

pub fn unregister(name: &str) -> bool {
    GLOBAL.unregister(name)
}

pub fn whereis(name: &str) -> Option<Pid> {
    GLOBAL.whereis(name)
}

pub fn registered() -> Vec<String> {
    GLOBAL.registered()
}

/// Empties the process-wide registry. Intended for test isolation.
pub fn clear() {
    GLOBAL.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::Mailbox;

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        let mailbox = Mailbox::new();
        assert!(registry.register("alpha", mailbox.pid()));
        assert_eq!(registry.whereis("alpha").as_ref(), Some(mailbox.pid()));
        assert!(registry.whereis("beta").is_none());
    }

    #[test]
    fn test_taken_name_is_refused() {
        let registry = Registry::new();
        let first = Mailbox::new();
        let second = Mailbox::new();
        assert!(registry.register("name", first.pid()));
        assert!(!registry.register("name", second.pid()));
        assert!(registry.unregister("name"));
        assert!(!registry.unregister("name"));
        assert!(registry.register("name", second.pid()));
    }

    #[test]
    fn test_dead_entries_are_pruned() {
        let registry = Registry::new();
        let pid = {
            let mailbox = Mailbox::new();
            assert!(registry.register("gone", mailbox.pid()));
            mailbox.pid().clone()
        };
        assert!(!pid.is_alive());
        assert!(registry.whereis("gone").is_none());
        assert!(registry.registered().is_empty());

        let fresh = Mailbox::new();
        assert!(registry.register("gone", fresh.pid()));
    }

    #[test]
    fn test_registered_is_sorted_and_clear_empties() {
        let registry = Registry::new();
        let mailbox = Mailbox::new();
        registry.register("b", mailbox.pid());
        registry.register("a", mailbox.pid());
        assert_eq!(registry.registered(), vec!["a".to_string(), "b".to_string()]);
        registry.clear();
        assert!(registry.registered().is_empty());
    }
}
