//! Dependency index & notifier (C8): the reverse map from instance path to
//! dependent nodes, the path-keyed (and global) subscriber registry, and
//! the monotone version counter.

use crate::node::NodeKey;
use indexmap::IndexSet;
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::fmt;
use trellis_pointer::PointerBuf;

new_key_type! {
    struct CallbackKey;
}

/// The kind of change a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    /// The instance value at `path` was written.
    Value,
    /// The node at `path`'s effective schema or declared type changed.
    Schema,
    /// The node at `path`'s validation output changed.
    Error,
}

/// A single change notification.
#[derive(Debug, Clone)]
pub struct Event {
    /// What kind of change occurred.
    pub kind: EventKind,
    /// Where it occurred.
    pub path: PointerBuf,
    /// The runtime's version counter immediately after this event.
    pub version: u64,
}

/// A subscriber callback. Returns `Err` on failure; the error is logged
/// and swallowed; it never aborts delivery to other subscribers (§7).
pub type Callback = Box<dyn FnMut(&Event) -> Result<(), Box<dyn std::error::Error>>>;

/// An unsubscribe handle returned by `subscribe`/`subscribe_all`.
#[derive(Debug, Clone, Copy)]
pub struct Subscription {
    key: CallbackKey,
    path: Option<PointerBuf>,
}

impl fmt::Debug for CallbackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackKey({:?})", slotmap::Key::data(self))
    }
}

/// The reverse dependency index and subscriber registry.
#[derive(Default)]
pub struct Index {
    dependents: HashMap<PointerBuf, IndexSet<NodeKey>>,
    watchers: HashMap<PointerBuf, Vec<CallbackKey>>,
    global_watchers: Vec<CallbackKey>,
    callbacks: SlotMap<CallbackKey, Callback>,
    version: u64,
}

impl Index {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The monotone version counter; strictly increases on every event.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn register_dependency(&mut self, path: PointerBuf, node: NodeKey) {
        self.dependents.entry(path).or_default().insert(node);
    }

    pub(crate) fn unregister_dependency(&mut self, path: &PointerBuf, node: NodeKey) {
        if let Some(set) = self.dependents.get_mut(path) {
            set.shift_remove(&node);
            if set.is_empty() {
                self.dependents.remove(path);
            }
        }
    }

    /// Nodes whose effective schema depends on `path`'s value.
    pub(crate) fn dependents_of(&self, path: &PointerBuf) -> Vec<NodeKey> {
        self.dependents
            .get(path)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Registers a path-keyed subscriber.
    pub fn subscribe(&mut self, path: PointerBuf, callback: Callback) -> Subscription {
        let key = self.callbacks.insert(callback);
        self.watchers.entry(path.clone()).or_default().push(key);
        Subscription {
            key,
            path: Some(path),
        }
    }

    /// Registers a subscriber that fires for every event, regardless of
    /// path.
    pub fn subscribe_all(&mut self, callback: Callback) -> Subscription {
        let key = self.callbacks.insert(callback);
        self.global_watchers.push(key);
        Subscription { key, path: None }
    }

    /// Removes a subscriber. Its path entry is dropped once its last
    /// subscriber is gone, bounding the map size (§5).
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.callbacks.remove(subscription.key);
        match subscription.path {
            Some(path) => {
                if let Some(list) = self.watchers.get_mut(&path) {
                    list.retain(|key| *key != subscription.key);
                    if list.is_empty() {
                        self.watchers.remove(&path);
                    }
                }
            }
            None => self.global_watchers.retain(|key| *key != subscription.key),
        }
    }

    /// Fires `event`: increments the version, then invokes every
    /// path-specific subscriber in registration order, then every global
    /// subscriber.
    pub(crate) fn notify(&mut self, kind: EventKind, path: PointerBuf) {
        self.version += 1;
        let event = Event {
            kind,
            path,
            version: self.version,
        };
        tracing::debug!(version = event.version, path = %event.path, kind = %event.kind, "notify");
        let path_callbacks = self.watchers.get(&event.path).cloned().unwrap_or_default();
        for key in path_callbacks {
            self.invoke(key, &event);
        }
        let global_callbacks = self.global_watchers.clone();
        for key in global_callbacks {
            self.invoke(key, &event);
        }
    }

    fn invoke(&mut self, key: CallbackKey, event: &Event) {
        let Some(callback) = self.callbacks.get_mut(key) else {
            return;
        };
        if let Err(error) = callback(event) {
            tracing::warn!(path = %event.path, %error, "subscriber callback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn notify_hits_path_subscriber_then_global() {
        let mut index = Index::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o1 = order.clone();
        index.subscribe(
            PointerBuf::parse("/a").unwrap(),
            Box::new(move |_| {
                o1.borrow_mut().push("path");
                Ok(())
            }),
        );
        let o2 = order.clone();
        index.subscribe_all(Box::new(move |_| {
            o2.borrow_mut().push("global");
            Ok(())
        }));

        index.notify(EventKind::Value, PointerBuf::parse("/a").unwrap());
        assert_eq!(*order.borrow(), vec!["path", "global"]);
        assert_eq!(index.version(), 1);
    }

    #[test]
    fn notify_locality_sibling_paths_do_not_fire() {
        let mut index = Index::new();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        index.subscribe(
            PointerBuf::parse("/nested/value").unwrap(),
            Box::new(move |_| {
                *c.borrow_mut() += 1;
                Ok(())
            }),
        );
        index.notify(EventKind::Value, PointerBuf::parse("/other").unwrap());
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn unsubscribe_removes_empty_path_entry() {
        let mut index = Index::new();
        let sub = index.subscribe(PointerBuf::parse("/a").unwrap(), Box::new(|_| Ok(())));
        index.unsubscribe(sub);
        assert!(index.watchers.is_empty());
    }

    #[test]
    fn failing_subscriber_does_not_block_siblings() {
        let mut index = Index::new();
        let hit = Rc::new(RefCell::new(false));
        index.subscribe(
            PointerBuf::parse("/a").unwrap(),
            Box::new(|_| Err("boom".into())),
        );
        let h = hit.clone();
        index.subscribe(
            PointerBuf::parse("/a").unwrap(),
            Box::new(move |_| {
                *h.borrow_mut() = true;
                Ok(())
            }),
        );
        index.notify(EventKind::Value, PointerBuf::parse("/a").unwrap());
        assert!(*hit.borrow());
    }
}
