//! The renderer-facing side of a form: opaque control handles, active-state
//! subscriptions and the file chooser seam.

use std::path::PathBuf;

use crate::kind::PathMode;

/// Opaque reference to a visible field's control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlHandle(pub(crate) usize);

/// Sent when a field's enabled state flips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveStateChange {
    pub target: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(&ActiveStateChange)>;

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        before != self.callbacks.len()
    }

    pub(crate) fn notify(&self, change: &ActiveStateChange) {
        for (_, callback) in &self.callbacks {
            callback(change);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscriptions", &self.callbacks.len())
            .finish()
    }
}

/// A file or directory dialog. Returns `None` when the user cancels.
pub trait PathChooser {
    fn choose(&self, mode: PathMode, current: &str) -> Option<PathBuf>;
}
