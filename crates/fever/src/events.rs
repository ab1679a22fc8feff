//! File lifecycle observers.

use crate::file::File;
use parking_lot::RwLock;
use std::sync::Arc;

pub type Listener = Arc<dyn Fn(&Arc<File>) + Send + Sync>;

/// A change to one file's fragment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Push(String),
    Unshift(String),
    /// The removed fragment, `None` when the list was already empty.
    Pop(Option<String>),
    Shift(Option<String>),
}

/// Observer of a single file's edits. Runs before the recompute the edit
/// triggers.
pub type EditListener = Arc<dyn Fn(&File, &Edit) + Send + Sync>;

#[derive(Default)]
pub struct Listeners {
    add: RwLock<Vec<Listener>>,
    remove: RwLock<Vec<Listener>>,
}

impl Listeners {
    pub fn on_add(&self, listener: Listener) {
        self.add.write().push(listener);
    }

    pub fn on_remove(&self, listener: Listener) {
        self.remove.write().push(listener);
    }

    // Handlers run outside the lock so they may register more handlers.
    pub(crate) fn emit_add(&self, file: &Arc<File>) {
        let handlers = self.add.read().clone();
        for handler in handlers {
            handler(file);
        }
    }

    pub(crate) fn emit_remove(&self, file: &Arc<File>) {
        let handlers = self.remove.read().clone();
        for handler in handlers {
            handler(file);
        }
    }
}
