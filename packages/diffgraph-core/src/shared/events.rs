//! Change notifications
//!
//! All graph mutation runs on the control thread; listeners are plain
//! boxed closures invoked there. Multi-graph operations suppress
//! notifications for their duration and fire one batch at the end, so a
//! listener only ever observes the final consistent state.

use crate::shared::models::{Address, AddressPair, ViewKind};

/// One observable change to the graphs
#[derive(Debug, Clone, PartialEq)]
pub enum GraphChange {
    GraphRebuilt,
    MatchAdded {
        pair: AddressPair,
    },
    MatchRemoved {
        primary: Address,
        secondary: Address,
    },
    VisibilityChanged {
        view: ViewKind,
        shown: usize,
        hidden: usize,
    },
    SelectionChanged {
        view: ViewKind,
        selected: usize,
        deselected: usize,
    },
    GeometryChanged {
        view: ViewKind,
    },
}

/// Handle for unsubscribing a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(usize);

type Listener = Box<dyn Fn(&[GraphChange])>;

/// Listener registry with nested suppression
///
/// While suppressed, emitted changes are queued; when the outermost
/// suppression scope ends the queue is fired as a single batch.
#[derive(Default)]
pub struct EventHub {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: usize,
    depth: usize,
    pending: Vec<GraphChange>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl Fn(&[GraphChange]) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Emit one change; queued while suppressed, fired immediately otherwise
    pub fn emit(&mut self, change: GraphChange) {
        if self.depth > 0 {
            self.pending.push(change);
        } else {
            self.fire(&[change]);
        }
    }

    /// Enter a suppression scope
    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Leave a suppression scope; fires the pending batch at depth zero
    pub fn end(&mut self) {
        debug_assert!(self.depth > 0, "unbalanced suppression scope");
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 && !self.pending.is_empty() {
            let batch = std::mem::take(&mut self.pending);
            self.fire(&batch);
        }
    }

    /// Leave a suppression scope after a failed operation
    ///
    /// Restores the suppression state but discards queued changes; the
    /// failed operation aborted, so its intermediate changes are not
    /// observable.
    pub fn abort(&mut self) {
        debug_assert!(self.depth > 0, "unbalanced suppression scope");
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.pending.clear();
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.depth > 0
    }

    fn fire(&self, batch: &[GraphChange]) {
        for (_, listener) in &self.listeners {
            listener(batch);
        }
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners.len())
            .field("depth", &self.depth)
            .field("pending", &self.pending.len())
            .finish()
    }
}
