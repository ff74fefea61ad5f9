use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Request from any widget to switch the active dashboard tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateToTab {
    pub tab_id: String,
}

/// Process-wide broadcast for [`NavigateToTab`].
///
/// Emitters do not know who listens. Each subscriber receives every emission
/// once; subscribers that went away are pruned on the next emit.
#[derive(Clone, Default)]
pub struct NavigationBus {
    subscribers: Arc<Mutex<Vec<Sender<NavigateToTab>>>>,
}

impl NavigationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<NavigateToTab> {
        let (tx, rx) = channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    /// Broadcast a tab switch. Returns how many subscribers received it.
    pub fn emit(&self, tab_id: &str) -> usize {
        let signal = NavigateToTab {
            tab_id: tab_id.to_string(),
        };
        let mut subs = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subs.retain(|tx| tx.send(signal.clone()).is_ok());
        tracing::debug!(tab = %tab_id, listeners = subs.len(), "navigate signal emitted");
        subs.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|s| s.len())
            .unwrap_or_default()
    }
}
