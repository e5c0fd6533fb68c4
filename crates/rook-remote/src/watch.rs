use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

use rook_types::StorePath;

use crate::traits::{ChangeCallback, SubscriptionHandle};
use crate::tree;

/// Values seen by each affected watcher before a mutation.
pub(crate) type Captured = Vec<(SubscriptionHandle, Option<Value>)>;

/// Internal subscriber: a watched path paired with its delivery queue.
struct Watcher {
    path: StorePath,
    sender: mpsc::UnboundedSender<Option<Value>>,
    active: Arc<AtomicBool>,
}

/// Fan-out router that delivers path changes to matching watchers.
///
/// Each watcher owns a delivery task on the tokio runtime. The task checks
/// the watcher's `active` flag before every callback, so once
/// [`remove`](Self::remove) returns no new callback starts.
pub(crate) struct WatcherSet {
    next_handle: u64,
    watchers: HashMap<SubscriptionHandle, Watcher>,
}

impl WatcherSet {
    pub(crate) fn new() -> Self {
        Self {
            next_handle: 1,
            watchers: HashMap::new(),
        }
    }

    /// Register a watcher and spawn its delivery task on `runtime`.
    pub(crate) fn add(
        &mut self,
        path: StorePath,
        callback: ChangeCallback,
        runtime: &Handle,
    ) -> SubscriptionHandle {
        let handle = SubscriptionHandle::from_raw(self.next_handle);
        self.next_handle += 1;

        let (sender, mut receiver) = mpsc::unbounded_channel::<Option<Value>>();
        let active = Arc::new(AtomicBool::new(true));
        let task_active = Arc::clone(&active);

        runtime.spawn(async move {
            while let Some(value) = receiver.recv().await {
                if !task_active.load(Ordering::Acquire) {
                    break;
                }
                callback(value).await;
            }
        });

        debug!(%handle, %path, "watcher added");
        self.watchers.insert(
            handle,
            Watcher {
                path,
                sender,
                active,
            },
        );
        handle
    }

    /// Detach a watcher. Returns `false` if the handle was unknown.
    pub(crate) fn remove(&mut self, handle: SubscriptionHandle) -> bool {
        match self.watchers.remove(&handle) {
            Some(watcher) => {
                watcher.active.store(false, Ordering::Release);
                debug!(%handle, path = %watcher.path, "watcher removed");
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.watchers.len()
    }

    /// Record the current value of every watcher whose path overlaps `changed`.
    pub(crate) fn capture(&self, root: &Value, changed: &StorePath) -> Captured {
        self.watchers
            .iter()
            .filter(|(_, w)| w.path.overlaps(changed))
            .map(|(handle, w)| (*handle, tree::get(root, &w.path).cloned()))
            .collect()
    }

    /// Queue a notification for every captured watcher whose value changed.
    /// Watchers whose delivery task is gone are pruned.
    pub(crate) fn notify(&mut self, root: &Value, captured: Captured) {
        let mut closed = Vec::new();
        for (handle, before) in captured {
            let Some(watcher) = self.watchers.get(&handle) else {
                continue;
            };
            let after = tree::get(root, &watcher.path).cloned();
            if after == before {
                continue;
            }
            if watcher.sender.send(after).is_err() {
                closed.push(handle);
            }
        }
        for handle in closed {
            self.remove(handle);
        }
    }
}
