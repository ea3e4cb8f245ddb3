use adstc_core::ads::NotificationHandle;
use adstc_core::protocol::{AddNotificationRequest, Notification as NotificationFrame};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;

/// One delivered sample of a watched variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The PLC-assigned handle the sample arrived under.
    pub handle: NotificationHandle,
    /// Server-side sample time, converted from the stamp's FILETIME.
    pub timestamp: DateTime<Utc>,
    /// Connection epoch the sample was received in. The counter advances on
    /// every successful (re)connect, so a jump tells the consumer that
    /// samples may have been lost in a gap.
    pub epoch: u64,
    /// The variable's bytes.
    pub data: Vec<u8>,
}

/// Registry-side record of one subscription.
///
/// The PLC handle changes across reconnects; the delivery queue and the
/// stored request are the subscription's stable identity.
pub(crate) struct SubEntry {
    /// Replayed verbatim after a reconnect.
    pub(crate) request: AddNotificationRequest,
    /// The symbol name this watches, for diagnostics.
    pub(crate) name: Option<String>,
    /// Taken on close so the consumer's `recv` ends.
    tx: Mutex<Option<mpsc::Sender<Notification>>>,
    pub(crate) handle: Mutex<Option<NotificationHandle>>,
    closed: AtomicBool,
}

impl SubEntry {
    pub(crate) fn new(
        request: AddNotificationRequest,
        name: Option<String>,
        queue_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let entry = Arc::new(Self {
            request,
            name,
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        (entry, rx)
    }

    pub(crate) fn current_handle(&self) -> Option<NotificationHandle> {
        *self.handle.lock().unwrap()
    }

    /// Marks the entry closed and ends its delivery queue. Returns `true`
    /// only on the first call, so close stays idempotent.
    pub(crate) fn mark_closed(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            *self.tx.lock().unwrap() = None;
        }
        first
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn sender(&self) -> Option<mpsc::Sender<Notification>> {
        self.tx.lock().unwrap().clone()
    }
}

/// Routes incoming notification frames to per-subscription queues.
pub(crate) struct SubscriptionRegistry {
    entries: RwLock<HashMap<NotificationHandle, Arc<SubEntry>>>,
    dropped: AtomicU64,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Registers `entry` under the handle the PLC just assigned.
    pub(crate) fn insert(&self, handle: NotificationHandle, entry: Arc<SubEntry>) {
        *entry.handle.lock().unwrap() = Some(handle);
        self.entries.write().unwrap().insert(handle, entry);
    }

    /// Detaches an entry by its current handle.
    pub(crate) fn remove(&self, handle: NotificationHandle) -> Option<Arc<SubEntry>> {
        let entry = self.entries.write().unwrap().remove(&handle);
        if let Some(entry) = &entry {
            *entry.handle.lock().unwrap() = None;
        }
        entry
    }

    /// The current handle-to-entry pairs.
    pub(crate) fn snapshot(&self) -> Vec<(NotificationHandle, Arc<SubEntry>)> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .map(|(handle, entry)| (*handle, entry.clone()))
            .collect()
    }

    /// Empties the registry, returning the live entries. Their handles are
    /// cleared; the PLC-side handles died with the old connection.
    pub(crate) fn take_all(&self) -> Vec<Arc<SubEntry>> {
        let drained: Vec<_> = self
            .entries
            .write()
            .unwrap()
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in &drained {
            *entry.handle.lock().unwrap() = None;
        }
        drained
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Samples dropped so far: queue overflows plus unknown handles.
    pub(crate) fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Fans a decoded notification frame out to its subscriptions.
    ///
    /// Samples keep PLC order within each stamp. A saturated queue drops
    /// the newest sample rather than blocking: stalling here would stall
    /// every other subscription and the response path with it. Samples for
    /// unknown handles are dropped and counted; they arrive legitimately in
    /// the window between a local close and the PLC's own teardown.
    pub(crate) fn dispatch(&self, frame: &NotificationFrame, epoch: u64) {
        for stamp in &frame.stamps {
            let timestamp = stamp.timestamp.to_datetime();
            for sample in &stamp.samples {
                let entry = {
                    let entries = self.entries.read().unwrap();
                    entries.get(&sample.handle).cloned()
                };

                let Some(entry) = entry else {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(handle = %sample.handle, "notification for unknown handle dropped");
                    continue;
                };

                let Some(tx) = entry.sender() else {
                    // Raced a local close; the PLC-side teardown is still
                    // in flight.
                    continue;
                };
                let event = Notification {
                    handle: sample.handle,
                    timestamp,
                    epoch,
                    data: sample.data.clone(),
                };
                if let Err(err) = tx.try_send(event) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    match err {
                        mpsc::error::TrySendError::Full(_) => {
                            tracing::warn!(
                                handle = %sample.handle,
                                name = entry.name.as_deref().unwrap_or(""),
                                "subscription queue full, newest notification dropped"
                            );
                        }
                        mpsc::error::TrySendError::Closed(_) => {}
                    }
                }
            }
        }
    }
}
