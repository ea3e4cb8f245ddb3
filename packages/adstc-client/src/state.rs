use tokio::sync::watch;

/// Lifecycle of one client.
///
/// Legal transitions: `Connecting -> Connected`, `Connecting -> Error`,
/// `Connected -> Disconnecting -> Closed`, and - only under auto-reconnect -
/// `Connected -> Error -> Connecting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnecting,
    Closed,
    /// The connection is tainted; the cause is carried as text.
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

type StateCallback = Box<dyn Fn(&ConnectionState) + Send + Sync>;

/// Publishes state changes to watchers and registered callbacks.
pub(crate) struct StateTracker {
    tx: watch::Sender<ConnectionState>,
    callbacks: std::sync::Mutex<Vec<StateCallback>>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            tx,
            callbacks: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn get(&self) -> ConnectionState {
        self.tx.borrow().clone()
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        if *self.tx.borrow() == state {
            return;
        }
        tracing::debug!(?state, "connection state changed");
        self.tx.send_replace(state.clone());

        let callbacks = self.callbacks.lock().unwrap();
        for callback in callbacks.iter() {
            callback(&state);
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    pub(crate) fn register(&self, callback: StateCallback) {
        self.callbacks.lock().unwrap().push(callback);
    }
}
