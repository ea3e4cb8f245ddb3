use crate::error::ClientError;
use crate::notify::SubscriptionRegistry;
use adstc_core::ads::{CommandId, InvokeId};
use adstc_core::ams::{AmsAddr, AmsHeader};
use adstc_core::io::{AmsFrame, AmsStream, FrameReader, FrameWriter};
use adstc_core::protocol::Notification as NotificationFrame;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Why a connection stopped serving requests. Every waiter woken by the
/// fault gets an error reconstructed from this.
#[derive(Debug, Clone)]
pub(crate) enum Fault {
    /// The client was closed deliberately.
    Closed,
    /// The connection was replaced by a reconnect; callers may retry on
    /// the new one.
    Superseded,
    /// The socket failed.
    Network { kind: io::ErrorKind, message: String },
    /// The byte stream violated the framing contract; nothing after the
    /// violation can be trusted.
    Protocol { message: String },
}

impl Fault {
    fn from_io(err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::InvalidData {
            Self::Protocol {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn to_error(&self, op: &'static str) -> ClientError {
        match self {
            Self::Closed => ClientError::state(op, "client is closed"),
            Self::Superseded => ClientError::network(
                op,
                io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "connection superseded by reconnect",
                ),
            ),
            Self::Network { kind, message } => {
                ClientError::network(op, io::Error::new(*kind, message.clone()))
            }
            Self::Protocol { message } => ClientError::protocol(op, message),
        }
    }
}

/// The pending-request registry: one entry per in-flight invoke id.
///
/// Many tasks add entries; the reader task resolves them. All accesses are
/// constant-time by invoke id and the lock is never held across an await.
pub(crate) struct PendingMap {
    cap: usize,
    inner: Mutex<PendingInner>,
    unmatched: AtomicU64,
}

struct PendingInner {
    next_invoke: InvokeId,
    waiters: HashMap<InvokeId, oneshot::Sender<AmsFrame>>,
    fault: Option<Fault>,
}

impl PendingMap {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            inner: Mutex::new(PendingInner {
                next_invoke: 1,
                waiters: HashMap::new(),
                fault: None,
            }),
            unmatched: AtomicU64::new(0),
        }
    }

    /// Allocates an invoke id and parks a waiter under it.
    ///
    /// Ids increase monotonically and wrap; the in-flight cap keeps a
    /// wrapped id from ever colliding with a live entry, but the allocator
    /// skips over collisions anyway.
    fn register(
        &self,
        op: &'static str,
    ) -> Result<(InvokeId, oneshot::Receiver<AmsFrame>), ClientError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(fault) = &inner.fault {
            return Err(fault.to_error(op));
        }
        if inner.waiters.len() >= self.cap {
            return Err(ClientError::Backpressure { op, cap: self.cap });
        }

        loop {
            let id = inner.next_invoke;
            inner.next_invoke = inner.next_invoke.wrapping_add(1);
            if inner.waiters.contains_key(&id) {
                continue;
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.insert(id, tx);
            return Ok((id, rx));
        }
    }

    /// Removes a waiter after a timeout or cancellation. A response that
    /// arrives later is dropped as unmatched.
    fn remove(&self, id: InvokeId) {
        self.inner.lock().unwrap().waiters.remove(&id);
    }

    /// Hands a response frame to the waiter with the matching invoke id.
    fn resolve(&self, frame: AmsFrame) {
        let id = frame.header().invoke_id();
        let waiter = self.inner.lock().unwrap().waiters.remove(&id);
        match waiter {
            // A dead receiver means the request was cancelled between
            // resolution and delivery; that is the same as a late response.
            Some(tx) => {
                if tx.send(frame).is_err() {
                    self.unmatched.fetch_add(1, Ordering::Relaxed);
                }
            }
            None => {
                self.unmatched.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(invoke_id = id, "unmatched response dropped (late arrival?)");
            }
        }
    }

    /// Poisons the map and wakes every waiter with the fault.
    fn fail_all(&self, fault: Fault) {
        let mut inner = self.inner.lock().unwrap();
        if inner.fault.is_none() {
            inner.fault = Some(fault);
        }
        // Dropping the senders wakes all parked receivers.
        inner.waiters.clear();
    }

    fn fault_error(&self, op: &'static str) -> Option<ClientError> {
        self.inner
            .lock()
            .unwrap()
            .fault
            .as_ref()
            .map(|f| f.to_error(op))
    }

    fn in_flight(&self) -> usize {
        self.inner.lock().unwrap().waiters.len()
    }

    fn unmatched(&self) -> u64 {
        self.unmatched.load(Ordering::Relaxed)
    }
}

/// Invoked once when the reader task dies with the connection's fault.
pub(crate) type FaultHook = Box<dyn FnOnce(ClientError) + Send + 'static>;

/// One epoch of a connection: the socket halves, the pending-request
/// registry, and the reader task that feeds it.
///
/// The writer and reader flows share nothing but the pending map and the
/// subscription registry. Many requests are logically in flight at once;
/// the writer mutex only serializes them at the byte level.
pub(crate) struct Transport {
    target: AmsAddr,
    source: AmsAddr,
    writer: tokio::sync::Mutex<FrameWriter<OwnedWriteHalf>>,
    pending: Arc<PendingMap>,
    reader_task: JoinHandle<()>,
}

impl Transport {
    /// Splits `stream` and spawns the reader flow.
    pub(crate) fn open(
        stream: AmsStream,
        target: AmsAddr,
        source: AmsAddr,
        max_in_flight: usize,
        subs: Arc<SubscriptionRegistry>,
        epoch: u64,
        on_fault: FaultHook,
    ) -> Arc<Self> {
        let (reader, writer) = stream.into_split();
        let pending = Arc::new(PendingMap::new(max_in_flight));

        let reader_task = tokio::spawn(run_reader(reader, pending.clone(), subs, epoch, on_fault));

        Arc::new(Self {
            target,
            source,
            writer: tokio::sync::Mutex::new(writer),
            pending,
            reader_task,
        })
    }

    /// Sends one request and awaits its response within `timeout`.
    ///
    /// On expiry the pending entry is removed so the late response, should
    /// it still arrive, is dropped. A non-zero AMS-level error code in the
    /// response header surfaces as a device error; result codes inside the
    /// payload are the caller's to decode.
    pub(crate) async fn request(
        &self,
        op: &'static str,
        command: CommandId,
        data: Vec<u8>,
        timeout: Duration,
    ) -> Result<(AmsHeader, Vec<u8>), ClientError> {
        let (invoke_id, rx) = self.pending.register(op)?;
        let frame = AmsFrame::request(self.target, self.source, command, invoke_id, data);

        {
            let mut writer = self.writer.lock().await;
            if let Err(err) = writer.write_frame(&frame).await {
                self.pending.remove(invoke_id);
                return Err(ClientError::network(op, err));
            }
        }

        let frame = match tokio::time::timeout(timeout, rx).await {
            Err(_) => {
                self.pending.remove(invoke_id);
                return Err(ClientError::timeout(op, timeout));
            }
            Ok(Err(_)) => {
                // Sender dropped: the connection faulted while we waited.
                return Err(self
                    .pending
                    .fault_error(op)
                    .unwrap_or_else(|| ClientError::state(op, "connection lost")));
            }
            Ok(Ok(frame)) => frame,
        };

        let code = frame.header().error_code();
        if !code.is_ok() {
            return Err(ClientError::device(op, code));
        }

        let (header, data) = frame.into_parts();
        Ok((header, data))
    }

    /// Tears the connection down deliberately: stops the reader flow and
    /// wakes every waiter with `fault`.
    pub(crate) fn shutdown(&self, fault: Fault) {
        self.reader_task.abort();
        self.pending.fail_all(fault);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.pending.in_flight()
    }

    pub(crate) fn unmatched_responses(&self) -> u64 {
        self.pending.unmatched()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

/// The reader flow: pulls frames until the stream faults, dispatching
/// notifications to the subscription registry and everything else to the
/// pending map.
async fn run_reader(
    mut reader: FrameReader<OwnedReadHalf>,
    pending: Arc<PendingMap>,
    subs: Arc<SubscriptionRegistry>,
    epoch: u64,
    on_fault: FaultHook,
) {
    let fault = loop {
        match reader.read_frame().await {
            Ok(frame) => match frame.header().command_id() {
                CommandId::DeviceNotification => match NotificationFrame::decode(frame.data()) {
                    Ok(notification) => subs.dispatch(&notification, epoch),
                    Err(err) => {
                        break Fault::Protocol {
                            message: err.to_string(),
                        };
                    }
                },
                _ if frame.header().state_flags().is_response() => pending.resolve(frame),
                command => {
                    tracing::warn!(?command, "ignoring unexpected request frame from server");
                }
            },
            Err(err) => break Fault::from_io(&err),
        }
    };

    tracing::debug!(?fault, "reader flow ended");
    let err = fault.to_error("connection");
    pending.fail_all(fault);
    on_fault(err);
}
