use crate::error::ClientError;
use crate::notify::{Notification, SubEntry, SubscriptionRegistry};
use crate::options::ClientOptions;
use crate::resolve::{Locator, parse_name};
use crate::state::{ConnectionState, StateTracker};
use crate::symbols::{self, Symbol, SymbolTable};
use crate::transport::{Fault, FaultHook, Transport};
use crate::types::{
    RawTypeEntry, TypeDescriptor, TypeKind, TypeRegistry, parse_array_type, parse_type_entry,
    string_size_from_name,
};
use crate::value::{PlcValue, decode_value, encode_value};
use adstc_core::ads::{AdsState, CommandId, DeviceState, NotificationHandle, ReturnCode, TransMode};
use adstc_core::ams::AmsAddr;
use adstc_core::io::AmsStream;
use adstc_core::protocol::{
    AddNotificationRequest, AddNotificationResponse, DeleteNotificationRequest,
    DeleteNotificationResponse, DeviceInfoRequest, DeviceInfoResponse, ReadRequest, ReadResponse,
    ReadStateRequest, ReadStateResponse, ReadWriteRequest, ReadWriteResponse, WriteControlRequest,
    WriteControlResponse, WriteRequest, WriteResponse, index_groups,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Name and version of the remote ADS device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub major: u8,
    pub minor: u8,
    pub build: u16,
    pub name: String,
}

/// Parameters of a device notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub trans_mode: TransMode,
    /// How often the server samples the variable.
    pub cycle_time: Duration,
    /// Longest time the server may buffer a sample before pushing it.
    pub max_delay: Duration,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            trans_mode: TransMode::ServerOnChange,
            cycle_time: Duration::from_millis(100),
            max_delay: Duration::ZERO,
        }
    }
}

/// A connected ADS client.
///
/// Cheap to clone; all clones share one multiplexed TCP connection,
/// symbol/type caches, and subscription registry. Every operation is safe
/// to call from any number of tasks concurrently.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

pub(crate) struct ClientInner {
    /// Back-reference for flows that must outlive a borrow (reconnect
    /// loop, fault hooks).
    self_weak: Weak<ClientInner>,
    opts: ClientOptions,
    target: AmsAddr,
    source: AmsAddr,
    transport: tokio::sync::RwLock<Option<Arc<Transport>>>,
    state: StateTracker,
    /// Advances on every successful (re)connect; tags notifications.
    epoch: AtomicU64,
    closed: AtomicBool,
    /// Single-flight guard: at most one reconnect loop runs at a time.
    reconnecting: AtomicBool,
    symbols: SymbolTable,
    types: TypeRegistry,
    subs: Arc<SubscriptionRegistry>,
    health_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Dials the target, verifies it actually answers ADS traffic, and
    /// returns a ready client.
    ///
    /// The verification is a ReadState probe: a PLC in Config mode accepts
    /// the TCP connection but answers `TargetPortNotFound` to everything,
    /// and that must fail construction rather than every later request.
    pub async fn connect(opts: ClientOptions) -> Result<Self, ClientError> {
        opts.validate()?;

        let target = AmsAddr::new(opts.target_net_id, opts.target_port);
        let source = AmsAddr::new(opts.source_net_id, opts.source_port);

        let inner = Arc::new_cyclic(|weak| ClientInner {
            self_weak: weak.clone(),
            opts,
            target,
            source,
            transport: tokio::sync::RwLock::new(None),
            state: StateTracker::new(),
            epoch: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
            symbols: SymbolTable::new(),
            types: TypeRegistry::new(),
            subs: Arc::new(SubscriptionRegistry::new()),
            health_task: std::sync::Mutex::new(None),
        });

        if let Err(err) = inner.establish().await {
            inner.state.set(ConnectionState::Error(err.to_string()));
            return Err(err);
        }
        inner.state.set(ConnectionState::Connected);
        inner.spawn_health_check();

        Ok(Self { inner })
    }

    /// Reads the device's name and version.
    pub async fn device_info(&self) -> Result<DeviceInfo, ClientError> {
        let op = "device info";
        let data = self
            .inner
            .request(op, CommandId::ReadDeviceInfo, DeviceInfoRequest.encode())
            .await?;
        let resp =
            DeviceInfoResponse::decode(&data).map_err(|e| ClientError::protocol(op, e))?;
        if !resp.result.is_ok() {
            return Err(ClientError::device(op, resp.result));
        }
        Ok(DeviceInfo {
            major: resp.major,
            minor: resp.minor,
            build: resp.build,
            name: resp.name,
        })
    }

    /// Reads `length` bytes at an explicit locator.
    pub async fn read(
        &self,
        index_group: u32,
        index_offset: u32,
        length: u32,
    ) -> Result<Vec<u8>, ClientError> {
        let op = "read";
        let request = ReadRequest {
            index_group,
            index_offset,
            length,
        };
        let data = self.inner.request(op, CommandId::Read, request.encode()).await?;
        let resp = ReadResponse::decode(&data).map_err(|e| ClientError::protocol(op, e))?;
        if !resp.result.is_ok() {
            return Err(ClientError::device(op, resp.result));
        }
        Ok(resp.data)
    }

    /// Writes bytes at an explicit locator.
    pub async fn write(
        &self,
        index_group: u32,
        index_offset: u32,
        data: Vec<u8>,
    ) -> Result<(), ClientError> {
        let op = "write";
        let request = WriteRequest {
            index_group,
            index_offset,
            data,
        };
        let payload = self.inner.request(op, CommandId::Write, request.encode()).await?;
        let resp = WriteResponse::decode(&payload).map_err(|e| ClientError::protocol(op, e))?;
        resp.result
            .into_result(())
            .map_err(|code| ClientError::device(op, code))
    }

    /// Reads the device's operating state.
    pub async fn read_state(&self) -> Result<(AdsState, DeviceState), ClientError> {
        let op = "read state";
        let data = self
            .inner
            .request(op, CommandId::ReadState, ReadStateRequest.encode())
            .await?;
        let resp = ReadStateResponse::decode(&data).map_err(|e| ClientError::protocol(op, e))?;
        if !resp.result.is_ok() {
            return Err(ClientError::device(op, resp.result));
        }
        Ok((resp.ads_state, resp.device_state))
    }

    /// Requests a state change on the device (e.g. Run -> Stop).
    pub async fn write_control(
        &self,
        ads_state: AdsState,
        device_state: DeviceState,
        data: Vec<u8>,
    ) -> Result<(), ClientError> {
        let op = "write control";
        let request = WriteControlRequest {
            ads_state,
            device_state,
            data,
        };
        let payload = self
            .inner
            .request(op, CommandId::WriteControl, request.encode())
            .await?;
        let resp =
            WriteControlResponse::decode(&payload).map_err(|e| ClientError::protocol(op, e))?;
        resp.result
            .into_result(())
            .map_err(|code| ClientError::device(op, code))
    }

    /// Writes `data` and reads `read_length` bytes back in one round trip.
    pub async fn read_write(
        &self,
        index_group: u32,
        index_offset: u32,
        read_length: u32,
        data: Vec<u8>,
    ) -> Result<Vec<u8>, ClientError> {
        let op = "read write";
        let request = ReadWriteRequest {
            index_group,
            index_offset,
            read_length,
            data,
        };
        let payload = self.inner.request(op, CommandId::ReadWrite, request.encode()).await?;
        let resp = ReadWriteResponse::decode(&payload).map_err(|e| ClientError::protocol(op, e))?;
        if !resp.result.is_ok() {
            return Err(ClientError::device(op, resp.result));
        }
        Ok(resp.data)
    }

    /// Re-downloads the symbol table, discarding the cached one and the
    /// type cache with it. Returns the new symbol count.
    pub async fn refresh_symbols(&self) -> Result<usize, ClientError> {
        self.inner.load_symbols().await?;
        self.inner.types.clear();
        Ok(self.inner.symbols.len())
    }

    /// Case-insensitive substring search over symbol names.
    pub async fn find_symbols(&self, needle: &str) -> Result<Vec<Arc<Symbol>>, ClientError> {
        self.inner.ensure_symbols().await?;
        Ok(self.inner.symbols.find(needle))
    }

    /// Looks a symbol up by its full name.
    pub async fn symbol(&self, name: &str) -> Result<Arc<Symbol>, ClientError> {
        self.inner.ensure_symbols().await?;
        self.inner
            .symbols
            .lookup(name)
            .ok_or_else(|| ClientError::SymbolNotFound {
                name: name.to_string(),
            })
    }

    /// Fetches (and caches) the descriptor of a named data type.
    pub async fn resolve_type(&self, name: &str) -> Result<Arc<TypeDescriptor>, ClientError> {
        let mut visited = Vec::new();
        self.inner.resolve_type_inner(name, &mut visited).await
    }

    /// Resolves a variable path like `MAIN.sensors[2].temperature` to the
    /// byte region a Read or Write should address.
    pub async fn resolve(&self, name: &str) -> Result<Locator, ClientError> {
        self.inner.resolve_with_type(name).await.map(|(loc, _)| loc)
    }

    /// Reads a variable by name.
    pub async fn read_by_name(&self, name: &str) -> Result<Vec<u8>, ClientError> {
        let locator = self.resolve(name).await?;
        self.read(locator.index_group, locator.index_offset, locator.size)
            .await
    }

    /// Writes a variable by name. The data must match the resolved size.
    pub async fn write_by_name(&self, name: &str, data: Vec<u8>) -> Result<(), ClientError> {
        let locator = self.resolve(name).await?;
        if data.len() != locator.size as usize {
            return Err(ClientError::validation(
                "write data",
                format!(
                    "{name} is {} bytes but {} were given",
                    locator.size,
                    data.len()
                ),
            ));
        }
        self.write(locator.index_group, locator.index_offset, data)
            .await
    }

    /// Reads a variable by name and decodes it via its type descriptor.
    pub async fn read_value(&self, name: &str) -> Result<PlcValue, ClientError> {
        let (locator, ty) = self.inner.resolve_with_type(name).await?;
        let bytes = self
            .read(locator.index_group, locator.index_offset, locator.size)
            .await?;
        decode_value(&ty, &bytes)
    }

    /// Encodes a typed value and writes it to a variable by name.
    pub async fn write_value(&self, name: &str, value: &PlcValue) -> Result<(), ClientError> {
        let (locator, ty) = self.inner.resolve_with_type(name).await?;
        let bytes = encode_value(&ty, value)?;
        self.write(locator.index_group, locator.index_offset, bytes)
            .await
    }

    /// Subscribes to a variable by name.
    pub async fn subscribe(
        &self,
        name: &str,
        options: SubscriptionOptions,
    ) -> Result<Subscription, ClientError> {
        let locator = self.resolve(name).await?;
        self.inner
            .subscribe_inner(locator, Some(name.to_string()), options)
            .await
    }

    /// Subscribes to an explicit byte region.
    pub async fn subscribe_raw(
        &self,
        locator: Locator,
        options: SubscriptionOptions,
    ) -> Result<Subscription, ClientError> {
        self.inner.subscribe_inner(locator, None, options).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    /// A watch channel that yields every state change.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Registers a callback invoked on every state change.
    pub fn on_state_change(&self, callback: impl Fn(&ConnectionState) + Send + Sync + 'static) {
        self.inner.state.register(Box::new(callback));
    }

    /// Notification samples dropped so far (queue overflow or unknown
    /// handle).
    pub fn dropped_notifications(&self) -> u64 {
        self.inner.subs.dropped_samples()
    }

    /// Shuts the client down: wakes every waiter with a closed error,
    /// tears down subscriptions (best-effort DelNotification), and stops
    /// the reconnect and health-check flows. Idempotent.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.state.set(ConnectionState::Disconnecting);

        if let Some(task) = self.inner.health_task.lock().unwrap().take() {
            task.abort();
        }

        let transport = self.inner.transport.read().await.clone();
        for (handle, entry) in self.inner.subs.snapshot() {
            entry.mark_closed();
            if let Some(transport) = &transport {
                let request = DeleteNotificationRequest { handle };
                let _ = transport
                    .request(
                        "unsubscribe",
                        CommandId::DeleteDeviceNotification,
                        request.encode(),
                        self.inner.opts.request_timeout,
                    )
                    .await;
            }
        }
        let _ = self.inner.subs.take_all();

        let old = self.inner.transport.write().await.take();
        if let Some(old) = old {
            old.shutdown(Fault::Closed);
        }
        self.inner.state.set(ConnectionState::Closed);
    }
}

impl ClientInner {
    /// Dials, probes, and installs a fresh transport. Used for the first
    /// connection and every reconnect attempt.
    async fn establish(&self) -> Result<(), ClientError> {
        let op = "connect";
        let stream = tokio::time::timeout(
            self.opts.connect_timeout,
            AmsStream::connect(&self.opts.target_addr),
        )
        .await
        .map_err(|_| ClientError::timeout(op, self.opts.connect_timeout))?
        .map_err(|err| ClientError::network(op, err))?;

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let hook: FaultHook = {
            let weak = self.self_weak.clone();
            Box::new(move |err| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_fault(epoch, err);
                }
            })
        };
        let transport = Transport::open(
            stream,
            self.target,
            self.source,
            self.opts.max_in_flight,
            self.subs.clone(),
            epoch,
            hook,
        );

        let probe = transport
            .request(
                "connect probe",
                CommandId::ReadState,
                ReadStateRequest.encode(),
                self.opts.connect_timeout,
            )
            .await
            .and_then(|(_, data)| {
                let resp = ReadStateResponse::decode(&data)
                    .map_err(|e| ClientError::protocol("connect probe", e))?;
                resp.result
                    .into_result(())
                    .map_err(|code| ClientError::device("connect probe", code))
            });
        if let Err(err) = probe {
            transport.shutdown(Fault::Superseded);
            return Err(err);
        }

        let old = self.transport.write().await.replace(transport);
        if let Some(old) = old {
            old.shutdown(Fault::Superseded);
        }
        Ok(())
    }

    /// Reader-task fault hook: taints the connection and, when enabled,
    /// kicks off the reconnect loop. Stale faults from an already-replaced
    /// transport are ignored via the epoch check.
    fn on_fault(self: Arc<Self>, epoch: u64, err: ClientError) {
        tokio::spawn(async move {
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            tracing::warn!(error = %err, "connection fault");
            self.state.set(ConnectionState::Error(err.to_string()));
            self.drop_transport().await;
            self.maybe_reconnect();
        });
    }

    async fn drop_transport(&self) {
        let old = self.transport.write().await.take();
        if let Some(old) = old {
            old.shutdown(Fault::Superseded);
        }
    }

    /// Starts the reconnect loop unless one is already running.
    fn maybe_reconnect(&self) {
        if !self.opts.reconnect || self.closed.load(Ordering::SeqCst) {
            return;
        }
        let Some(inner) = self.self_weak.upgrade() else {
            return;
        };
        if self
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        tokio::spawn(async move {
            inner.reconnect_loop().await;
            inner.reconnecting.store(false, Ordering::SeqCst);
        });
    }

    /// Re-dials with doubling backoff until success or close, then replays
    /// every live subscription against the new connection. Handles change;
    /// delivery queues survive, so consumers keep their channel. Samples
    /// the PLC pushed during the gap are gone.
    async fn reconnect_loop(&self) {
        let mut backoff = Duration::from_secs(1);
        let mut attempt = 0u32;
        let stranded = self.subs.take_all();

        loop {
            if self.closed.load(Ordering::SeqCst) {
                // Nobody will replay these; end their delivery queues.
                for entry in &stranded {
                    entry.mark_closed();
                }
                return;
            }
            attempt += 1;
            self.state.set(ConnectionState::Connecting);

            match self.establish().await {
                Ok(()) => match self.restore_subscriptions(&stranded).await {
                    Ok(restored) => {
                        tracing::info!(attempt, restored, "reconnected");
                        self.state.set(ConnectionState::Connected);
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "resubscription failed, retrying");
                        self.drop_transport().await;
                        self.state.set(ConnectionState::Error(err.to_string()));
                    }
                },
                Err(err) => {
                    tracing::debug!(error = %err, attempt, "reconnect attempt failed");
                    self.state.set(ConnectionState::Error(err.to_string()));
                }
            }

            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.opts.max_backoff);
        }
    }

    /// Replays stored AddNotification requests, re-keying each live entry
    /// under the handle the PLC assigns this time.
    async fn restore_subscriptions(&self, entries: &[Arc<SubEntry>]) -> Result<usize, ClientError> {
        let op = "resubscribe";
        // Drop registrations left by an earlier failed attempt; their
        // handles died with that connection.
        for entry in entries {
            if let Some(stale) = entry.current_handle() {
                self.subs.remove(stale);
            }
        }

        let transport = self.current_transport(op).await?;
        let mut restored = 0;
        for entry in entries {
            if entry.is_closed() {
                continue;
            }
            let (_, data) = transport
                .request(
                    op,
                    CommandId::AddDeviceNotification,
                    entry.request.encode(),
                    self.opts.request_timeout,
                )
                .await?;
            let resp =
                AddNotificationResponse::decode(&data).map_err(|e| ClientError::protocol(op, e))?;
            if !resp.result.is_ok() {
                return Err(ClientError::device(op, resp.result));
            }
            self.subs.insert(resp.handle, entry.clone());
            restored += 1;
        }
        Ok(restored)
    }

    fn spawn_health_check(&self) {
        let Some(period) = self.opts.health_check else {
            return;
        };
        let weak = self.self_weak.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await; // completes immediately

            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else { return };
                if inner.closed.load(Ordering::SeqCst) {
                    return;
                }
                let Ok(transport) = inner.current_transport("health check").await else {
                    // Not connected; the reconnect loop owns recovery.
                    continue;
                };

                let healthy = match transport
                    .request(
                        "health check",
                        CommandId::ReadState,
                        ReadStateRequest.encode(),
                        inner.opts.request_timeout,
                    )
                    .await
                {
                    Ok((_, data)) => ReadStateResponse::decode(&data)
                        .map(|resp| resp.result.is_ok())
                        .unwrap_or(false),
                    Err(_) => false,
                };

                if !healthy {
                    tracing::warn!("health check failed, discarding connection");
                    inner
                        .state
                        .set(ConnectionState::Error("health check failed".to_string()));
                    inner.drop_transport().await;
                    inner.maybe_reconnect();
                }
            }
        });
        *self.health_task.lock().unwrap() = Some(task);
    }

    async fn current_transport(&self, op: &'static str) -> Result<Arc<Transport>, ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::state(op, "client is closed"));
        }
        self.transport
            .read()
            .await
            .clone()
            .ok_or_else(|| ClientError::state(op, "not connected"))
    }

    async fn request(
        &self,
        op: &'static str,
        command: CommandId,
        data: Vec<u8>,
    ) -> Result<Vec<u8>, ClientError> {
        self.request_with_timeout(op, command, data, self.opts.request_timeout)
            .await
    }

    /// The retrying request path. Under auto-reconnect, transient failures
    /// are retried up to three times with linear backoff before the error
    /// surfaces and the reconnect loop takes over. Non-transient errors and
    /// device results are never retried.
    async fn request_with_timeout(
        &self,
        op: &'static str,
        command: CommandId,
        data: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, ClientError> {
        const MAX_RETRIES: u32 = 3;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let transport = self.current_transport(op).await?;
            match transport.request(op, command, data.clone(), timeout).await {
                Ok((_, payload)) => return Ok(payload),
                Err(err) if self.opts.reconnect && err.is_transient() => {
                    if attempt <= MAX_RETRIES {
                        tracing::debug!(error = %err, attempt, "transient failure, retrying");
                        tokio::time::sleep(Duration::from_millis(100) * attempt).await;
                        continue;
                    }
                    self.maybe_reconnect();
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn ensure_symbols(&self) -> Result<(), ClientError> {
        if self.symbols.is_loaded() {
            return Ok(());
        }
        self.load_symbols().await
    }

    /// Downloads and replaces the symbol table: an info query for the blob
    /// size, then one large Read under the extended upload timeout.
    async fn load_symbols(&self) -> Result<(), ClientError> {
        let op = "symbol upload";

        let info_request = ReadRequest {
            index_group: index_groups::SYM_UPLOAD_INFO,
            index_offset: 0,
            length: 24,
        };
        let payload = self.request(op, CommandId::Read, info_request.encode()).await?;
        let resp = ReadResponse::decode(&payload).map_err(|e| ClientError::protocol(op, e))?;
        if !resp.result.is_ok() {
            return Err(ClientError::device(op, resp.result));
        }
        let (_count, blob_size) = symbols::parse_upload_info(&resp.data)?;

        let blob_request = ReadRequest {
            index_group: index_groups::SYM_UPLOAD,
            index_offset: 0,
            length: blob_size,
        };
        let payload = self
            .request_with_timeout(
                op,
                CommandId::Read,
                blob_request.encode(),
                self.opts.upload_timeout,
            )
            .await?;
        let resp = ReadResponse::decode(&payload).map_err(|e| ClientError::protocol(op, e))?;
        if !resp.result.is_ok() {
            return Err(ClientError::device(op, resp.result));
        }

        let parsed = symbols::parse_symbol_table(&resp.data)?;
        tracing::debug!(symbols = parsed.len(), "symbol table loaded");
        self.symbols.replace(parsed);
        Ok(())
    }

    /// Fetches one data-type record by name.
    async fn fetch_type_entry(&self, name: &str) -> Result<RawTypeEntry, ClientError> {
        let op = "type upload";
        let mut write_data = name.as_bytes().to_vec();
        write_data.push(0);

        let request = ReadWriteRequest {
            index_group: index_groups::DT_UPLOAD,
            index_offset: 0,
            read_length: 0x10000,
            data: write_data,
        };
        let payload = self
            .request_with_timeout(
                op,
                CommandId::ReadWrite,
                request.encode(),
                self.opts.upload_timeout,
            )
            .await?;
        let resp = ReadWriteResponse::decode(&payload).map_err(|e| ClientError::protocol(op, e))?;
        if !resp.result.is_ok() {
            return Err(ClientError::device(op, resp.result));
        }
        parse_type_entry(&resp.data)
    }

    /// Resolves a type name to a cached descriptor, fetching and
    /// materializing on a miss. `visited` breaks reference cycles, which a
    /// healthy PLC never reports but a confused one might.
    fn resolve_type_inner<'a>(
        &'a self,
        name: &'a str,
        visited: &'a mut Vec<String>,
    ) -> BoxFuture<'a, Result<Arc<TypeDescriptor>, ClientError>> {
        Box::pin(async move {
            if let Some(hit) = self.types.get(name) {
                return Ok(hit);
            }

            let key = name.trim().to_uppercase();
            if visited.contains(&key) {
                return Err(ClientError::protocol(
                    "type resolution",
                    format!("cyclic type reference through {name:?}"),
                ));
            }
            visited.push(key);
            let built = self.build_type(name, visited).await;
            visited.pop();

            let descriptor = built?;
            self.types.insert(descriptor.clone());
            Ok(descriptor)
        })
    }

    async fn build_type(
        &self,
        name: &str,
        visited: &mut Vec<String>,
    ) -> Result<Arc<TypeDescriptor>, ClientError> {
        // Arrays are recognized textually; the element resolves by name.
        if let Some((dims, element_name)) = parse_array_type(name) {
            let element = self.resolve_type_inner(element_name, visited).await?;
            let count: u64 = dims.iter().map(|d| d.length as u64).product();
            let size = count * element.size as u64;
            let size = u32::try_from(size).map_err(|_| {
                ClientError::protocol("type resolution", format!("array {name:?} overflows u32"))
            })?;
            return Ok(Arc::new(TypeDescriptor {
                name: name.trim().to_string(),
                kind: TypeKind::Array,
                size,
                dims,
                element: Some(element),
                fields: Vec::new(),
            }));
        }

        // Primitives never need a device round trip.
        if let Some(kind) = TypeKind::from_type_name(name) {
            let size = kind
                .fixed_size()
                .or_else(|| string_size_from_name(name))
                .ok_or_else(|| {
                    ClientError::protocol(
                        "type resolution",
                        format!("no size for primitive {name:?}"),
                    )
                })?;
            return Ok(Arc::new(TypeDescriptor::primitive(name.trim(), kind, size)));
        }

        let entry = self.fetch_type_entry(name).await?;
        self.type_from_entry(&entry, name, visited).await
    }

    /// Materializes a descriptor from a fetched record. Sub-items carrying
    /// their own structure build inline; leaf fields resolve through the
    /// registry by type name.
    fn type_from_entry<'a>(
        &'a self,
        entry: &'a RawTypeEntry,
        type_name: &'a str,
        visited: &'a mut Vec<String>,
    ) -> BoxFuture<'a, Result<Arc<TypeDescriptor>, ClientError>> {
        Box::pin(async move {
            if !entry.dims.is_empty() {
                let element = self.resolve_type_inner(&entry.type_name, visited).await?;
                return Ok(Arc::new(TypeDescriptor {
                    name: type_name.trim().to_string(),
                    kind: TypeKind::Array,
                    size: entry.size,
                    dims: entry.dims.clone(),
                    element: Some(element),
                    fields: Vec::new(),
                }));
            }

            if !entry.sub_items.is_empty() {
                let mut fields = Vec::with_capacity(entry.sub_items.len());
                for sub in &entry.sub_items {
                    let ty = if !sub.sub_items.is_empty() || !sub.dims.is_empty() {
                        self.type_from_entry(sub, &sub.type_name, visited).await?
                    } else if let Some(kind) = TypeKind::from_type_name(&sub.type_name)
                        .or_else(|| TypeKind::from_code(sub.data_type))
                    {
                        Arc::new(TypeDescriptor::primitive(
                            sub.type_name.trim(),
                            kind,
                            sub.size,
                        ))
                    } else {
                        self.resolve_type_inner(&sub.type_name, visited).await?
                    };
                    fields.push(crate::types::Field {
                        name: sub.name.clone(),
                        offset: sub.offset,
                        ty,
                    });
                }

                let descriptor = TypeDescriptor {
                    name: type_name.trim().to_string(),
                    kind: TypeKind::Struct,
                    size: entry.size,
                    dims: Vec::new(),
                    element: None,
                    fields,
                };
                descriptor.check_field_bounds()?;
                return Ok(Arc::new(descriptor));
            }

            let kind = TypeKind::from_type_name(&entry.type_name)
                .or_else(|| TypeKind::from_code(entry.data_type))
                .unwrap_or(TypeKind::Opaque);
            Ok(Arc::new(TypeDescriptor::primitive(
                type_name.trim(),
                kind,
                entry.size,
            )))
        })
    }

    /// The resolver walk of a parsed variable path.
    async fn resolve_with_type(
        &self,
        name: &str,
    ) -> Result<(Locator, Arc<TypeDescriptor>), ClientError> {
        let parsed = parse_name(name)?;
        self.ensure_symbols().await?;

        // The longest dotted prefix that names a symbol wins; whatever is
        // left of the base becomes leading field steps.
        let (symbol, leading_fields) = self.lookup_symbol_prefix(parsed.base)?;

        let mut visited = Vec::new();
        let mut ty = if symbol.type_name.is_empty() {
            Arc::new(TypeDescriptor::primitive("", TypeKind::Opaque, symbol.size))
        } else {
            self.resolve_type_inner(&symbol.type_name, &mut visited)
                .await?
        };

        let index_group = symbol.index_group;
        let mut offset = symbol.index_offset as u64;
        let mut size = symbol.size;

        for field_name in leading_fields {
            (offset, size, ty) = self.step_field(ty, offset, field_name)?;
        }
        if let Some(index) = parsed.index {
            (offset, size, ty) = self.step_index(name, ty, offset, index)?;
        }
        for field_name in &parsed.fields {
            (offset, size, ty) = self.step_field(ty, offset, field_name)?;
        }

        let offset = u32::try_from(offset).map_err(|_| {
            ClientError::protocol("resolve", format!("offset of {name:?} overflows u32"))
        })?;

        Ok((
            Locator {
                index_group,
                index_offset: offset,
                size,
            },
            ty,
        ))
    }

    fn step_field(
        &self,
        ty: Arc<TypeDescriptor>,
        offset: u64,
        field_name: &str,
    ) -> Result<(u64, u32, Arc<TypeDescriptor>), ClientError> {
        let field = ty.field(field_name).ok_or_else(|| ClientError::FieldNotFound {
            type_name: ty.name.clone(),
            field: field_name.to_string(),
        })?;
        let next = field.ty.clone();
        Ok((offset + field.offset as u64, next.size, next))
    }

    fn step_index(
        &self,
        name: &str,
        ty: Arc<TypeDescriptor>,
        offset: u64,
        index: u32,
    ) -> Result<(u64, u32, Arc<TypeDescriptor>), ClientError> {
        if ty.kind != TypeKind::Array {
            return Err(ClientError::validation(
                "variable name",
                format!("{name:?} indexes {}, which is not an array", ty.name),
            ));
        }
        if ty.dims.len() > 1 {
            return Err(ClientError::unsupported(format!(
                "{name:?} indexes a multi-dimensional array, which is not supported"
            )));
        }
        let dim = ty.dims.first().copied().ok_or_else(|| {
            ClientError::protocol("resolve", format!("array {} has no dimensions", ty.name))
        })?;
        if index >= dim.length {
            return Err(ClientError::IndexOutOfRange {
                name: name.to_string(),
                index,
                len: dim.length,
            });
        }
        let element = ty.element.clone().ok_or_else(|| {
            ClientError::protocol("resolve", format!("array {} has no element type", ty.name))
        })?;
        Ok((
            offset + index as u64 * element.size as u64,
            element.size,
            element,
        ))
    }

    fn lookup_symbol_prefix<'n>(
        &self,
        base: &'n str,
    ) -> Result<(Arc<Symbol>, Vec<&'n str>), ClientError> {
        let mut prefix = base;
        let mut fields = Vec::new();
        loop {
            if let Some(symbol) = self.symbols.lookup(prefix) {
                return Ok((symbol, fields));
            }
            match prefix.rfind('.') {
                Some(dot) => {
                    fields.insert(0, &prefix[dot + 1..]);
                    prefix = &prefix[..dot];
                }
                None => {
                    return Err(ClientError::SymbolNotFound {
                        name: base.to_string(),
                    });
                }
            }
        }
    }

    async fn subscribe_inner(
        self: &Arc<Self>,
        locator: Locator,
        name: Option<String>,
        options: SubscriptionOptions,
    ) -> Result<Subscription, ClientError> {
        let op = "subscribe";
        let request = AddNotificationRequest {
            index_group: locator.index_group,
            index_offset: locator.index_offset,
            length: locator.size,
            trans_mode: options.trans_mode,
            max_delay_ms: options.max_delay.as_millis() as u32,
            cycle_time_ms: options.cycle_time.as_millis() as u32,
        };

        let payload = self
            .request(op, CommandId::AddDeviceNotification, request.encode())
            .await?;
        let resp =
            AddNotificationResponse::decode(&payload).map_err(|e| ClientError::protocol(op, e))?;
        if !resp.result.is_ok() {
            return Err(ClientError::device(op, resp.result));
        }

        let (entry, rx) = SubEntry::new(request, name, self.opts.queue_capacity);
        self.subs.insert(resp.handle, entry.clone());
        tracing::debug!(handle = %resp.handle, "subscription active");

        Ok(Subscription {
            inner: self.clone(),
            entry,
            rx,
        })
    }
}

/// A live device notification stream.
///
/// Receive with [`recv`](Self::recv); end it with [`close`](Self::close)
/// or by dropping. The subscription survives reconnects: the client
/// replays the original request and samples keep flowing into the same
/// queue under a fresh PLC handle (with a higher
/// [`epoch`](Notification::epoch)).
pub struct Subscription {
    inner: Arc<ClientInner>,
    entry: Arc<SubEntry>,
    rx: mpsc::Receiver<Notification>,
}

impl Subscription {
    /// The PLC-assigned handle, while one is held.
    pub fn handle(&self) -> Option<NotificationHandle> {
        self.entry.current_handle()
    }

    /// The variable name this watches, when subscribed by name.
    pub fn name(&self) -> Option<&str> {
        self.entry.name.as_deref()
    }

    /// Awaits the next sample. `None` once the subscription is closed and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Ends the subscription. Only the first call sends the
    /// DelNotification; repeated closes are no-ops. A PLC that already
    /// forgot the handle is treated as success.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        if !self.entry.mark_closed() {
            return Ok(());
        }
        let Some(handle) = self.entry.current_handle() else {
            // Connection loss already invalidated the handle; the PLC-side
            // registration died with it.
            return Ok(());
        };
        self.inner.subs.remove(handle);

        let op = "unsubscribe";
        let transport = match self.inner.current_transport(op).await {
            Ok(transport) => transport,
            Err(_) => return Ok(()),
        };
        let request = DeleteNotificationRequest { handle };
        let (_, payload) = transport
            .request(
                op,
                CommandId::DeleteDeviceNotification,
                request.encode(),
                self.inner.opts.request_timeout,
            )
            .await?;
        let resp = DeleteNotificationResponse::decode(&payload)
            .map_err(|e| ClientError::protocol(op, e))?;
        match resp.result {
            code if code.is_ok() => Ok(()),
            ReturnCode::InvalidNotificationHandle => Ok(()),
            code => Err(ClientError::device(op, code)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.entry.mark_closed() {
            return;
        }
        let Some(handle) = self.entry.current_handle() else {
            return;
        };
        self.inner.subs.remove(handle);

        // Best-effort teardown; without a runtime the PLC-side handle
        // lingers until the connection dies.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let inner = self.inner.clone();
            runtime.spawn(async move {
                if let Ok(transport) = inner.current_transport("unsubscribe").await {
                    let request = DeleteNotificationRequest { handle };
                    let _ = transport
                        .request(
                            "unsubscribe",
                            CommandId::DeleteDeviceNotification,
                            request.encode(),
                            inner.opts.request_timeout,
                        )
                        .await;
                }
            });
        }
    }
}
