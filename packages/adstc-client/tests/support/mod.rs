//! An in-process PLC good enough to drive the client end-to-end: it
//! serves device info, reads and writes against per-index-group memory
//! areas, symbol and type uploads, and notification registration, and it
//! can push notification frames or drop the connection on command.

#![allow(dead_code)]

use adstc_core::ads::{AdsState, CommandId, FileTime, NotificationHandle, ReturnCode};
use adstc_core::ams::AmsNetId;
use adstc_core::io::{AmsFrame, AmsStream};
use adstc_core::protocol::{
    AddNotificationRequest, AddNotificationResponse, DeleteNotificationRequest,
    DeleteNotificationResponse, DeviceInfoResponse, Notification, ReadRequest, ReadResponse,
    ReadStateResponse, ReadWriteRequest, ReadWriteResponse, Sample, Stamp, WriteControlRequest,
    WriteControlResponse, WriteRequest, WriteResponse, index_groups,
};
use adstc_client::ClientOptions;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A symbol the mock PLC advertises in its upload.
#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub name: String,
    pub index_group: u32,
    pub index_offset: u32,
    pub size: u32,
    pub data_type: u32,
    pub type_name: String,
    pub comment: String,
}

impl SymbolDef {
    pub fn new(name: &str, index_group: u32, index_offset: u32, size: u32, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            index_group,
            index_offset,
            size,
            data_type: 0,
            type_name: type_name.to_string(),
            comment: String::new(),
        }
    }
}

/// A data type the mock PLC serves from its type upload.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub type_name: String,
    pub size: u32,
    pub offset: u32,
    pub data_type: u32,
    pub dims: Vec<(i32, u32)>,
    pub sub_items: Vec<TypeDef>,
}

impl TypeDef {
    pub fn structure(name: &str, size: u32, sub_items: Vec<TypeDef>) -> Self {
        Self {
            name: name.to_string(),
            type_name: name.to_string(),
            size,
            offset: 0,
            data_type: 65,
            dims: Vec::new(),
            sub_items,
        }
    }

    pub fn field(name: &str, type_name: &str, size: u32, offset: u32) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            size,
            offset,
            data_type: 0,
            dims: Vec::new(),
            sub_items: Vec::new(),
        }
    }
}

enum Control {
    Push(AmsFrame),
    Kick,
}

struct PlcState {
    device_name: String,
    version: (u8, u8, u16),
    ads_state: AdsState,
    /// Every command answers this in its payload result when set; models a
    /// PLC in Config mode.
    refuse_all: bool,
    memory: HashMap<u32, Vec<u8>>,
    symbols: Vec<SymbolDef>,
    types: Vec<TypeDef>,
    next_handle: u32,
    subscriptions: Vec<u32>,
    connections_served: usize,
    conn: Option<mpsc::UnboundedSender<Control>>,
}

/// The running mock server.
pub struct MockPlc {
    addr: SocketAddr,
    state: Arc<Mutex<PlcState>>,
}

impl MockPlc {
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    pub fn builder() -> MockPlcBuilder {
        MockPlcBuilder::default()
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Client options pointed at this mock, with fast timeouts.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::new(self.addr(), AmsNetId::new(127, 0, 0, 1, 1, 1))
            .with_request_timeout(std::time::Duration::from_secs(2))
            .with_connect_timeout(std::time::Duration::from_secs(2))
    }

    /// Pre-loads a memory area so reads have something to find.
    pub fn set_memory(&self, index_group: u32, bytes: Vec<u8>) {
        self.state.lock().unwrap().memory.insert(index_group, bytes);
    }

    pub fn memory(&self, index_group: u32) -> Vec<u8> {
        self.state
            .lock()
            .unwrap()
            .memory
            .get(&index_group)
            .cloned()
            .unwrap_or_default()
    }

    /// The handle the next AddNotification will be granted.
    pub fn set_next_handle(&self, handle: u32) {
        self.state.lock().unwrap().next_handle = handle;
    }

    pub fn subscription_handles(&self) -> Vec<u32> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn connections_served(&self) -> usize {
        self.state.lock().unwrap().connections_served
    }

    /// Makes every subsequent command answer `TargetPortNotFound`,
    /// mimicking a PLC in Config mode.
    pub fn refuse_all(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_all = refuse;
    }

    /// Pushes one notification frame with a single stamp and sample.
    pub fn push_notification(&self, handle: u32, filetime: FileTime, data: Vec<u8>) {
        let notification = Notification {
            stamps: vec![Stamp {
                timestamp: filetime,
                samples: vec![Sample {
                    handle: NotificationHandle::new(handle),
                    data,
                }],
            }],
        };
        self.push_frame(notification);
    }

    /// Pushes a fully custom notification frame.
    pub fn push_frame(&self, notification: Notification) {
        let state = self.state.lock().unwrap();
        if let Some(conn) = &state.conn {
            let frame = AmsFrame::request(
                target_of_nobody(),
                target_of_nobody(),
                CommandId::DeviceNotification,
                0,
                notification.encode(),
            );
            let _ = conn.send(Control::Push(frame));
        }
    }

    /// Drops the current connection, as a crashing server would.
    pub fn kick(&self) {
        let state = self.state.lock().unwrap();
        if let Some(conn) = &state.conn {
            let _ = conn.send(Control::Kick);
        }
    }
}

fn target_of_nobody() -> adstc_core::ams::AmsAddr {
    adstc_core::ams::AmsAddr::new(AmsNetId::zero(), 0)
}

#[derive(Default)]
pub struct MockPlcBuilder {
    symbols: Vec<SymbolDef>,
    types: Vec<TypeDef>,
    memory: HashMap<u32, Vec<u8>>,
    device_name: Option<String>,
    version: Option<(u8, u8, u16)>,
    next_handle: Option<u32>,
}

impl MockPlcBuilder {
    pub fn symbol(mut self, symbol: SymbolDef) -> Self {
        self.symbols.push(symbol);
        self
    }

    pub fn type_def(mut self, ty: TypeDef) -> Self {
        self.types.push(ty);
        self
    }

    pub fn memory(mut self, index_group: u32, bytes: Vec<u8>) -> Self {
        self.memory.insert(index_group, bytes);
        self
    }

    pub fn device(mut self, name: &str, major: u8, minor: u8, build: u16) -> Self {
        self.device_name = Some(name.to_string());
        self.version = Some((major, minor, build));
        self
    }

    pub fn next_handle(mut self, handle: u32) -> Self {
        self.next_handle = Some(handle);
        self
    }

    pub async fn start(self) -> MockPlc {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(Mutex::new(PlcState {
            device_name: self.device_name.unwrap_or_else(|| "Plc30 App".to_string()),
            version: self.version.unwrap_or((3, 1, 1969)),
            ads_state: AdsState::Run,
            refuse_all: false,
            memory: self.memory,
            symbols: self.symbols,
            types: self.types,
            next_handle: self.next_handle.unwrap_or(1),
            subscriptions: Vec::new(),
            connections_served: 0,
            conn: None,
        }));

        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let (tx, rx) = mpsc::unbounded_channel();
                {
                    let mut state = accept_state.lock().unwrap();
                    state.connections_served += 1;
                    state.conn = Some(tx);
                }
                serve_connection(AmsStream::from_stream(stream), accept_state.clone(), rx).await;
                // Registrations die with the connection, as on a real PLC.
                {
                    let mut state = accept_state.lock().unwrap();
                    state.subscriptions.clear();
                    state.conn = None;
                }
            }
        });

        MockPlc { addr, state }
    }
}

/// Serves one connection until the peer hangs up or a Kick arrives.
async fn serve_connection(
    stream: AmsStream,
    state: Arc<Mutex<PlcState>>,
    mut control: mpsc::UnboundedReceiver<Control>,
) {
    let (mut reader, mut writer) = stream.into_split();
    loop {
        tokio::select! {
            frame = reader.read_frame() => {
                let Ok(frame) = frame else { return };
                let Some(response) = respond(&state, &frame) else { continue };
                if writer.write_frame(&response).await.is_err() {
                    return;
                }
            }
            command = control.recv() => {
                match command {
                    Some(Control::Push(frame)) => {
                        if writer.write_frame(&frame).await.is_err() {
                            return;
                        }
                    }
                    Some(Control::Kick) | None => return,
                }
            }
        }
    }
}

fn respond(state: &Arc<Mutex<PlcState>>, frame: &AmsFrame) -> Option<AmsFrame> {
    let mut state = state.lock().unwrap();
    let header = frame.header();
    let command = header.command_id();

    let payload = if state.refuse_all {
        refusal_payload(command)
    } else {
        match command {
            CommandId::ReadDeviceInfo => DeviceInfoResponse {
                result: ReturnCode::Ok,
                major: state.version.0,
                minor: state.version.1,
                build: state.version.2,
                name: state.device_name.clone(),
            }
            .encode(),
            CommandId::Read => {
                let request = ReadRequest::decode(frame.data()).ok()?;
                handle_read(&state, &request).encode()
            }
            CommandId::Write => {
                let request = WriteRequest::decode(frame.data()).ok()?;
                let area = state.memory.entry(request.index_group).or_default();
                let end = request.index_offset as usize + request.data.len();
                if area.len() < end {
                    area.resize(end, 0);
                }
                area[request.index_offset as usize..end].copy_from_slice(&request.data);
                WriteResponse {
                    result: ReturnCode::Ok,
                }
                .encode()
            }
            CommandId::ReadState => ReadStateResponse {
                result: ReturnCode::Ok,
                ads_state: state.ads_state,
                device_state: 0,
            }
            .encode(),
            CommandId::WriteControl => {
                let request = WriteControlRequest::decode(frame.data()).ok()?;
                state.ads_state = request.ads_state;
                WriteControlResponse {
                    result: ReturnCode::Ok,
                }
                .encode()
            }
            CommandId::AddDeviceNotification => {
                let _request = AddNotificationRequest::decode(frame.data()).ok()?;
                let handle = state.next_handle;
                state.next_handle += 1;
                state.subscriptions.push(handle);
                AddNotificationResponse {
                    result: ReturnCode::Ok,
                    handle: NotificationHandle::new(handle),
                }
                .encode()
            }
            CommandId::DeleteDeviceNotification => {
                let request = DeleteNotificationRequest::decode(frame.data()).ok()?;
                let handle = request.handle.as_u32();
                let known = state.subscriptions.iter().position(|&h| h == handle);
                let result = match known {
                    Some(at) => {
                        state.subscriptions.remove(at);
                        ReturnCode::Ok
                    }
                    None => ReturnCode::InvalidNotificationHandle,
                };
                DeleteNotificationResponse { result }.encode()
            }
            CommandId::ReadWrite => {
                let request = ReadWriteRequest::decode(frame.data()).ok()?;
                handle_read_write(&state, &request).encode()
            }
            CommandId::DeviceNotification => return None,
            CommandId::Other(_) => ReadResponse {
                result: ReturnCode::ServiceNotSupported,
                data: Vec::new(),
            }
            .encode(),
        }
    };

    Some(AmsFrame::response(
        *header.source(),
        *header.target(),
        command,
        header.invoke_id(),
        ReturnCode::Ok,
        payload,
    ))
}

/// Payload answering `TargetPortNotFound` in the shape the command expects.
fn refusal_payload(command: CommandId) -> Vec<u8> {
    let code = ReturnCode::TargetPortNotFound;
    match command {
        CommandId::ReadState => ReadStateResponse {
            result: code,
            ads_state: AdsState::Invalid,
            device_state: 0,
        }
        .encode(),
        _ => code.to_bytes().to_vec(),
    }
}

fn handle_read(state: &PlcState, request: &ReadRequest) -> ReadResponse {
    match request.index_group {
        index_groups::SYM_UPLOAD_INFO => {
            let blob = symbol_blob(&state.symbols);
            let mut data = (state.symbols.len() as u32).to_le_bytes().to_vec();
            data.extend_from_slice(&(blob.len() as u32).to_le_bytes());
            ReadResponse {
                result: ReturnCode::Ok,
                data,
            }
        }
        index_groups::SYM_UPLOAD => ReadResponse {
            result: ReturnCode::Ok,
            data: symbol_blob(&state.symbols),
        },
        group => match state.memory.get(&group) {
            Some(area) => {
                let start = request.index_offset as usize;
                let end = start + request.length as usize;
                if end > area.len() {
                    ReadResponse {
                        result: ReturnCode::InvalidIndexOffset,
                        data: Vec::new(),
                    }
                } else {
                    ReadResponse {
                        result: ReturnCode::Ok,
                        data: area[start..end].to_vec(),
                    }
                }
            }
            None => ReadResponse {
                result: ReturnCode::InvalidIndexGroup,
                data: Vec::new(),
            },
        },
    }
}

fn handle_read_write(state: &PlcState, request: &ReadWriteRequest) -> ReadWriteResponse {
    match request.index_group {
        index_groups::DT_UPLOAD => {
            let name_end = request
                .data
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(request.data.len());
            let name = String::from_utf8_lossy(&request.data[..name_end]);
            match state
                .types
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(&name))
            {
                Some(ty) => ReadWriteResponse {
                    result: ReturnCode::Ok,
                    data: encode_type_entry(ty),
                },
                None => ReadWriteResponse {
                    result: ReturnCode::NotFound,
                    data: Vec::new(),
                },
            }
        }
        _ => ReadWriteResponse {
            result: ReturnCode::ServiceNotSupported,
            data: Vec::new(),
        },
    }
}

fn symbol_blob(symbols: &[SymbolDef]) -> Vec<u8> {
    let mut blob = Vec::new();
    for symbol in symbols {
        blob.extend_from_slice(&encode_symbol_entry(symbol));
    }
    blob
}

fn encode_symbol_entry(symbol: &SymbolDef) -> Vec<u8> {
    let name = symbol.name.as_bytes();
    let type_name = symbol.type_name.as_bytes();
    let comment = symbol.comment.as_bytes();
    let entry_len = 30 + name.len() + 1 + type_name.len() + 1 + comment.len() + 1;

    let mut buf = Vec::with_capacity(entry_len);
    buf.extend_from_slice(&(entry_len as u32).to_le_bytes());
    buf.extend_from_slice(&symbol.index_group.to_le_bytes());
    buf.extend_from_slice(&symbol.index_offset.to_le_bytes());
    buf.extend_from_slice(&symbol.size.to_le_bytes());
    buf.extend_from_slice(&symbol.data_type.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags
    buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(type_name.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(comment.len() as u16).to_le_bytes());
    buf.extend_from_slice(name);
    buf.push(0);
    buf.extend_from_slice(type_name);
    buf.push(0);
    buf.extend_from_slice(comment);
    buf.push(0);
    buf
}

fn encode_type_entry(ty: &TypeDef) -> Vec<u8> {
    let subs: Vec<Vec<u8>> = ty.sub_items.iter().map(encode_type_entry).collect();
    let subs_len: usize = subs.iter().map(Vec::len).sum();
    let strings_len = ty.name.len() + 1 + ty.type_name.len() + 1 + 1;
    let entry_len = 42 + strings_len + ty.dims.len() * 8 + subs_len;

    let mut buf = Vec::with_capacity(entry_len);
    buf.extend_from_slice(&(entry_len as u32).to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes()); // version
    buf.extend_from_slice(&0u32.to_le_bytes()); // hash
    buf.extend_from_slice(&0u32.to_le_bytes()); // type hash
    buf.extend_from_slice(&ty.size.to_le_bytes());
    buf.extend_from_slice(&ty.offset.to_le_bytes());
    buf.extend_from_slice(&ty.data_type.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags
    buf.extend_from_slice(&(ty.name.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(ty.type_name.len() as u16).to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes()); // comment length
    buf.extend_from_slice(&(ty.dims.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(ty.sub_items.len() as u16).to_le_bytes());
    buf.extend_from_slice(ty.name.as_bytes());
    buf.push(0);
    buf.extend_from_slice(ty.type_name.as_bytes());
    buf.push(0);
    buf.push(0); // empty comment
    for (lower, length) in &ty.dims {
        buf.extend_from_slice(&lower.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
    }
    for sub in subs {
        buf.extend_from_slice(&sub);
    }
    buf
}
