//! In-process camera simulator.
//!
//! Serves the image stream and the command protocol on two local listeners,
//! keeping settings in memory. Used by the `mock-camera` demo and by tests
//! that need a device on the other end of a real socket.

use std::collections::{HashMap, HashSet};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use camwire_frame::{
    command_name, encode_image_frame, encode_value, CommandHeader, Value, COMMAND_HEADER_SIZE,
    COMMIT, GET, SET,
};
use tracing::{debug, info};

use crate::supervisor::lock;
use crate::table::Setting;

const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// What the simulated image server sends.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub width: u16,
    pub height: u16,
    pub payload: Bytes,
    pub frame_interval: Duration,
    /// Hang up after this many frames on each connection, to exercise reconnects.
    pub frames_per_connection: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            payload: Bytes::from_static(b"\xFF\xD8simulated-frame\xFF\xD9"),
            frame_interval: Duration::from_millis(20),
            frames_per_connection: None,
        }
    }
}

/// Observable device state, shared with the server threads.
#[derive(Debug, Default)]
pub struct SimState {
    settings: Mutex<HashMap<u32, Vec<u8>>>,
    requests: Mutex<Vec<CommandHeader>>,
    rejections: Mutex<HashMap<u32, u32>>,
    hang_ups: Mutex<HashSet<u32>>,
    last_request_len: AtomicUsize,
    commits: AtomicUsize,
    image_connections: AtomicUsize,
    command_connections: AtomicUsize,
    frames_sent: AtomicU64,
}

impl SimState {
    fn with_defaults() -> Self {
        let state = Self::default();
        {
            let mut settings = lock(&state.settings);
            for setting in Setting::ALL {
                let mut raw = BytesMut::new();
                if encode_value(setting.wire_type(), &default_value(setting), &mut raw).is_ok() {
                    settings.insert(setting.sub_code(), raw.to_vec());
                }
            }
        }
        state
    }

    /// Every command header received, in order (COMMIT included).
    pub fn requests(&self) -> Vec<CommandHeader> {
        lock(&self.requests).clone()
    }

    /// Wire length of the last request, pad byte included.
    pub fn last_request_len(&self) -> usize {
        self.last_request_len.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn image_connections(&self) -> usize {
        self.image_connections.load(Ordering::SeqCst)
    }

    /// Command connections accepted so far.
    pub fn command_connections(&self) -> usize {
        self.command_connections.load(Ordering::SeqCst)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::SeqCst)
    }

    /// Raw stored bytes of a setting.
    pub fn stored(&self, sub_command: u32) -> Option<Vec<u8>> {
        lock(&self.settings).get(&sub_command).cloned()
    }

    /// Forget a setting; GETs then answer with an empty reply.
    pub fn clear(&self, sub_command: u32) {
        lock(&self.settings).remove(&sub_command);
    }

    /// Answer commands for `sub_command` with `error`.
    pub fn reject(&self, sub_command: u32, error: u32) {
        lock(&self.rejections).insert(sub_command, error);
    }

    /// Drop the connection instead of answering commands for `sub_command`.
    pub fn hang_up_on(&self, sub_command: u32) {
        lock(&self.hang_ups).insert(sub_command);
    }

    fn handle(&self, header: &CommandHeader, value: Vec<u8>) -> Option<Vec<u8>> {
        let setting = Setting::from_sub_code(header.sub_command).map_or("-", Setting::name);
        debug!(command = command_name(header.code), setting, "sim: request");
        if lock(&self.hang_ups).contains(&header.sub_command) {
            return None;
        }
        let error = lock(&self.rejections)
            .get(&header.sub_command)
            .copied()
            .unwrap_or(0);

        let reply = match header.code {
            SET => {
                if error == 0 {
                    lock(&self.settings).insert(header.sub_command, value);
                }
                reply_header(SET, header.sub_command, error, 0).to_vec()
            }
            GET => {
                let stored = if error == 0 {
                    self.stored(header.sub_command).unwrap_or_default()
                } else {
                    Vec::new()
                };
                let mut reply =
                    reply_header(GET, header.sub_command, error, stored.len() as u32).to_vec();
                reply.extend_from_slice(&stored);
                reply
            }
            COMMIT => {
                self.commits.fetch_add(1, Ordering::SeqCst);
                reply_header(COMMIT, 0, 0, 0).to_vec()
            }
            other => reply_header(other, header.sub_command, 1, 0).to_vec(),
        };
        Some(reply)
    }
}

/// Open client sockets, kept so they can be dropped on demand.
#[derive(Debug, Default)]
struct Clients {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, TcpStream>>,
}

impl Clients {
    fn track(&self, socket: &TcpStream) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(clone) = socket.try_clone() {
            lock(&self.open).insert(id, clone);
        }
        id
    }

    fn release(&self, id: u64) {
        lock(&self.open).remove(&id);
    }

    fn len(&self) -> usize {
        lock(&self.open).len()
    }

    fn disconnect_all(&self) {
        for (_, socket) in lock(&self.open).drain() {
            let _ = socket.shutdown(Shutdown::Both);
        }
    }
}

/// A running simulated camera.
pub struct SimCamera {
    image_addr: SocketAddr,
    command_addr: SocketAddr,
    state: Arc<SimState>,
    stop: Arc<AtomicBool>,
    clients: Arc<Clients>,
    threads: Vec<JoinHandle<()>>,
}

impl SimCamera {
    /// Start on ephemeral localhost ports.
    pub fn start(config: SimConfig) -> std::io::Result<Self> {
        Self::bind("127.0.0.1:0", "127.0.0.1:0", config)
    }

    /// Start on explicit addresses.
    pub fn bind(
        image_addr: &str,
        command_addr: &str,
        config: SimConfig,
    ) -> std::io::Result<Self> {
        let image_listener = TcpListener::bind(image_addr)?;
        let command_listener = TcpListener::bind(command_addr)?;
        image_listener.set_nonblocking(true)?;
        command_listener.set_nonblocking(true)?;

        let state = Arc::new(SimState::with_defaults());
        let stop = Arc::new(AtomicBool::new(false));
        let clients = Arc::new(Clients::default());

        let mut sim = Self {
            image_addr: image_listener.local_addr()?,
            command_addr: command_listener.local_addr()?,
            state: Arc::clone(&state),
            stop: Arc::clone(&stop),
            clients: Arc::clone(&clients),
            threads: Vec::new(),
        };

        let image_thread = {
            let (state, stop, clients) =
                (Arc::clone(&state), Arc::clone(&stop), Arc::clone(&clients));
            std::thread::Builder::new()
                .name("sim-image".to_string())
                .spawn(move || serve_images(image_listener, config, state, stop, clients))?
        };
        sim.threads.push(image_thread);

        let command_thread = std::thread::Builder::new()
            .name("sim-command".to_string())
            .spawn(move || serve_commands(command_listener, state, stop, clients))?;
        sim.threads.push(command_thread);

        info!(image = %sim.image_addr, command = %sim.command_addr, "simulated camera up");
        Ok(sim)
    }

    pub fn image_addr(&self) -> SocketAddr {
        self.image_addr
    }

    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Client connections that are still open.
    pub fn open_clients(&self) -> usize {
        self.clients.len()
    }

    /// Drop every open client connection without stopping the listeners.
    pub fn disconnect_clients(&self) {
        self.clients.disconnect_all();
    }

    /// Stop listening and close every connection.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.disconnect_clients();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for SimCamera {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve_images(
    listener: TcpListener,
    config: SimConfig,
    state: Arc<SimState>,
    stop: Arc<AtomicBool>,
    clients: Arc<Clients>,
) {
    let mut wire = BytesMut::new();
    if encode_image_frame(config.width, config.height, &config.payload, &mut wire).is_err() {
        return;
    }

    while !stop.load(Ordering::SeqCst) {
        let Some((mut socket, id)) = accept(&listener, &clients) else {
            continue;
        };
        state.image_connections.fetch_add(1, Ordering::SeqCst);
        debug!("sim: image client connected");

        let mut sent = 0usize;
        while !stop.load(Ordering::SeqCst)
            && config.frames_per_connection.map_or(true, |limit| sent < limit)
        {
            if socket.write_all(&wire).is_err() {
                break;
            }
            sent += 1;
            state.frames_sent.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(config.frame_interval);
        }
        let _ = socket.shutdown(Shutdown::Both);
        clients.release(id);
        debug!(sent, "sim: image client done");
    }
}

fn serve_commands(
    listener: TcpListener,
    state: Arc<SimState>,
    stop: Arc<AtomicBool>,
    clients: Arc<Clients>,
) {
    while !stop.load(Ordering::SeqCst) {
        let Some((socket, id)) = accept(&listener, &clients) else {
            continue;
        };
        state.command_connections.fetch_add(1, Ordering::SeqCst);
        let (state, conn_clients) = (Arc::clone(&state), Arc::clone(&clients));
        let spawned = std::thread::Builder::new()
            .name("sim-command-conn".to_string())
            .spawn(move || {
                serve_command_connection(socket, &state);
                conn_clients.release(id);
            });
        if spawned.is_err() {
            clients.release(id);
            debug!("sim: could not spawn command connection thread");
        }
    }
}

fn serve_command_connection(mut socket: TcpStream, state: &SimState) {
    loop {
        let mut raw = [0u8; COMMAND_HEADER_SIZE];
        if socket.read_exact(&mut raw).is_err() {
            return;
        }
        let Ok(header) = CommandHeader::decode(&raw) else {
            return;
        };

        let size = header.value_size as usize;
        let padded = size + size % 2;
        let mut value = vec![0u8; padded];
        if socket.read_exact(&mut value).is_err() {
            return;
        }
        value.truncate(size);

        lock(&state.requests).push(header);
        state
            .last_request_len
            .store(COMMAND_HEADER_SIZE + padded, Ordering::SeqCst);

        let Some(reply) = state.handle(&header, value) else {
            let _ = socket.shutdown(Shutdown::Both);
            return;
        };
        if socket.write_all(&reply).is_err() {
            return;
        }
    }
}

fn accept(listener: &TcpListener, clients: &Clients) -> Option<(TcpStream, u64)> {
    match listener.accept() {
        Ok((socket, _)) => {
            // Accepted sockets may inherit non-blocking mode on some platforms.
            socket.set_nonblocking(false).ok()?;
            let id = clients.track(&socket);
            Some((socket, id))
        }
        Err(err) if err.kind() == ErrorKind::WouldBlock => {
            std::thread::sleep(ACCEPT_POLL);
            None
        }
        Err(_) => {
            std::thread::sleep(ACCEPT_POLL);
            None
        }
    }
}

fn reply_header(
    code: u32,
    sub_command: u32,
    error: u32,
    value_size: u32,
) -> [u8; COMMAND_HEADER_SIZE] {
    CommandHeader {
        code,
        sub_command,
        error,
        value_size,
    }
    .to_bytes()
}

fn default_value(setting: Setting) -> Value {
    match setting {
        Setting::ExpAuto => Value::Bool(true),
        Setting::ExpTime => Value::Float32(10.0),
        Setting::Again => Value::Float32(1.0),
        Setting::Width => Value::Int32(640),
        Setting::Height => Value::Int32(480),
        Setting::DgainGr | Setting::DgainGb | Setting::DgainR | Setting::DgainB => {
            Value::Float32(1.0)
        }
        other => Value::placeholder(other.wire_type()),
    }
}
