use std::io::{ErrorKind, Read, Write};

use camwire_frame::{
    command_name, decode_value, encode_command, encode_commit, read_full, CommandHeader,
    FrameError, Value, WireType, COMMAND_HEADER_SIZE,
};
use camwire_transport::{CameraStream, TcpTransport};
use tracing::{debug, info, warn};

use crate::config::CommandConfig;
use crate::error::{ClientError, Result};

/// Request/response channel to the camera's command server.
///
/// The socket is opened on demand and dropped on any mid-exchange failure,
/// so a failed command always leaves the channel disconnected. One command
/// is in flight at a time; `&mut self` makes callers serialize.
pub struct CommandChannel {
    addr: String,
    config: CommandConfig,
    stream: Option<CameraStream>,
}

impl CommandChannel {
    pub fn new(addr: impl Into<String>, config: CommandConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            stream: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Open a fresh socket to the command server, replacing any existing one.
    ///
    /// Failure leaves the channel disconnected. No retry is attempted.
    pub fn connect(&mut self) -> Result<()> {
        self.close();

        let stream = match TcpTransport::connect(&self.addr, self.config.connect_timeout) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(addr = %self.addr, error = %err, "command connection failed");
                return Err(err.into());
            }
        };
        stream.set_read_timeout(self.config.io_timeout)?;
        stream.set_write_timeout(self.config.io_timeout)?;
        stream.set_nodelay(true)?;

        info!(addr = %self.addr, "command client connected");
        self.stream = Some(stream);
        Ok(())
    }

    /// Send one command and wait for its response.
    ///
    /// When `is_commit` is set and the device acknowledges with an empty reply,
    /// a COMMIT transaction follows so the device applies the pending batch.
    /// Returns the decoded reply value, or `None` for an empty reply.
    pub fn send_command(
        &mut self,
        code: u32,
        sub_command: u32,
        wire: WireType,
        value: &Value,
        is_commit: bool,
    ) -> Result<Option<Value>> {
        let request = encode_command(code, sub_command, wire, value)?;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        debug!(
            command = command_name(code),
            sub_command,
            size = request.len(),
            is_commit,
            "sending command"
        );

        match exchange(stream, &request, wire, is_commit, self.config.max_reply_size) {
            Ok(reply) => Ok(reply),
            Err(err) => {
                if err.is_connection_fault() {
                    warn!(
                        command = command_name(code),
                        sub_command,
                        error = %err,
                        "command failed, closing channel"
                    );
                    self.close();
                }
                Err(err)
            }
        }
    }

    /// Shut down and release the socket. Errors are logged and swallowed.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.shutdown() {
                debug!(error = %err, "command server closed without notice");
            }
            info!(addr = %self.addr, "command client disconnected");
        }
    }
}

impl Drop for CommandChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// One request/response exchange, plus the COMMIT trailer when asked for.
fn exchange<S: Read + Write>(
    stream: &mut S,
    request: &[u8],
    wire: WireType,
    is_commit: bool,
    max_reply: usize,
) -> Result<Option<Value>> {
    write_request(stream, request)?;
    let header = read_header(stream, "response header")?;

    if is_commit && header.value_size == 0 {
        check_device_error(&header)?;
        write_request(stream, &encode_commit())?;
        let ack = read_header(stream, "commit ack")?;
        check_device_error(&ack)?;
        debug!(sub_command = header.sub_command, "settings committed");
        return Ok(None);
    }

    let expected = header.value_size as usize;
    if expected > max_reply {
        return Err(FrameError::PayloadTooLarge {
            size: expected,
            max: max_reply,
        }
        .into());
    }
    let mut reply = vec![0u8; expected];
    let got = read_full(stream, &mut reply)?;
    if got < expected {
        return Err(ClientError::ShortReply {
            what: "reply value",
            got,
            expected,
        });
    }
    check_device_error(&header)?;

    if reply.is_empty() {
        return Ok(None);
    }
    Ok(Some(decode_value(&reply, wire)?))
}

fn write_request<S: Write>(stream: &mut S, request: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < request.len() {
        match stream.write(&request[offset..]) {
            Ok(0) => {
                return Err(ClientError::ShortReply {
                    what: "request write",
                    got: offset,
                    expected: request.len(),
                })
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err).into()),
        }
    }
    stream.flush().map_err(FrameError::Io)?;
    Ok(())
}

fn read_header<S: Read>(stream: &mut S, what: &'static str) -> Result<CommandHeader> {
    let mut raw = [0u8; COMMAND_HEADER_SIZE];
    let got = read_full(stream, &mut raw)?;
    if got < COMMAND_HEADER_SIZE {
        return Err(ClientError::ShortReply {
            what,
            got,
            expected: COMMAND_HEADER_SIZE,
        });
    }
    Ok(CommandHeader::decode(&raw)?)
}

fn check_device_error(header: &CommandHeader) -> Result<()> {
    if header.error == 0 {
        return Ok(());
    }
    Err(ClientError::Device {
        command: command_name(header.code),
        sub_command: header.sub_command,
        code: header.error,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use camwire_frame::{COMMIT, GET, SET};

    use super::*;
    use crate::config::{CommandConfig, DEFAULT_MAX_REPLY as MAX};
    use crate::sim::{SimCamera, SimConfig};

    /// In-memory duplex: reads come from a scripted reply, writes are recorded.
    struct Scripted {
        reply: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Scripted {
        fn new(reply: Vec<u8>) -> Self {
            Self {
                reply: Cursor::new(reply),
                written: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reply.read(buf)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn header(code: u32, sub: u32, error: u32, size: u32) -> Vec<u8> {
        CommandHeader {
            code,
            sub_command: sub,
            error,
            value_size: size,
        }
        .to_bytes()
        .to_vec()
    }

    fn channel_for(sim: &SimCamera) -> CommandChannel {
        let mut channel =
            CommandChannel::new(sim.command_addr().to_string(), CommandConfig::default());
        channel.connect().unwrap();
        channel
    }

    #[test]
    fn commit_sends_exactly_one_extra_transaction() {
        let mut reply = header(GET, 0x02, 0, 0);
        reply.extend(header(COMMIT, 0, 0, 0));
        let mut stream = Scripted::new(reply);

        let request = encode_command(GET, 0x02, WireType::Float32, &Value::Float32(0.0)).unwrap();
        let value = exchange(&mut stream, &request, WireType::Float32, true, MAX).unwrap();
        assert!(value.is_none());

        assert_eq!(stream.written.len(), request.len() + COMMAND_HEADER_SIZE);
        assert_eq!(&stream.written[request.len()..], &encode_commit());
    }

    #[test]
    fn non_commit_empty_reply_has_no_trailer() {
        let mut stream = Scripted::new(header(SET, 0x05, 0, 0));
        let request = encode_command(SET, 0x05, WireType::Int32, &Value::Int32(10)).unwrap();
        assert!(exchange(&mut stream, &request, WireType::Int32, false, MAX)
            .unwrap()
            .is_none());
        assert_eq!(stream.written, request.to_vec());
    }

    #[test]
    fn reply_value_is_decoded_by_request_type() {
        let mut reply = header(GET, 0x07, 0, 4);
        reply.extend(1280i32.to_le_bytes());
        let mut stream = Scripted::new(reply);
        let request = encode_command(GET, 0x07, WireType::Int32, &Value::Int32(0)).unwrap();
        assert_eq!(
            exchange(&mut stream, &request, WireType::Int32, false, MAX).unwrap(),
            Some(Value::Int32(1280))
        );
    }

    #[test]
    fn short_response_header_is_reported() {
        let mut stream = Scripted::new(vec![0x33, 0, 0]);
        let request = encode_command(SET, 1, WireType::Bool, &Value::Bool(true)).unwrap();
        let err = exchange(&mut stream, &request, WireType::Bool, false, MAX).unwrap_err();
        assert!(matches!(
            err,
            ClientError::ShortReply {
                got: 3,
                expected: 16,
                ..
            }
        ));
        assert!(err.is_connection_fault());
    }

    #[test]
    fn device_error_is_surfaced_after_draining_reply() {
        let mut reply = header(GET, 0x04, 9, 4);
        reply.extend(1.0f32.to_le_bytes());
        let mut stream = Scripted::new(reply);
        let request = encode_command(GET, 0x04, WireType::Float32, &Value::Float32(0.0)).unwrap();
        let err = exchange(&mut stream, &request, WireType::Float32, false, MAX).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Device {
                command: "GET",
                sub_command: 0x04,
                code: 9
            }
        ));
        assert!(!err.is_connection_fault());
        assert_eq!(stream.reply.position(), 20);
    }

    #[test]
    fn oversized_reply_is_refused_before_reading() {
        let mut reply = header(GET, 0x07, 0, u32::MAX);
        reply.extend([0u8; 8]);
        let mut stream = Scripted::new(reply);
        let request = encode_command(GET, 0x07, WireType::Int32, &Value::Int32(0)).unwrap();

        let err = exchange(&mut stream, &request, WireType::Int32, false, MAX).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(FrameError::PayloadTooLarge { size, max })
                if size == u32::MAX as usize && max == MAX
        ));
        assert!(err.is_connection_fault());
        assert_eq!(stream.reply.position(), COMMAND_HEADER_SIZE as u64);
    }

    #[test]
    fn oversized_reply_closes_channel() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut request = [0u8; COMMAND_HEADER_SIZE + 4];
            socket.read_exact(&mut request).unwrap();
            socket.write_all(&header(GET, 0x07, 0, 1 << 20)).unwrap();
        });

        let config = CommandConfig {
            max_reply_size: 64,
            ..CommandConfig::default()
        };
        let mut channel = CommandChannel::new(addr.to_string(), config);
        channel.connect().unwrap();
        let err = channel
            .send_command(GET, 0x07, WireType::Int32, &Value::Int32(0), false)
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Frame(FrameError::PayloadTooLarge { max: 64, .. })
        ));
        assert!(!channel.is_connected());
        server.join().unwrap();
    }

    #[test]
    fn send_without_connection_fails() {
        let mut channel = CommandChannel::new("127.0.0.1:1", CommandConfig::default());
        let err = channel
            .send_command(GET, 1, WireType::Bool, &Value::Bool(false), false)
            .unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[test]
    fn float_set_then_get_roundtrips() {
        let sim = SimCamera::start(SimConfig::default()).unwrap();
        let mut channel = channel_for(&sim);

        channel
            .send_command(SET, 0x02, WireType::Float32, &Value::Float32(33.3), true)
            .unwrap();
        let value = channel
            .send_command(GET, 0x02, WireType::Float32, &Value::Float32(0.0), false)
            .unwrap();

        assert_eq!(value, Some(Value::Float32(33.3)));
        assert_eq!(sim.state().commits(), 1);
        assert!(channel.is_connected());
    }

    #[test]
    fn commit_against_device_with_empty_get_reply() {
        let sim = SimCamera::start(SimConfig::default()).unwrap();
        sim.state().clear(0x0A);
        let mut channel = channel_for(&sim);

        let value = channel
            .send_command(GET, 0x0A, WireType::Float32, &Value::Float32(0.0), true)
            .unwrap();

        assert!(value.is_none());
        assert_eq!(sim.state().commits(), 1);
        let codes: Vec<u32> = sim.state().requests().iter().map(|h| h.code).collect();
        assert_eq!(codes, vec![GET, COMMIT]);
    }

    #[test]
    fn odd_bool_request_reaches_device_padded() {
        let sim = SimCamera::start(SimConfig::default()).unwrap();
        let mut channel = channel_for(&sim);

        channel
            .send_command(SET, 0x0E, WireType::Bool, &Value::Bool(true), false)
            .unwrap();

        let requests = sim.state().requests();
        assert_eq!(requests[0].value_size, 1);
        assert_eq!(sim.state().last_request_len(), COMMAND_HEADER_SIZE + 2);
    }

    #[test]
    fn transport_failure_closes_channel() {
        let sim = SimCamera::start(SimConfig::default()).unwrap();
        sim.state().hang_up_on(0x07);
        let mut channel = channel_for(&sim);

        let err = channel
            .send_command(GET, 0x07, WireType::Int32, &Value::Int32(0), false)
            .unwrap_err();
        assert!(err.is_connection_fault());
        assert!(!channel.is_connected());

        // A later call reconnects explicitly and works.
        channel.connect().unwrap();
        assert!(channel
            .send_command(GET, 0x08, WireType::Int32, &Value::Int32(0), false)
            .unwrap()
            .is_some());
    }

    #[test]
    fn device_rejection_keeps_channel_open() {
        let sim = SimCamera::start(SimConfig::default()).unwrap();
        sim.state().reject(0x04, 3);
        let mut channel = channel_for(&sim);

        let err = channel
            .send_command(SET, 0x04, WireType::Float32, &Value::Float32(2.0), true)
            .unwrap_err();
        assert!(matches!(err, ClientError::Device { code: 3, .. }));
        assert!(channel.is_connected());
        assert_eq!(sim.state().commits(), 0);
    }

    #[test]
    fn connect_failure_leaves_channel_disconnected() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut channel =
            CommandChannel::new(format!("127.0.0.1:{port}"), CommandConfig::default());
        assert!(matches!(channel.connect(), Err(ClientError::Transport(_))));
        assert!(!channel.is_connected());
        channel.close();
    }
}
