/// Errors that can occur in camera client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connect, resolve, socket I/O).
    #[error("transport error: {0}")]
    Transport(#[from] camwire_transport::TransportError),

    /// Frame or value codec error, including I/O while reading a reply.
    #[error("frame error: {0}")]
    Frame(#[from] camwire_frame::FrameError),

    /// A command was issued on a channel with no open socket.
    #[error("command channel not connected")]
    NotConnected,

    /// The peer closed the connection part way through an exchange.
    #[error("short {what}: got {got} of {expected} bytes")]
    ShortReply {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// The device answered with a non-zero error code.
    #[error("device rejected {command} sub-command 0x{sub_command:02X} with error {code}")]
    Device {
        command: &'static str,
        sub_command: u32,
        code: u32,
    },

    /// The device answered with a value of the wrong shape.
    #[error("unexpected reply for {setting}: {detail}")]
    UnexpectedReply {
        setting: &'static str,
        detail: String,
    },

    /// No setting goes by this name.
    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    /// A background thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}

impl ClientError {
    /// Whether this error happened mid-exchange, leaving the command
    /// connection in an unknown state.
    ///
    /// Such failures close the channel; the next command reconnects.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Frame(_) | ClientError::ShortReply { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
