use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::CameraStream;

/// TCP transport to a camera endpoint.
///
/// Each call to [`TcpTransport::connect`] opens a fresh socket. The camera
/// exposes one port for the image stream and one for commands; both go
/// through here.
pub struct TcpTransport;

impl TcpTransport {
    /// Connect to `addr` (`host:port`, blocking).
    ///
    /// Every resolved address is tried in order. With a `connect_timeout`
    /// each attempt is bounded; without one the OS default applies.
    pub fn connect(addr: &str, connect_timeout: Option<Duration>) -> Result<CameraStream> {
        let candidates = resolve(addr)?;

        let mut last_err = None;
        for candidate in candidates {
            let attempt = match connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    debug!(%addr, peer = %candidate, "connected to camera endpoint");
                    return Ok(CameraStream::from_tcp(stream));
                }
                Err(err) => {
                    debug!(%addr, peer = %candidate, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr: addr.to_string(),
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(ErrorKind::AddrNotAvailable, "no addresses to try")
            }),
        })
    }

    /// Transport name for diagnostics.
    pub fn transport_name() -> &'static str {
        "tcp"
    }
}

fn resolve(addr: &str) -> Result<Vec<SocketAddr>> {
    let resolved: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            addr: addr.to_string(),
            source,
        })?
        .collect();

    if resolved.is_empty() {
        return Err(TransportError::Resolve {
            addr: addr.to_string(),
            source: std::io::Error::new(ErrorKind::NotFound, "address resolved to nothing"),
        });
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = std::thread::spawn(move || {
            let mut client = TcpTransport::connect(&addr, None).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let (mut server, _) = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody is listening on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let result = TcpTransport::connect(
            &format!("127.0.0.1:{port}"),
            Some(Duration::from_millis(500)),
        );
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_unresolvable_address() {
        let result = TcpTransport::connect("not an address", None);
        assert!(matches!(result, Err(TransportError::Resolve { .. })));
    }

    #[test]
    fn test_shutdown_unblocks_clone_and_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let client = TcpTransport::connect(&addr, None).unwrap();
        let (_server, _) = listener.accept().unwrap();

        let mut reader = client.try_clone().unwrap();
        let blocked = std::thread::spawn(move || {
            let mut buf = [0u8; 1];
            reader.read(&mut buf)
        });

        client.shutdown().unwrap();
        let read = blocked.join().unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));

        assert!(client.shutdown().is_ok());
    }
}
