//! Endpoint addressing.
//!
//! Addresses use the same `transport:key=value,...` shape the controller
//! has always advertised:
//!
//! ```text
//! tcp:host=127.0.0.1,port=5000
//! unix:path=/run/switchboard/control.sock
//! 127.0.0.1:5000                          (shorthand for tcp)
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tracing::debug;

use crate::error::SwitchError;
use crate::network::connection::Connection;

pub const DEFAULT_ADDRESS: &str = "tcp:host=127.0.0.1,port=5000";

/// Where the controller listens and clients connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix { path: PathBuf },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp {
            host: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

impl FromStr for Endpoint {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || SwitchError::InvalidEndpoint(s.to_string());

        if let Some(rest) = s.strip_prefix("tcp:") {
            let mut host = None;
            let mut port = None;
            for (key, value) in parse_pairs(rest).ok_or_else(invalid)? {
                match key {
                    "host" => host = Some(value.to_string()),
                    "port" => port = Some(value.parse::<u16>().map_err(|_| invalid())?),
                    _ => return Err(invalid()),
                }
            }
            return Ok(Endpoint::Tcp {
                host: host.unwrap_or_else(|| "127.0.0.1".into()),
                port: port.ok_or_else(invalid)?,
            });
        }

        if let Some(rest) = s.strip_prefix("unix:") {
            let mut path = None;
            for (key, value) in parse_pairs(rest).ok_or_else(invalid)? {
                match key {
                    "path" => path = Some(PathBuf::from(value)),
                    _ => return Err(invalid()),
                }
            }
            return path.map(|path| Endpoint::Unix { path }).ok_or_else(invalid);
        }

        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Endpoint::Tcp {
            host: host.trim_matches(|c| c == '[' || c == ']').to_string(),
            port: port.parse().map_err(|_| invalid())?,
        })
    }
}

fn parse_pairs(s: &str) -> Option<Vec<(&str, &str)>> {
    s.split(',')
        .filter(|part| !part.is_empty())
        .map(|part| part.split_once('='))
        .collect()
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "tcp:host={host},port={port}"),
            Endpoint::Unix { path } => write!(f, "unix:path={}", path.display()),
        }
    }
}

impl Endpoint {
    fn socket_string(host: &str, port: u16) -> String {
        if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        }
    }

    /// Open a client connection to this endpoint.
    pub async fn connect(&self) -> Result<Connection, SwitchError> {
        match self {
            Endpoint::Tcp { host, port } => {
                let address = Self::socket_string(host, *port);
                let stream = tokio::net::TcpStream::connect(address).await?;
                stream.set_nodelay(true)?;
                let peer = stream.peer_addr()?.to_string();
                Ok(Connection::new(stream, peer))
            }
            #[cfg(unix)]
            Endpoint::Unix { path } => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok(Connection::new(stream, path.display().to_string()))
            }
            #[cfg(not(unix))]
            Endpoint::Unix { .. } => Err(SwitchError::InvalidEndpoint(format!(
                "{self}: unix sockets are not available on this platform"
            ))),
        }
    }
}

// ── Listener ─────────────────────────────────────────────────────

/// A bound listening socket for either transport.
#[derive(Debug)]
pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix { listener: UnixListener, path: PathBuf },
}

impl Listener {
    /// Bind `endpoint`. Never retries.
    pub async fn bind(endpoint: &Endpoint) -> Result<Self, SwitchError> {
        let bind_err = |source| SwitchError::Bind {
            address: endpoint.to_string(),
            source,
        };
        match endpoint {
            Endpoint::Tcp { host, port } => {
                let listener = TcpListener::bind(Endpoint::socket_string(host, *port))
                    .await
                    .map_err(bind_err)?;
                Ok(Listener::Tcp(listener))
            }
            #[cfg(unix)]
            Endpoint::Unix { path } => {
                let listener = UnixListener::bind(path).map_err(bind_err)?;
                Ok(Listener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
            #[cfg(not(unix))]
            Endpoint::Unix { .. } => Err(SwitchError::InvalidEndpoint(format!(
                "{endpoint}: unix sockets are not available on this platform"
            ))),
        }
    }

    /// The address clients should use, with any OS-assigned port filled in.
    pub fn local_endpoint(&self) -> Result<Endpoint, SwitchError> {
        match self {
            Listener::Tcp(listener) => {
                let addr = listener.local_addr()?;
                Ok(Endpoint::Tcp {
                    host: addr.ip().to_string(),
                    port: addr.port(),
                })
            }
            #[cfg(unix)]
            Listener::Unix { path, .. } => Ok(Endpoint::Unix { path: path.clone() }),
        }
    }

    /// Wait for the next peer.
    pub async fn accept(&self) -> Result<Connection, SwitchError> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("set_nodelay failed for {addr}: {e}");
                }
                Ok(Connection::new(stream, addr.to_string()))
            }
            #[cfg(unix)]
            Listener::Unix { listener, path } => {
                let (stream, _) = listener.accept().await?;
                Ok(Connection::new(stream, format!("{}#peer", path.display())))
            }
        }
    }
}

#[cfg(unix)]
impl Drop for Listener {
    fn drop(&mut self) {
        if let Listener::Unix { path, .. } = self {
            if let Err(e) = std::fs::remove_file(path.as_path()) {
                tracing::warn!("could not remove socket {}: {e}", path.display());
            }
        }
    }
}
