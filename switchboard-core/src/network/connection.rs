use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::SwitchCodec;
use crate::error::SwitchError;
use crate::packet::Packet;

/// Outbound half of a connection. Use `try_send` while holding a lock; it
/// fails instead of waiting when the peer has stopped draining its queue.
pub type ConnectionSender = mpsc::Sender<Packet>;

/// Inbound frames buffered before the reader task applies backpressure.
const INBOUND_CAPACITY: usize = 100;

/// Outbound frames queued for the writer task. A peer this far behind
/// starts losing events.
pub const OUTBOUND_CAPACITY: usize = 256;

/// A framed control-plane connection to a single peer.
///
/// Two background tasks move packets between the socket and a pair of
/// channels. Dropping the `Connection` stops the reader; the writer
/// flushes and shuts the socket down once every [`ConnectionSender`]
/// clone is gone.
#[derive(Debug)]
pub struct Connection {
    // Channel to send packets to background writer task
    tx: ConnectionSender,
    // Channel to receive packets from background reader task
    rx: mpsc::Receiver<Packet>,
    reader: JoinHandle<()>,
    peer: String,
}

impl Connection {
    pub fn new<S>(stream: S, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let peer = peer.into();
        let (mut net_writer, mut net_reader) = Framed::new(stream, SwitchCodec).split();

        // User -> Network
        let (user_tx, mut network_rx) = mpsc::channel::<Packet>(OUTBOUND_CAPACITY);

        // Network -> User
        let (network_tx, user_rx) = mpsc::channel(INBOUND_CAPACITY);

        let writer_peer = peer.clone();
        tokio::spawn(async move {
            while let Some(packet) = network_rx.recv().await {
                if let Err(e) = net_writer.send(packet).await {
                    warn!(peer = %writer_peer, "write failed: {e}");
                    return;
                }
            }
            if let Err(e) = net_writer.close().await {
                debug!(peer = %writer_peer, "close failed: {e}");
            }
        });

        let reader_peer = peer.clone();
        let reader = tokio::spawn(async move {
            while let Some(result) = net_reader.next().await {
                match result {
                    Ok(packet) => {
                        if network_tx.send(packet).await.is_err() {
                            // user_rx was dropped, stop reading
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(peer = %reader_peer, "read failed: {e}");
                        break;
                    }
                }
            }
            debug!(peer = %reader_peer, "reader finished");
        });

        Self {
            tx: user_tx,
            rx: user_rx,
            reader,
            peer,
        }
    }

    /// Queue a packet for the writer task, waiting for room if the queue
    /// is full.
    pub async fn send(&self, packet: Packet) -> Result<(), SwitchError> {
        self.tx.send(packet).await?;
        Ok(())
    }

    /// Next inbound packet, or `None` once the peer is gone.
    pub async fn recv(&mut self) -> Option<Packet> {
        self.rx.recv().await
    }

    pub fn sender(&self) -> ConnectionSender {
        self.tx.clone()
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
