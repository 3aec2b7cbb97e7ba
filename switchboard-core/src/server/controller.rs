use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::SwitchError;
use crate::message::MessageType;
use crate::network::{Connection, Endpoint, Listener};
use crate::packet::Packet;
use crate::protocol::ControllerEvent;
use crate::server::broadcast::Broadcaster;
use crate::server::dispatch::DispatchTable;
use crate::server::media::{CallContext, MediaServer};

/// Pause after a failed accept so a persistent error (descriptor
/// exhaustion, say) does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The control-plane server.
///
/// Owns the listening endpoint, accepts connections, answers calls through
/// a [`DispatchTable`] and broadcasts events to every live connection.
#[derive(Debug)]
pub struct Controller {
    endpoint: Endpoint,
    broadcaster: Broadcaster,
    shutdown: CancellationToken,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    active: Arc<AtomicBool>,
}

impl Controller {
    /// Bind `endpoint` and start accepting. A bind failure is returned as is;
    /// there is no retry.
    pub async fn start(
        endpoint: &Endpoint,
        media: Arc<dyn MediaServer>,
    ) -> Result<Self, SwitchError> {
        Self::start_with(endpoint, media, Broadcaster::new()).await
    }

    /// Like [`start`](Self::start), fanning events out through an existing
    /// broadcaster. Use this when `media` needs to emit events itself.
    pub async fn start_with(
        endpoint: &Endpoint,
        media: Arc<dyn MediaServer>,
        broadcaster: Broadcaster,
    ) -> Result<Self, SwitchError> {
        let listener = Listener::bind(endpoint).await?;
        let local = listener.local_endpoint()?;
        let table = Arc::new(DispatchTable::new());
        let shutdown = CancellationToken::new();
        let active = Arc::new(AtomicBool::new(true));

        info!(endpoint = %local, methods = table.len(), "controller listening");

        let accept_task = tokio::spawn(accept_loop(
            listener,
            table,
            media,
            broadcaster.clone(),
            shutdown.clone(),
        ));

        Ok(Self {
            endpoint: local,
            broadcaster,
            shutdown,
            accept_task: Mutex::new(Some(accept_task)),
            active,
        })
    }

    /// The address actually bound (resolves port 0).
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn connection_count(&self) -> usize {
        self.broadcaster.connection_count()
    }

    /// `false` once [`shutdown`](Self::shutdown) has returned.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Handle for emitting events from outside a handler.
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn emit(&self, event: &ControllerEvent) -> usize {
        self.broadcaster.emit(event)
    }

    /// Stop accepting, close every live connection and release the
    /// listener. When this returns no new connection can arrive.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("accept loop ended abnormally: {e}");
            }
        }
        let dropped = self.broadcaster.close_all();
        if dropped > 0 {
            debug!(dropped, "closed remaining connections");
        }
        self.active.store(false, Ordering::Release);
        info!(endpoint = %self.endpoint, "controller stopped");
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    listener: Listener,
    table: Arc<DispatchTable>,
    media: Arc<dyn MediaServer>,
    hub: Broadcaster,
    shutdown: CancellationToken,
) {
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            accepted = listener.accept() => match accepted {
                Ok(conn) => {
                    let id = hub.register(conn.peer(), conn.sender());
                    info!(conn = id, peer = conn.peer(), "client connected");
                    sessions.spawn(serve_connection(
                        conn,
                        id,
                        table.clone(),
                        media.clone(),
                        hub.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(e) => {
                    warn!("accept failed: {e}");
                    if !backoff(&shutdown).await {
                        break;
                    }
                }
            },
        }
    }

    // Release the endpoint before waiting on sessions.
    drop(listener);
    while sessions.join_next().await.is_some() {}
}

async fn serve_connection(
    mut conn: Connection,
    id: u64,
    table: Arc<DispatchTable>,
    media: Arc<dyn MediaServer>,
    hub: Broadcaster,
    shutdown: CancellationToken,
) {
    let tx = conn.sender();
    let ctx = CallContext {
        connection_id: id,
        peer: conn.peer().to_string(),
    };

    loop {
        let packet = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = conn.recv() => match next {
                Some(packet) => packet,
                None => break,
            },
        };

        if packet.message_type() != MessageType::Call {
            warn!(
                conn = id,
                kind = %packet.message_type(),
                member = packet.member(),
                "protocol violation: ignoring non-call frame"
            );
            continue;
        }

        let member = packet.member().to_string();
        let answer = {
            let table = table.clone();
            let media = media.clone();
            let ctx = ctx.clone();
            // Media servers may block; keep them off the runtime workers.
            tokio::task::spawn_blocking(move || {
                answer_call(&table, media.as_ref(), &ctx, &packet)
            })
            .await
        };
        let answer = match answer {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                error!(conn = id, %member, "cannot build answer: {e}");
                continue;
            }
            Err(e) => {
                error!(conn = id, %member, "handler task failed: {e}");
                continue;
            }
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            sent = tx.send(answer) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    hub.unregister(id);
    info!(conn = id, peer = %ctx.peer, "client disconnected");
}

/// Wait out [`ACCEPT_BACKOFF`]. Returns `false` if shutdown began first.
async fn backoff(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

/// Build the Reply or Error frame for one call.
fn answer_call(
    table: &DispatchTable,
    media: &dyn MediaServer,
    ctx: &CallContext,
    call: &Packet,
) -> Result<Packet, SwitchError> {
    let serial = call.serial();
    let method = call.member();

    let result = table
        .dispatch(media, ctx, method, call.body())
        .and_then(|body| Packet::reply(serial, method, body));

    match result {
        Ok(reply) => Ok(reply),
        Err(e) => {
            warn!(conn = ctx.connection_id, %method, "call failed: {e}");
            Packet::error(serial, method, &e.to_string())
        }
    }
}
