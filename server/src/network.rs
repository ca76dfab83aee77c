//! Server network layer: TCP accept loop, per-connection read and write tasks,
//! and the start/stop lifecycle

use crate::client_manager::ConnId;
use crate::commands;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::simulation;
use crate::state::{ServerState, SharedState};
use log::{debug, error, info, warn};
use shared::ServerMessage;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::JoinHandle;

const READ_BUFFER_SIZE: usize = 1024;
/// A partial line longer than this without a newline is discarded.
const MAX_LINE_LENGTH: usize = 64 * 1024;
/// How long teardown waits for queued output before dropping the socket.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Reassembles newline-terminated lines from arbitrary read chunks
///
/// A line may arrive split across several reads, and one read may carry
/// several lines; the residue after the last newline is kept for the next
/// chunk.
#[derive(Debug, Default)]
pub struct LineAssembler {
    residue: Vec<u8>,
}

impl LineAssembler {
    /// Appends a chunk and returns every line it completed, without the `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.residue.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.residue.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.residue.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }

        if self.residue.len() > MAX_LINE_LENGTH {
            warn!(
                "Discarding {} bytes of unterminated input",
                self.residue.len()
            );
            self.residue.clear();
        }

        lines
    }

    pub fn residue_len(&self) -> usize {
        self.residue.len()
    }
}

/// Why a connection's read loop ended
#[derive(Debug)]
pub enum CloseReason {
    PeerClosed,
    ReadError(io::Error),
    /// Closed by the server: idle timeout, id takeover or a failed write.
    Closed,
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "peer closed the connection"),
            CloseReason::ReadError(e) => write!(f, "read error: {}", e),
            CloseReason::Closed => write!(f, "closed by server"),
            CloseReason::Shutdown => write!(f, "server shutting down"),
        }
    }
}

/// Drains a connection's outbound queue into the socket, one line per message
///
/// Returns once the queue's sender is dropped, after shutting the writer down.
pub async fn write_loop<W>(mut writer: W, mut outbound: mpsc::Receiver<String>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outbound.recv().await {
        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        writer.write_all(&bytes).await?;
    }
    writer.shutdown().await
}

/// Main server owning the listener, the store and the scheduler tasks
pub struct Server {
    local_addr: SocketAddr,
    state: SharedState,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    running: bool,
}

impl Server {
    /// Binds the listener and starts accepting connections and ticking
    ///
    /// Fails on settings that fail [`ServerConfig::validate`] or if the address
    /// cannot be bound; nothing is retried.
    pub async fn start(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::bind(addr.clone(), e))?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        info!("Server listening on {}", local_addr);

        let state: SharedState = Arc::new(Mutex::new(ServerState::new(config.starting_money)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = simulation::spawn_scheduler(&state, &config, &shutdown_rx);
        tasks.push(Self::spawn_acceptor(
            listener,
            Arc::clone(&state),
            config.outbound_queue_lines,
            shutdown_rx,
        ));

        Ok(Server {
            local_addr,
            state,
            shutdown_tx,
            tasks,
            running: true,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared handle to the store, for embedding and tests
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Closes the listener and every connection
    ///
    /// Safe to call more than once. Returns after the accept loop and the
    /// scheduler tasks have exited.
    pub async fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        info!("Stopping server on {}", self.local_addr);

        {
            let mut state = self.state.lock().await;
            self.shutdown_tx.send_replace(true);
            state.clients.close_all();
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Server task ended abnormally: {}", e);
            }
        }
        info!("Server stopped");
    }

    /// Spawns task that accepts connections until shutdown
    fn spawn_acceptor(
        listener: TcpListener,
        state: SharedState,
        queue_lines: usize,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, addr)) => {
                            let state = Arc::clone(&state);
                            let shutdown = shutdown.clone();
                            tokio::spawn(handle_connection(stream, addr, state, queue_lines, shutdown));
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    },
                }
            }
            debug!("Listener closed");
        })
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.running {
            self.shutdown_tx.send_replace(true);
        }
    }
}

/// Runs one client connection from accept to teardown
///
/// Whatever ends the read loop, the player entry is removed, the remaining
/// players receive `DISCONNECT:<id>`, and both socket halves are dropped.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: SharedState,
    queue_lines: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let (mut reader, writer) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(queue_lines);
    let close = Arc::new(Notify::new());

    let conn = {
        let mut guard = state.lock().await;
        guard.clients.register(addr, outbound_tx, Arc::clone(&close))
    };
    debug!("Connection {} accepted from {}", conn, addr);

    let mut writer_task = {
        let close = Arc::clone(&close);
        tokio::spawn(async move {
            if let Err(e) = write_loop(writer, outbound_rx).await {
                warn!("Failed to write to connection {}: {}", conn, e);
                close.notify_one();
            }
        })
    };

    let reason = read_loop(&mut reader, conn, &state, &close, &mut shutdown).await;
    debug!("Connection {} from {} ending: {}", conn, addr, reason);

    {
        let mut guard = state.lock().await;
        if let Some(player_id) = guard.clients.remove_connection(conn) {
            let message = ServerMessage::Disconnect(player_id);
            guard.clients.broadcast_others(&message.to_string(), conn);
        }
    }

    // Removing the connection dropped its queue sender; let the writer flush
    if tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer_task)
        .await
        .is_err()
    {
        writer_task.abort();
    }
}

/// Reads until the peer goes away, the connection is closed by the server,
/// or the server shuts down. Each complete line is applied under the lock.
async fn read_loop<R>(
    reader: &mut R,
    conn: ConnId,
    state: &SharedState,
    close: &Notify,
    shutdown: &mut watch::Receiver<bool>,
) -> CloseReason
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut assembler = LineAssembler::default();

    if *shutdown.borrow() {
        return CloseReason::Shutdown;
    }

    loop {
        tokio::select! {
            _ = shutdown.changed() => return CloseReason::Shutdown,
            _ = close.notified() => return CloseReason::Closed,
            read = reader.read(&mut buf) => match read {
                Ok(0) => return CloseReason::PeerClosed,
                Ok(n) => {
                    for line in assembler.push(&buf[..n]) {
                        let mut guard = state.lock().await;
                        commands::handle_line(&mut guard, conn, &line);
                    }
                }
                Err(e) => return CloseReason::ReadError(e),
            },
        }
    }
}
