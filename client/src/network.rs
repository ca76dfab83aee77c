use crate::mirror::Mirror;
use log::{debug, info, warn};
use shared::{BuildingKind, ClientCommand, InfraKind, Point};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

pub const PING_INTERVAL: Duration = Duration::from_secs(5);

/// Headless protocol client
///
/// Joins on connect, keeps the connection alive with `PING`, and mirrors
/// every server message into a shared [`Mirror`]. Commands are queued to a
/// writer task so sending never waits on the socket. Dropping the client
/// closes the queue, which shuts the socket down.
pub struct Client {
    player_id: String,
    name: String,
    outbound: mpsc::UnboundedSender<String>,
    mirror: Arc<Mutex<Mirror>>,
    connected: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl Client {
    /// Connects with a freshly generated player id.
    pub async fn connect(server_addr: &str, name: &str) -> io::Result<Self> {
        let player_id = uuid::Uuid::new_v4().simple().to_string();
        Self::connect_as(server_addr, &player_id, name).await
    }

    pub async fn connect_as(server_addr: &str, player_id: &str, name: &str) -> io::Result<Self> {
        Self::connect_with_ping(server_addr, player_id, name, PING_INTERVAL).await
    }

    /// Connects, sends `JOIN` and starts the reader and writer tasks.
    pub async fn connect_with_ping(
        server_addr: &str,
        player_id: &str,
        name: &str,
        ping_interval: Duration,
    ) -> io::Result<Self> {
        if player_id.contains(':') || name.contains(':') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "player id and name must not contain ':'",
            ));
        }

        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        info!("Connected to {} as {} ({})", server_addr, name, player_id);

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let mirror = Arc::new(Mutex::new(Mirror::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let writer_task = tokio::spawn(write_lines(
            writer,
            outbound_rx,
            ping_interval,
            Arc::clone(&connected),
        ));
        let reader_task = tokio::spawn(read_lines(
            reader,
            Arc::clone(&mirror),
            Arc::clone(&connected),
        ));

        let client = Client {
            player_id: player_id.to_string(),
            name: name.to_string(),
            outbound,
            mirror,
            connected,
            reader_task,
            writer_task,
        };
        client.send(ClientCommand::Join {
            id: client.player_id.clone(),
            name: client.name.clone(),
        })?;
        Ok(client)
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Copy of the mirror as it is right now
    pub async fn snapshot(&self) -> Mirror {
        self.mirror.lock().await.clone()
    }

    /// Polls the mirror until `condition` holds or `timeout` elapses.
    pub async fn wait_for<F>(&self, timeout: Duration, mut condition: F) -> bool
    where
        F: FnMut(&Mirror) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if condition(&*self.mirror.lock().await) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn send(&self, command: ClientCommand) -> io::Result<()> {
        self.outbound
            .send(command.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"))
    }

    pub fn send_cursor(&self, position: Point) -> io::Result<()> {
        self.send(ClientCommand::Cursor {
            id: self.player_id.clone(),
            position,
        })
    }

    pub fn build_infrastructure(&self, start: Point, end: Point, kind: InfraKind) -> io::Result<()> {
        self.send(ClientCommand::Infrastructure {
            id: self.player_id.clone(),
            start,
            end,
            kind,
        })
    }

    pub fn place_building(&self, position: Point, kind: BuildingKind) -> io::Result<()> {
        self.send(ClientCommand::Building {
            id: self.player_id.clone(),
            position,
            kind_code: kind.code(),
        })
    }

    pub fn create_bus_route(&self, nodes: Vec<Point>) -> io::Result<()> {
        self.send(ClientCommand::BusRoute {
            id: self.player_id.clone(),
            nodes,
        })
    }

    pub fn delete_at(&self, position: Point) -> io::Result<()> {
        self.send(ClientCommand::Delete {
            id: self.player_id.clone(),
            position,
        })
    }

    /// Flushes queued commands and closes the connection.
    pub async fn disconnect(self) {
        let Client {
            outbound,
            reader_task,
            writer_task,
            connected,
            ..
        } = self;

        drop(outbound);
        // Let the writer drain the queue and shut the socket down
        if tokio::time::timeout(Duration::from_secs(1), writer_task)
            .await
            .is_err()
        {
            warn!("Writer did not finish in time");
        }
        reader_task.abort();
        connected.store(false, Ordering::SeqCst);
        info!("Disconnected");
    }
}

/// Sends queued commands, and `PING` whenever `ping_interval` passes, until
/// the client drops its queue sender.
async fn write_lines(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<String>,
    ping_interval: Duration,
    connected: Arc<AtomicBool>,
) {
    let mut timer = interval(ping_interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip the first tick since it fires immediately
    timer.tick().await;

    loop {
        let line = tokio::select! {
            queued = outbound.recv() => match queued {
                Some(line) => line,
                None => break,
            },
            _ = timer.tick() => ClientCommand::Ping.to_string(),
        };

        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        if let Err(e) = writer.write_all(&bytes).await {
            warn!("Failed to send to server: {}", e);
            connected.store(false, Ordering::SeqCst);
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Socket shutdown failed: {}", e);
    }
}

async fn read_lines(reader: OwnedReadHalf, mirror: Arc<Mutex<Mirror>>, connected: Arc<AtomicBool>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                mirror.lock().await.apply_line(&line);
            }
            Ok(None) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                warn!("Error reading from server: {}", e);
                break;
            }
        }
    }
    debug!("Reader stopped");
    connected.store(false, Ordering::SeqCst);
}
