use {
    super::*,
    dashmap::DashMap,
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    },
};

const MAGIC: [u8; 4] = *b"TBGR";
const VERSION: u8 = 1;
const MAX_PAYLOAD: u32 = 4 * 1024 * 1024;
const MAX_PEERS: usize = 16;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MsgType {
    Template,
    Heartbeat,
    BlockFound,
    ConfigSync,
    Register,
}

impl MsgType {
    fn to_byte(self) -> u8 {
        match self {
            MsgType::Template => 1,
            MsgType::Heartbeat => 2,
            MsgType::BlockFound => 3,
            MsgType::ConfigSync => 4,
            MsgType::Register => 5,
        }
    }

    fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            1 => MsgType::Template,
            2 => MsgType::Heartbeat,
            3 => MsgType::BlockFound,
            4 => MsgType::ConfigSync,
            5 => MsgType::Register,
            other => bail!("unknown relay message type {other}"),
        })
    }
}

struct Frame {
    msg_type: MsgType,
    payload: Vec<u8>,
}

impl Frame {
    fn new(msg_type: MsgType, payload: Vec<u8>) -> Self {
        Self { msg_type, payload }
    }

    async fn write<W: AsyncWriteExt + Unpin>(&self, writer: &mut W) -> Result<()> {
        ensure!(
            self.payload.len() as u32 <= MAX_PAYLOAD,
            "relay payload exceeds maximum of {MAX_PAYLOAD} bytes"
        );

        let mut length_buf = [0u8; 4];
        BigEndian::write_u32(&mut length_buf, self.payload.len() as u32);

        writer.write_all(&MAGIC).await?;
        writer.write_all(&[VERSION, self.msg_type.to_byte()]).await?;
        writer.write_all(&0u16.to_be_bytes()).await?;
        writer.write_all(&length_buf).await?;
        writer.write_all(&self.payload).await?;
        writer.flush().await?;

        Ok(())
    }

    async fn read<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Self> {
        let mut header = [0u8; 12];
        reader.read_exact(&mut header).await?;

        ensure!(header[0..4] == MAGIC, "bad relay frame magic");
        ensure!(header[4] == VERSION, "unsupported relay frame version {}", header[4]);

        let msg_type = MsgType::from_byte(header[5])?;
        let length = BigEndian::read_u32(&header[8..12]);

        ensure!(length <= MAX_PAYLOAD, "relay frame payload {length} exceeds maximum");

        let mut payload = vec![0u8; length as usize];
        reader.read_exact(&mut payload).await?;

        Ok(Self { msg_type, payload })
    }
}

/// Runs the relay primary side: accepts peer connections, pushes templates,
/// heartbeats, and receives `BLOCK_FOUND`/`REGISTER` from relays.
pub(crate) async fn spawn_primary(
    settings: Arc<Settings>,
    mut workbase_rx: watch::Receiver<Arc<BlockTemplate>>,
    cancel: CancellationToken,
    tasks: &mut JoinSet<()>,
) -> Result<()> {
    let listen = settings
        .tbg_listen()
        .context("tbg_listen is required to run as a relay primary")?;

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind relay listener on {listen}"))?;

    info!("Relay primary listening for regional relays on {listen}");

    let peers: Arc<DashMap<SocketAddr, PeerHandle>> = Arc::new(DashMap::new());

    {
        let peers = peers.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let mut interval = interval(HEARTBEAT_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    changed = workbase_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let template = workbase_rx.borrow().clone();
                        broadcast_template(&peers, &template).await;
                    }
                    _ = interval.tick() => {
                        broadcast_heartbeat(&peers).await;
                        drop_stale_peers(&peers);
                    }
                }
            }
        });
    }

    tasks.spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Shutting down relay primary listener");
                    break;
                }
                accepted = listener.accept() => {
                    let Ok((stream, addr)) = accepted else { continue };

                    if peers.len() >= MAX_PEERS {
                        warn!("Rejecting relay peer {addr} - at capacity ({MAX_PEERS})");
                        continue;
                    }

                    info!("Accepted relay peer connection from {addr}");
                    spawn_primary_peer(stream, addr, peers.clone());
                }
            }
        }
    });

    Ok(())
}

struct PeerHandle {
    tx: mpsc::Sender<Frame>,
    last_seen: Arc<Mutex<Instant>>,
    region: Arc<Mutex<String>>,
}

fn spawn_primary_peer(stream: TcpStream, addr: SocketAddr, peers: Arc<DashMap<SocketAddr, PeerHandle>>) {
    let (tx, mut rx) = mpsc::channel::<Frame>(64);
    let last_seen = Arc::new(Mutex::new(Instant::now()));
    let region = Arc::new(Mutex::new(String::new()));

    peers.insert(
        addr,
        PeerHandle {
            tx,
            last_seen: last_seen.clone(),
            region: region.clone(),
        },
    );

    tokio::spawn(async move {
        let (mut read_half, mut write_half) = stream.into_split();

        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if frame.write(&mut write_half).await.is_err() {
                    break;
                }
            }
        });

        loop {
            match Frame::read(&mut read_half).await {
                Ok(frame) => {
                    *last_seen.lock().await = Instant::now();
                    match frame.msg_type {
                        MsgType::Register => {
                            let tag = String::from_utf8_lossy(&frame.payload).to_string();
                            info!("Relay peer {addr} registered with region {tag}");
                            *region.lock().await = tag;
                        }
                        MsgType::BlockFound => {
                            info!(
                                "Relay peer {addr} reports a block found, payload: {}",
                                String::from_utf8_lossy(&frame.payload)
                            );
                        }
                        MsgType::Heartbeat => {}
                        other => {
                            debug!("Ignoring unexpected relay message {other:?} from peer {addr}");
                        }
                    }
                }
                Err(e) => {
                    warn!("Relay peer {addr} disconnected: {e}");
                    break;
                }
            }
        }

        writer.abort();
        peers.remove(&addr);
    });
}

async fn broadcast_template(peers: &DashMap<SocketAddr, PeerHandle>, template: &BlockTemplate) {
    let Ok(payload) = serde_json::to_vec(template) else {
        warn!("Failed to serialize block template for relay broadcast");
        return;
    };

    for peer in peers.iter() {
        let _ = peer
            .tx
            .send(Frame::new(MsgType::Template, payload.clone()))
            .await;
    }
}

async fn broadcast_heartbeat(peers: &DashMap<SocketAddr, PeerHandle>) {
    for peer in peers.iter() {
        let _ = peer.tx.send(Frame::new(MsgType::Heartbeat, Vec::new())).await;
    }
}

fn drop_stale_peers(peers: &DashMap<SocketAddr, PeerHandle>) {
    let stale_after = HEARTBEAT_INTERVAL * 3;
    peers.retain(|addr, peer| {
        let last_seen = *peer.last_seen.try_lock().map(|l| *l).unwrap_or_else(|_| Instant::now());
        let alive = last_seen.elapsed() < stale_after;
        if !alive {
            warn!("Dropping relay peer {addr} - silent for over {stale_after:?}");
        }
        alive
    });
}

/// Runs the relay (regional) side: connects to the primary, registers with
/// `tbg_region`, and feeds received templates into `workbase_tx`. Falls back
/// to `local_workbase_rx` (this instance's own generator) once the primary
/// has been silent for `tbg_failover_timeout`.
pub(crate) async fn spawn_relay(
    settings: Arc<Settings>,
    local_workbase_rx: watch::Receiver<Arc<BlockTemplate>>,
    cancel: CancellationToken,
    tasks: &mut JoinSet<()>,
) -> Result<watch::Receiver<Arc<BlockTemplate>>> {
    let primary_url = settings
        .tbg_primary_url()
        .context("tbg_primary_url is required to run as a relay")?
        .to_string();

    let stream = TcpStream::connect(&primary_url)
        .await
        .with_context(|| format!("failed to connect to relay primary at {primary_url}"))?;

    info!("Connected to relay primary at {primary_url}, registering as {}", settings.tbg_region());

    let (mut read_half, mut write_half) = stream.into_split();

    Frame::new(MsgType::Register, settings.tbg_region().as_bytes().to_vec())
        .write(&mut write_half)
        .await
        .context("failed to register with relay primary")?;

    let initial = local_workbase_rx.borrow().clone();
    let (workbase_tx, workbase_rx) = watch::channel(initial);

    let failover_timeout = settings.tbg_failover_timeout();
    let mut local_workbase_rx = local_workbase_rx;

    tasks.spawn(async move {
        let mut last_received = Instant::now();
        let mut independent = false;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutting down relay client");
                    break;
                }

                frame = Frame::read(&mut read_half) => {
                    match frame {
                        Ok(frame) => {
                            last_received = Instant::now();
                            match frame.msg_type {
                                MsgType::Template => {
                                    match serde_json::from_slice::<BlockTemplate>(&frame.payload) {
                                        Ok(template) => {
                                            if independent {
                                                info!("Primary template received, leaving independent mode");
                                                independent = false;
                                            }
                                            workbase_tx.send_replace(Arc::new(template));
                                        }
                                        Err(e) => warn!("Failed to decode relay template: {e}"),
                                    }
                                }
                                MsgType::Heartbeat => {}
                                other => debug!("Ignoring unexpected relay message {other:?} from primary"),
                            }
                        }
                        Err(e) => {
                            warn!("Relay connection to primary lost: {e}");
                            break;
                        }
                    }
                }

                changed = local_workbase_rx.changed(), if independent => {
                    if changed.is_ok() {
                        let template = local_workbase_rx.borrow().clone();
                        workbase_tx.send_replace(template);
                    }
                }

                _ = sleep(Duration::from_secs(1)) => {
                    if !independent && last_received.elapsed() > failover_timeout {
                        warn!(
                            "No message from relay primary in {:?}, entering independent mode",
                            failover_timeout
                        );
                        independent = true;
                        let template = local_workbase_rx.borrow().clone();
                        workbase_tx.send_replace(template);
                    }
                }
            }
        }
    });

    Ok(workbase_rx)
}
