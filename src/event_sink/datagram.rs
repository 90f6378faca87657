use {super::*, tokio::net::UnixDatagram};

const MAX_DATAGRAM_SIZE: usize = 4096;

/// Emits events as self-contained JSON datagrams on an `AF_UNIX SOCK_DGRAM`
/// socket. Sends are non-blocking and best-effort: a missing or refusing
/// collector never backpressures the caller, matching the fire-and-forget
/// contract of the rest of the event pipeline.
pub struct DatagramSink {
    socket: UnixDatagram,
    target: PathBuf,
    region: String,
}

impl DatagramSink {
    pub async fn connect(target: PathBuf, region: String) -> Result<Self> {
        let socket = UnixDatagram::unbound().context("failed to create event datagram socket")?;
        Ok(Self {
            socket,
            target,
            region,
        })
    }

    fn envelope(&self, name: &str, ts: f64, data: Value) -> Value {
        json!({
            "event": name,
            "ts": ts,
            "source": "hosted",
            "region": self.region,
            "data": data,
        })
    }

    fn send(&self, payload: &[u8]) {
        if payload.len() > MAX_DATAGRAM_SIZE {
            warn!("event_socket: dropping oversized datagram ({} bytes)", payload.len());
            return;
        }

        match self.socket.try_send_to(payload, &self.target) {
            Ok(_) => {}
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock) => {}
            Err(e) => {
                debug!("event_socket: dropping datagram, send failed: {e}");
            }
        }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[async_trait]
impl super::EventSink for DatagramSink {
    async fn record(&mut self, event: Event) -> Result<u64> {
        let ts = now_secs();

        let envelope = match event {
            Event::Share(s) => self.envelope(
                "share_submitted",
                ts,
                json!({
                    "user": s.address,
                    "worker": s.workername,
                    "diff": s.pool_diff,
                    "sdiff": s.share_diff,
                    "accepted": s.result,
                }),
            ),
            Event::BlockFound(b) => self.envelope(
                "block_found",
                ts,
                json!({
                    "user": b.address,
                    "worker": b.workername,
                    "height": b.blockheight,
                    "diff": b.diff,
                    "network_diff": b.diff,
                }),
            ),
        };

        let payload = serde_json::to_vec(&envelope)?;
        self.send(&payload);

        Ok(1)
    }
}
