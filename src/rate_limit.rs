use {super::*, dashmap::DashMap};

const GC_INTERVAL: Duration = Duration::from_secs(60);
const BUCKET_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Allow,
    SoftBanned,
    RateLimited,
    AtCapacity,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
    banned_until: Option<Instant>,
}

impl Bucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
            banned_until: None,
        }
    }

    fn refill(&mut self, capacity: f64, refill_per_sec: f64, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity);
        self.last_refill = now;
    }
}

/// Per-IP connection-rate limiter: a token bucket gates new connections per
/// minute, exceeding it soft-bans the IP for a configured duration, and a
/// global counter enforces `maxclients` regardless of per-IP state.
pub(crate) struct RateLimiter {
    buckets: DashMap<IpAddr, Bucket>,
    connected: AtomicU64,
    capacity: f64,
    refill_per_sec: f64,
    soft_ban: Duration,
    maxclients: usize,
}

impl RateLimiter {
    pub(crate) fn new(new_connections_per_minute: u32, soft_ban: Duration, maxclients: usize) -> Self {
        let capacity = new_connections_per_minute.max(1) as f64;
        Self {
            buckets: DashMap::new(),
            connected: AtomicU64::new(0),
            capacity,
            refill_per_sec: capacity / 60.0,
            soft_ban,
            maxclients,
        }
    }

    /// Checks whether a new connection from `ip` should be admitted,
    /// consuming a token if so.
    pub(crate) fn check(&self, ip: IpAddr) -> Admission {
        if self.connected.load(Ordering::Relaxed) as usize >= self.maxclients {
            return Admission::AtCapacity;
        }

        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(ip)
            .or_insert_with(|| Bucket::new(self.capacity));

        if let Some(banned_until) = bucket.banned_until {
            if now < banned_until {
                return Admission::SoftBanned;
            }
            bucket.banned_until = None;
        }

        bucket.refill(self.capacity, self.refill_per_sec, now);

        if bucket.tokens < 1.0 {
            bucket.banned_until = Some(now + self.soft_ban);
            return Admission::RateLimited;
        }

        bucket.tokens -= 1.0;
        Admission::Allow
    }

    pub(crate) fn connection_opened(&self) {
        self.connected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        self.connected.fetch_sub(1, Ordering::Relaxed);
    }

    /// Spawns a background task that evicts idle, non-banned buckets.
    /// A bucket whose soft-ban has not yet expired is never evicted, even
    /// if otherwise idle, so the ban cannot be bypassed by reconnecting
    /// after the bucket is garbage collected.
    pub(crate) fn spawn_gc(self: Arc<Self>, cancel: CancellationToken, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            let mut interval = interval(GC_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => self.gc(),
                }
            }
        });
    }

    fn gc(&self) {
        let now = Instant::now();
        let before = self.buckets.len();

        self.buckets.retain(|_, bucket| {
            if let Some(banned_until) = bucket.banned_until {
                if now < banned_until {
                    return true;
                }
            }
            now.duration_since(bucket.last_refill) < BUCKET_IDLE_TIMEOUT
        });

        let evicted = before - self.buckets.len();
        if evicted > 0 {
            debug!("rate_limit: GC evicted {evicted} idle bucket(s)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(n: u8) -> IpAddr {
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, n))
    }

    #[test]
    fn allows_up_to_capacity() {
        let limiter = RateLimiter::new(3, Duration::from_secs(300), 100);
        let addr = ip(1);
        assert_eq!(limiter.check(addr), Admission::Allow);
        assert_eq!(limiter.check(addr), Admission::Allow);
        assert_eq!(limiter.check(addr), Admission::Allow);
        assert_eq!(limiter.check(addr), Admission::RateLimited);
    }

    #[test]
    fn soft_bans_after_rate_limit() {
        let limiter = RateLimiter::new(1, Duration::from_secs(300), 100);
        let addr = ip(2);
        assert_eq!(limiter.check(addr), Admission::Allow);
        assert_eq!(limiter.check(addr), Admission::RateLimited);
        assert_eq!(limiter.check(addr), Admission::SoftBanned);
    }

    #[test]
    fn different_ips_tracked_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(300), 100);
        assert_eq!(limiter.check(ip(3)), Admission::Allow);
        assert_eq!(limiter.check(ip(4)), Admission::Allow);
    }

    #[test]
    fn enforces_global_maxclients_regardless_of_bucket_state() {
        let limiter = RateLimiter::new(10, Duration::from_secs(300), 1);
        limiter.connection_opened();
        assert_eq!(limiter.check(ip(5)), Admission::AtCapacity);
    }

    #[test]
    fn gc_skips_non_expired_soft_bans() {
        let limiter = RateLimiter::new(1, Duration::from_secs(300), 100);
        let addr = ip(6);
        limiter.check(addr);
        limiter.check(addr);
        assert_eq!(limiter.buckets.len(), 1);
        limiter.gc();
        assert_eq!(
            limiter.buckets.len(),
            1,
            "soft-banned bucket must survive GC even though idle"
        );
    }
}
