use {
    super::*,
    crate::{
        api::{PoolStats, SessionSummary, UserDetail, UserSummary, WorkerSummary},
        stratifier::SessionSnapshot,
    },
    dashmap::DashMap,
    parking_lot::Mutex,
};

const SESSION_TTL: Duration = Duration::from_secs(600);

pub(crate) struct Metatron {
    extranonces: Extranonces,
    next_enonce1: Mutex<Extranonce>,
    blocks: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    started: Instant,
    connections: AtomicU64,
    users: DashMap<Address<bitcoin::address::NetworkUnchecked>, Arc<UserStats>>,
    sessions: DashMap<Extranonce, SessionSnapshot>,
}

impl Metatron {
    pub(crate) fn new(extranonces: Extranonces) -> Self {
        let seed = Extranonce::generate(extranonces.enonce1_size());

        Self {
            extranonces,
            next_enonce1: Mutex::new(seed),
            blocks: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            started: Instant::now(),
            connections: AtomicU64::new(0),
            users: DashMap::new(),
            sessions: DashMap::new(),
        }
    }

    /// Spawns the background sweep that prunes expired resumable sessions.
    pub(crate) fn spawn(self: Arc<Self>, cancel_token: CancellationToken, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = sleep(SESSION_TTL) => {
                        self.sessions.retain(|_, snapshot| !snapshot.is_expired(SESSION_TTL));
                    }
                }
            }
        });
    }

    pub(crate) fn extranonces(&self) -> &Extranonces {
        &self.extranonces
    }

    pub(crate) fn enonce2_size(&self) -> usize {
        self.extranonces.enonce2_size()
    }

    /// Allocates the next pool-unique enonce1, wrapping a shared counter.
    pub(crate) fn next_enonce1(&self) -> Extranonce {
        let mut next = self.next_enonce1.lock();
        let allocated = next.clone();
        next.increment_wrapping();
        allocated
    }

    pub(crate) fn take_session(&self, enonce1: &Extranonce) -> Option<SessionSnapshot> {
        self.sessions
            .remove(enonce1)
            .map(|(_, snapshot)| snapshot)
            .filter(|snapshot| !snapshot.is_expired(SESSION_TTL))
    }

    pub(crate) fn store_session(&self, snapshot: SessionSnapshot) {
        self.sessions.insert(snapshot.enonce1.clone(), snapshot);
    }

    pub(crate) fn get_or_create_worker(
        &self,
        address: Address<bitcoin::address::NetworkUnchecked>,
        workername: &str,
    ) -> Arc<WorkerStats> {
        let user = self
            .users
            .entry(address.clone())
            .or_insert_with(|| Arc::new(UserStats::new(address)))
            .clone();

        user.get_or_create_worker(workername)
    }

    pub(crate) fn record_share(
        &self,
        address: &Address<bitcoin::address::NetworkUnchecked>,
        workername: &str,
        difficulty: f64,
    ) {
        if let Some(user) = self.users.get(address) {
            let worker = user.get_or_create_worker(workername);
            worker.record_share(difficulty);
        }
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_block(&self) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sub_connection(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn hash_rate_1m(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_1m())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn hash_rate_5m(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_5m())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn hash_rate_1h(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_1h())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn hash_rate_1d(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_1d())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn hash_rate_7d(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_7d())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn sps_1m(&self) -> f64 {
        self.total_shares() as f64 / 60.0
    }

    pub(crate) fn total_blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub(crate) fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub(crate) fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub(crate) fn total_connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub(crate) fn total_users(&self) -> usize {
        self.users.len()
    }

    pub(crate) fn total_workers(&self) -> usize {
        self.users.iter().map(|u| u.worker_count()).sum()
    }

    pub(crate) fn total_shares(&self) -> u64 {
        self.users.iter().map(|u| u.total_shares()).sum()
    }

    pub(crate) fn best_ever(&self) -> f64 {
        self.users.iter().map(|u| u.best_ever()).fold(0.0, f64::max)
    }

    pub(crate) fn last_share_timestamp(&self) -> Option<u64> {
        self.users.iter().filter_map(|u| u.last_share_timestamp()).max()
    }

    pub(crate) fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn get_user(
        &self,
        address: &Address<bitcoin::address::NetworkUnchecked>,
    ) -> Option<Arc<UserStats>> {
        self.users.get(address).map(|r| r.value().clone())
    }

    pub(crate) fn user_stats(&self) -> Vec<Arc<UserStats>> {
        self.users.iter().map(|r| r.value().clone()).collect()
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            hash_rate_1m: self.hash_rate_1m(),
            sps_1m: self.sps_1m(),
            users: self.total_users(),
            workers: self.total_workers(),
            connections: self.total_connections(),
            accepted: self.accepted(),
            rejected: self.rejected(),
            blocks: self.total_blocks(),
            best_ever: self.best_ever(),
            last_share: self.last_share_timestamp(),
            uptime_secs: self.uptime().as_secs(),
            sessions: self.sessions.len(),
            active_sessions: self.total_connections() as usize,
        }
    }

    pub(crate) fn users(&self) -> Vec<UserSummary> {
        self.users
            .iter()
            .map(|r| {
                let user = r.value();
                UserSummary {
                    address: user.address.to_string(),
                    hash_rate: user.hash_rate_5m(),
                    shares_per_second: user.total_shares() as f64
                        / self.uptime().as_secs_f64().max(1.0),
                    workers: user.worker_count(),
                    accepted: user.total_accepted(),
                    rejected: user.total_rejected(),
                    best_ever: user.best_ever(),
                }
            })
            .collect()
    }

    pub(crate) fn user(&self, address: &Address) -> Option<UserDetail> {
        let unchecked = address.as_unchecked().clone();

        self.users.get(&unchecked).map(|r| {
            let user = r.value();
            UserDetail {
                address: user.address.to_string(),
                hash_rate: user.hash_rate_5m(),
                shares_per_second: user.total_shares() as f64
                    / self.uptime().as_secs_f64().max(1.0),
                accepted: user.total_accepted(),
                rejected: user.total_rejected(),
                best_ever: user.best_ever(),
                authorized: user.authorized_timestamp(),
                workers: user
                    .workers()
                    .into_iter()
                    .map(|worker| WorkerSummary {
                        name: worker.workername.clone(),
                        hash_rate: worker.hash_rate_5m(),
                        shares_per_second: worker.shares() as f64
                            / self.uptime().as_secs_f64().max(1.0),
                        accepted: worker.accepted(),
                        rejected: worker.rejected(),
                        best_ever: worker.best_ever(),
                    })
                    .collect(),
            }
        })
    }

    pub(crate) fn sessions(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .map(|r| {
                let snapshot = r.value();
                SessionSummary {
                    enonce1: snapshot.enonce1.to_string(),
                    address: snapshot.address.to_string(),
                    workername: snapshot.workername.clone(),
                    created_at_secs: self.uptime().as_secs(),
                    ttl_remaining_secs: SESSION_TTL.as_secs(),
                }
            })
            .collect()
    }
}

impl StatusLine for Metatron {
    fn status_line(&self) -> String {
        format!(
            "hr_5m={}  users={}  workers={}  conns={}  accepted={}  rejected={}  blocks={}  uptime={}s",
            self.hash_rate_5m(),
            self.total_users(),
            self.total_workers(),
            self.total_connections(),
            self.accepted(),
            self.rejected(),
            self.total_blocks(),
            self.uptime().as_secs()
        )
    }
}
