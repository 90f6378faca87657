use super::*;

/// The identity and running stats of an authorized connection, shared for
/// the lifetime of the session (reused across job/submit handling and
/// exposed to [`crate::metatron::Metatron`] for worker bookkeeping).
#[derive(Debug)]
#[allow(dead_code)]
pub(crate) struct Session {
    pub(crate) enonce1: Extranonce,
    pub(crate) address: Address,
    pub(crate) workername: String,
    pub(crate) username: Username,
    connected_at: Instant,
    difficulty: Mutex<Difficulty>,
    accepted: AtomicU64,
    rejected: AtomicU64,
    last_share: Mutex<Option<Instant>>,
    active: AtomicBool,
}

impl Session {
    fn new(enonce1: Extranonce, address: Address, workername: String, username: Username) -> Self {
        Self {
            enonce1,
            address,
            workername,
            username,
            connected_at: Instant::now(),
            difficulty: Mutex::new(Difficulty::default()),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            last_share: Mutex::new(None),
            active: AtomicBool::new(true),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn connected_at(&self) -> Instant {
        self.connected_at
    }

    pub(crate) fn difficulty(&self) -> Difficulty {
        *self.difficulty.lock()
    }

    pub(crate) fn set_difficulty(&self, diff: Difficulty) {
        *self.difficulty.lock() = diff;
    }

    #[allow(dead_code)]
    pub(crate) fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    #[allow(dead_code)]
    pub(crate) fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub(crate) fn last_share(&self) -> Option<Instant> {
        *self.last_share.lock()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub(crate) fn record_accepted(&self, pool_diff: Difficulty, share_diff: Difficulty) {
        let _ = share_diff;
        *self.last_share.lock() = Some(Instant::now());
        self.set_difficulty(pool_diff);
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub(crate) fn activate(&self) {
        self.active.store(true, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
pub(crate) enum State {
    Fresh {
        version_mask: Option<Version>,
    },

    Subscribed {
        enonce1: Extranonce,
        user_agent: String,
        version_mask: Option<Version>,
    },

    Working {
        enonce1: Extranonce,
        user_agent: String,
        version_mask: Option<Version>,
        session: Arc<Session>,
    },
}

impl State {
    pub(crate) fn new() -> Self {
        State::Fresh { version_mask: None }
    }

    pub(crate) fn configure(&mut self, version_mask: Version) {
        match self {
            State::Fresh {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
            State::Subscribed {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
            State::Working {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
        }
    }

    pub(crate) fn subscribe(&mut self, enonce1: Extranonce, user_agent: String) {
        let version_mask = self.version_mask();
        *self = State::Subscribed {
            enonce1,
            user_agent,
            version_mask,
        };
    }

    pub(crate) fn authorize(
        &mut self,
        address: Address,
        workername: String,
        authorized_username: Username,
    ) -> Result<(), StratumError> {
        match self {
            State::Subscribed {
                enonce1,
                user_agent,
                version_mask,
            } => {
                *self = State::Working {
                    enonce1: enonce1.clone(),
                    user_agent: user_agent.clone(),
                    version_mask: *version_mask,
                    session: Arc::new(Session::new(
                        enonce1.clone(),
                        address,
                        workername,
                        authorized_username,
                    )),
                };
                Ok(())
            }
            _ => Err(StratumError::MethodNotAllowed),
        }
    }

    pub(crate) fn version_mask(&self) -> Option<Version> {
        match self {
            State::Fresh { version_mask } => *version_mask,
            State::Subscribed { version_mask, .. } => *version_mask,
            State::Working { version_mask, .. } => *version_mask,
        }
    }

    pub(crate) fn enonce1(&self) -> Option<&Extranonce> {
        match self {
            State::Fresh { .. } => None,
            State::Subscribed { enonce1, .. } => Some(enonce1),
            State::Working { enonce1, .. } => Some(enonce1),
        }
    }

    pub(crate) fn user_agent(&self) -> Option<&str> {
        match self {
            State::Fresh { .. } => None,
            State::Subscribed { user_agent, .. } => Some(user_agent),
            State::Working { user_agent, .. } => Some(user_agent),
        }
    }

    pub(crate) fn address(&self) -> Option<&Address> {
        match self {
            State::Working { session, .. } => Some(&session.address),
            _ => None,
        }
    }

    pub(crate) fn workername(&self) -> Option<&str> {
        match self {
            State::Working { session, .. } => Some(&session.workername),
            _ => None,
        }
    }

    pub(crate) fn authorized_username(&self) -> Option<&Username> {
        match self {
            State::Working { session, .. } => Some(&session.username),
            _ => None,
        }
    }

    /// The shared session object for a working connection, cheaply cloned
    /// via its `Arc` so callers can hold it across an `await` point.
    pub(crate) fn working(&self) -> Option<Arc<Session>> {
        match self {
            State::Working { session, .. } => Some(session.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_fresh(&self) -> bool {
        matches!(self, State::Fresh { .. })
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        matches!(self, State::Subscribed { .. })
    }

    pub(crate) fn is_working(&self) -> bool {
        matches!(self, State::Working { .. })
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            State::Fresh { version_mask: None } => write!(f, "Init"),
            State::Fresh {
                version_mask: Some(_),
            } => write!(f, "Configured"),
            State::Subscribed { .. } => write!(f, "Subscribed"),
            State::Working { .. } => write!(f, "Working"),
        }
    }
}
