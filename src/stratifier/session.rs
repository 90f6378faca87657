use super::*;

#[derive(Debug, Clone)]
pub(crate) struct SessionSnapshot {
    pub(crate) enonce1: Extranonce,
    pub(crate) address: Address,
    pub(crate) workername: String,
    stored_at: Instant,
}

impl SessionSnapshot {
    pub(crate) fn new(enonce1: Extranonce, address: Address, workername: String) -> Self {
        Self {
            enonce1,
            address,
            workername,
            stored_at: Instant::now(),
        }
    }

    pub(crate) fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}
