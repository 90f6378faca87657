use {
    super::*,
    redis::{AsyncCommands, aio::ConnectionManager},
};

const USER_COINBASE_PREFIX: &str = "user_coinbase:";
const VARDIFF_PREFIX: &str = "vardiff:";
const VARDIFF_TTL_SECS: u64 = 2_592_000; // 30 days

const USER_SIG_MIN_LEN: usize = 1;
const USER_SIG_MAX_LEN: usize = 20;

fn valid_sig_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-.:!#/ ".contains(c)
}

fn valid_user_sig(sig: &str) -> bool {
    (USER_SIG_MIN_LEN..=USER_SIG_MAX_LEN).contains(&sig.len()) && sig.chars().all(valid_sig_char)
}

/// Redis-backed lookup for per-user pool customization: the coinbase
/// signature appended after the pool signature, and the last-known vardiff
/// difficulty a worker should reconnect at.
///
/// Reads degrade gracefully: any Redis error is logged and treated as a
/// cache miss so a store outage falls back to the pool signature only /
/// `start_diff` only, rather than failing the connection.
pub(crate) struct KvCache {
    manager: ConnectionManager,
}

impl KvCache {
    pub(crate) async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("invalid redis URL")?;
        let manager = client
            .get_connection_manager()
            .await
            .context("failed to connect to redis")?;
        Ok(Self { manager })
    }

    pub(crate) async fn user_coinbase_sig(&self, address: &str) -> Option<String> {
        let mut conn = self.manager.clone();

        let sig: Option<String> = match conn
            .get(format!("{USER_COINBASE_PREFIX}{address}"))
            .await
        {
            Ok(sig) => sig,
            Err(e) => {
                warn!("kv_cache: failed to fetch user coinbase sig for {address}: {e}");
                return None;
            }
        };

        match sig {
            Some(sig) if valid_user_sig(&sig) => Some(sig),
            Some(sig) => {
                warn!("kv_cache: rejecting invalid user coinbase sig for {address}: {sig:?}");
                None
            }
            None => None,
        }
    }

    pub(crate) async fn reconnect_diff(&self, workername: &str) -> Option<Difficulty> {
        let mut conn = self.manager.clone();

        let raw: Option<f64> = match conn.get(format!("{VARDIFF_PREFIX}{workername}")).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("kv_cache: failed to fetch reconnect diff for {workername}: {e}");
                return None;
            }
        };

        raw.map(Difficulty::from)
    }

    pub(crate) async fn set_reconnect_diff(&self, workername: &str, diff: Difficulty) {
        let mut conn = self.manager.clone();

        let result: redis::RedisResult<()> = conn
            .set_ex(
                format!("{VARDIFF_PREFIX}{workername}"),
                diff.as_f64(),
                VARDIFF_TTL_SECS,
            )
            .await;

        if let Err(e) = result {
            warn!("kv_cache: failed to persist reconnect diff for {workername}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_signatures() {
        assert!(valid_user_sig("a"));
        assert!(valid_user_sig("rig-01_warehouse.2"));
        assert!(valid_user_sig(&"x".repeat(20)));
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        assert!(!valid_user_sig(""));
        assert!(!valid_user_sig(&"x".repeat(21)));
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(!valid_user_sig("rig\n01"));
        assert!(!valid_user_sig("<script>"));
        assert!(!valid_user_sig("emoji😀"));
    }
}
