use super::*;

pub use user::{User, Worker};

mod user;

#[derive(Debug, DeserializeFromStr, SerializeDisplay, PartialEq, Clone, Copy)]
pub struct Status {
    pub pool: PoolStatus,
    pub hash_rates: HashRateStatus,
    pub shares: ShareStatus,
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines();
        let pool =
            serde_json::from_str(lines.next().ok_or_else(|| anyhow!("Missing PoolStatus"))?)?;

        let hash_rates = serde_json::from_str(
            lines
                .next()
                .ok_or_else(|| anyhow!("Missing HashRateStatus"))?,
        )?;

        let shares =
            serde_json::from_str(lines.next().ok_or_else(|| anyhow!("Missing ShareStatus"))?)?;

        Ok(Status {
            pool,
            hash_rates,
            shares,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}",
            serde_json::to_string(&self.pool).map_err(|_| fmt::Error)?
        )?;
        writeln!(
            f,
            "{}",
            serde_json::to_string(&self.hash_rates).map_err(|_| fmt::Error)?
        )?;
        writeln!(
            f,
            "{}",
            serde_json::to_string(&self.shares).map_err(|_| fmt::Error)?
        )?;
        Ok(())
    }
}

impl Add for Status {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            pool: self.pool + rhs.pool,
            hash_rates: self.hash_rates + rhs.hash_rates,
            shares: self.shares + rhs.shares,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Copy, Clone)]
pub struct PoolStatus {
    pub runtime: u64,
    pub lastupdate: u64,
    #[serde(rename = "Users")]
    pub users: u64,
    #[serde(rename = "Workers")]
    pub workers: u64,
    #[serde(rename = "Idle")]
    pub idle: u64,
    #[serde(rename = "Disconnected")]
    pub disconnected: u64,
}

impl Add for PoolStatus {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            runtime: self.runtime.max(rhs.runtime),
            lastupdate: self.lastupdate.max(rhs.lastupdate),
            users: self.users + rhs.users,
            workers: self.workers + rhs.workers,
            idle: self.idle + rhs.idle,
            disconnected: self.disconnected + rhs.disconnected,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct HashRateStatus {
    pub hashrate1m: HashRate,
    pub hashrate5m: HashRate,
    pub hashrate15m: HashRate,
    pub hashrate1hr: HashRate,
    pub hashrate6hr: HashRate,
    pub hashrate1d: HashRate,
    pub hashrate7d: HashRate,
}

impl Add for HashRateStatus {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hashrate1m: self.hashrate1m + rhs.hashrate1m,
            hashrate5m: self.hashrate5m + rhs.hashrate5m,
            hashrate15m: self.hashrate15m + rhs.hashrate15m,
            hashrate1hr: self.hashrate1hr + rhs.hashrate1hr,
            hashrate6hr: self.hashrate6hr + rhs.hashrate6hr,
            hashrate1d: self.hashrate1d + rhs.hashrate1d,
            hashrate7d: self.hashrate7d + rhs.hashrate7d,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct ShareStatus {
    pub diff: f64,
    pub accepted: u64,
    pub rejected: u64,
    pub bestshare: u64,
    #[serde(rename = "SPS1m")]
    pub sps1m: f64,
    #[serde(rename = "SPS5m")]
    pub sps5m: f64,
    #[serde(rename = "SPS15m")]
    pub sps15m: f64,
    #[serde(rename = "SPS1h")]
    pub sps1h: f64,
}

impl Add for ShareStatus {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            diff: self.diff + rhs.diff,
            accepted: self.accepted + rhs.accepted,
            rejected: self.rejected + rhs.rejected,
            bestshare: self.bestshare.max(rhs.bestshare),
            sps1m: self.sps1m + rhs.sps1m,
            sps5m: self.sps5m + rhs.sps5m,
            sps15m: self.sps15m + rhs.sps15m,
            sps1h: self.sps1h + rhs.sps1h,
        }
    }
}
