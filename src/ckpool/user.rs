use super::*;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct User {
    pub hashrate1m: HashRate,
    pub hashrate5m: HashRate,
    pub hashrate15m: HashRate,
    pub hashrate1hr: HashRate,
    pub hashrate6hr: HashRate,
    pub hashrate1d: HashRate,
    pub hashrate7d: HashRate,
    pub lastshare: u64,
    pub workers: u64,
    pub shares: u64,
    pub bestshare: f64,
    pub bestever: f64,
    pub worker: Vec<Worker>,
}

impl Add for User {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut worker = self.worker;
        worker.extend(rhs.worker);

        Self {
            hashrate1m: self.hashrate1m + rhs.hashrate1m,
            hashrate5m: self.hashrate5m + rhs.hashrate5m,
            hashrate15m: self.hashrate15m + rhs.hashrate15m,
            hashrate1hr: self.hashrate1hr + rhs.hashrate1hr,
            hashrate6hr: self.hashrate6hr + rhs.hashrate6hr,
            hashrate1d: self.hashrate1d + rhs.hashrate1d,
            hashrate7d: self.hashrate7d + rhs.hashrate7d,
            lastshare: self.lastshare.max(rhs.lastshare),
            workers: self.workers + rhs.workers,
            shares: self.shares + rhs.shares,
            bestshare: self.bestshare.max(rhs.bestshare),
            bestever: self.bestever.max(rhs.bestever),
            worker,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Worker {
    pub workername: String,
    pub hashrate1m: HashRate,
    pub hashrate5m: HashRate,
    pub hashrate15m: HashRate,
    pub hashrate1hr: HashRate,
    pub hashrate6hr: HashRate,
    pub hashrate1d: HashRate,
    pub hashrate7d: HashRate,
    pub lastshare: u64,
    pub shares: u64,
    pub bestshare: f64,
    pub bestever: f64,
}
