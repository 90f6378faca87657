use {
    bitcoin::block::Header,
    command_builder::CommandBuilder,
    lodestone::{
        USER_AGENT,
        stratum::{
            self, ClientError, Difficulty, Extranonce, JobId, Nonce, Notify, Ntime, StratumError,
            Version,
        },
    },
    ntest::timeout,
    serial_test::serial,
    std::{
        collections::BTreeMap,
        ffi::{OsStr, OsString},
        fs,
        io::{self, Write},
        net::{TcpListener, TcpStream},
        path::{Path, PathBuf},
        process::{Child, Command, Stdio},
        str::FromStr,
        sync::Arc,
        thread,
        time::Duration,
    },
    tempfile::TempDir,
    test_pool::TestPool,
    test_proxy::TestProxy,
    to_args::ToArgs,
    tokio::time::timeout,
};

mod bitcoind;
mod command_builder;
mod to_args;

mod ping;
mod pool;
mod proxy;
mod test_pool;
mod test_proxy;

#[cfg(all(target_os = "linux", feature = "ping-tests"))]
use test_ckpool::TestCkpool;

pub(crate) fn signet_username() -> String {
    "tb1qkrrl75qekv9ree0g2qt49j8vdynsvlc4kuctrc.tick.abcdef@lnurl.com".to_string()
}

pub(crate) fn solve_share(
    notify: &stratum::Notify,
    extranonce1: &Extranonce,
    extranonce2: &Extranonce,
    difficulty: stratum::Difficulty,
) -> (Ntime, Nonce) {
    let merkle_root = stratum::merkle_root(
        &notify.coinb1,
        &notify.coinb2,
        extranonce1,
        extranonce2,
        &notify.merkle_branches,
    )
    .unwrap();

    let mut header = Header {
        version: bitcoin::block::Version::from_consensus(notify.version.0.to_consensus()),
        prev_blockhash: notify.prevhash.clone().into(),
        merkle_root: merkle_root.into(),
        time: u32::from(notify.ntime),
        bits: bitcoin::CompactTarget::from(notify.nbits),
        nonce: 0,
    };

    let target = difficulty.to_target();

    loop {
        let hash = header.block_hash();
        if target.is_met_by(hash) {
            return (Ntime::from(header.time), Nonce::from(header.nonce));
        }
        header.nonce += 1;
        if header.nonce == 0 {
            panic!(
                "Nonce wrapped around without finding share at diff {}",
                difficulty
            );
        }
    }
}

pub(crate) async fn wait_for_notify(
    events: &mut stratum::EventReceiver,
) -> (Notify, Difficulty) {
    let mut difficulty = Difficulty::from(1.0);

    timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await.unwrap() {
                stratum::Event::SetDifficulty(diff) => difficulty = diff,
                stratum::Event::Notify(notify) => return (notify, difficulty),
                _ => {}
            }
        }
    })
    .await
    .expect("Timeout waiting for notify")
}

pub(crate) fn assert_stratum_error<T: std::fmt::Debug>(
    result: Result<T, ClientError>,
    error: StratumError,
) {
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains(&error.response().to_string()),
        "expected {error:?} rejection"
    );
}
