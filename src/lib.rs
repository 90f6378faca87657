#![allow(clippy::too_many_arguments)]
use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::Arguments,
    axum::{
        Extension, Router,
        extract::{DefaultBodyLimit, Json},
        http::{
            self, HeaderValue, StatusCode,
            header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        },
        response::{IntoResponse, Response},
        routing::{MethodRouter, get, post},
    },
    axum_server::Handle,
    bitcoin::{
        Address, Amount, BlockHash, CompactTarget, Network, OutPoint, ScriptBuf, Sequence, Target,
        Transaction, TxIn, TxMerkleNode, TxOut, Txid, Witness,
        address::NetworkUnchecked,
        block::{self, Header},
        consensus::{self, Decodable, Encodable},
        hashes::{Hash, sha256d},
        locktime::absolute::LockTime,
        script::write_scriptint,
    },
    bitcoincore_rpc::Auth,
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    chain::Chain,
    clap::Parser,
    coinbase_builder::CoinbaseBuilder,
    derive_more::Display,
    futures::stream::StreamExt,
    hash_rate::HashRate,
    hex::FromHex,
    lazy_static::lazy_static,
    rand::Rng,
    reqwest::Url,
    rustls_acme::{
        AcmeConfig,
        acme::{LETS_ENCRYPT_PRODUCTION_DIRECTORY, LETS_ENCRYPT_STAGING_DIRECTORY},
        axum::AxumAcceptor,
        caches::DirCache,
    },
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::{Value, json},
    serde_with::{DeserializeFromStr, SerializeDisplay},
    sqlx::{Pool, Postgres, postgres::PgPoolOptions},
    std::{
        collections::{BTreeMap, HashMap},
        env,
        fmt::{self, Display, Formatter},
        fs, io,
        net::{IpAddr, SocketAddr, ToSocketAddrs},
        ops::{Add, BitAnd, BitOr, BitXor, Not},
        path::{Path, PathBuf},
        process,
        str::FromStr,
        sync::{
            Arc, LazyLock,
            atomic::{AtomicBool, AtomicU64, Ordering},
        },
        thread,
        time::{Duration, Instant, SystemTime, UNIX_EPOCH},
    },
    stratum::{
        Authorize, Configure, Difficulty, Event, Extranonce, Id, JobId, Message, Nbits, Nonce,
        Notify, Ntime, PrevHash, SetDifficulty, StratumError, Submit, Subscribe, SubscribeResult,
        Username, Version,
    },
    sysinfo::{Disks, System},
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter},
        net::{TcpListener, TcpStream, tcp::OwnedWriteHalf},
        runtime::Runtime,
        signal::ctrl_c,
        sync::{Mutex, mpsc, oneshot, watch},
        task::{self, JoinHandle, JoinSet},
        time::{MissedTickBehavior, interval, sleep, timeout},
    },
    tokio_util::sync::CancellationToken,
    tower_http::{
        services::ServeDir, set_header::SetResponseHeaderLayer,
        validate_request::ValidateRequestHeaderLayer,
    },
    tracing::{debug, error, info, warn},
    tracing_subscriber::EnvFilter,
    zeromq::{Socket, SocketRecv, SubSocket},
};

pub mod api;
mod arguments;
mod argus;
mod block_template;
mod chain;
pub mod ckpool;
pub mod coinbase_builder;
mod event_sink;
mod extranonces;
mod generator;
pub mod hash_rate;
mod http_server;
mod job;
mod jobs;
mod kv_cache;
mod logs;
mod metatron;
mod metrics;
mod mode;
mod nexus;
mod rate_limit;
mod relay;
mod settings;
mod share;
mod si;
mod signal;
mod source;
pub mod stats;
pub mod stratifier;
pub mod subcommand;
mod system_utils;
mod throbber;
mod upstream;
mod vardiff;
mod workbase;
mod zmq;

pub(crate) use {
    argus::Argus,
    block_template::BlockTemplate,
    extranonces::Extranonces,
    generator::{Generator, spawn_generator},
    jobs::Jobs,
    logs::{integration_test, logs_enabled},
    metatron::Metatron,
    metrics::Metrics,
    mode::Mode,
    nexus::Nexus,
    settings::Settings,
    share::Share,
    source::Source,
    stats::{UserStats, WorkerStats},
    throbber::{StatusLine, spawn_throbber},
    upstream::Upstream,
    vardiff::Vardiff,
    workbase::Workbase,
    zmq::Zmq,
};

pub use stratum;

pub const COIN_VALUE: u64 = 100_000_000;
pub const USER_AGENT: &str = "lodestone-miner/0.0.1";
// pub const EXTRANONCE1_SIZE: u32 = 4;
pub const EXTRANONCE2_SIZE: usize = 8;

type Result<T = (), E = Error> = std::result::Result<T, E>;

fn target_as_block_hash(target: bitcoin::Target) -> BlockHash {
    BlockHash::from_raw_hash(Hash::from_byte_array(target.to_le_bytes()))
}

pub fn main() {
    let (_logs, _guard) = logs::init();

    let args = Arguments::parse();

    match args.run() {
        Err(err) => {
            error!("error: {err}");

            if env::var_os("RUST_BACKTRACE")
                .map(|val| val == "1")
                .unwrap_or_default()
            {
                error!("{}", err.backtrace());
            }
            process::exit(1);
        }
        Ok(_) => {
            process::exit(0);
        }
    }
}
