use super::*;

mod ping;
pub(crate) mod pool;
pub(crate) mod proxy;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Measure Stratum message ping")]
    Ping(ping::Ping),
    #[command(about = "Run a solo Stratum mining pool")]
    Pool(pool::Pool),
    #[command(about = "Run a Stratum proxy in front of an upstream pool")]
    Proxy(proxy::Proxy),
}

impl Subcommand {
    pub(crate) fn run(self) -> Result {
        match self {
            Self::Ping(ping) => Runtime::new()?.block_on(async { ping.run().await }),
            Self::Pool(pool) => Runtime::new()?.block_on(async {
                let cancel_token = CancellationToken::new();

                let shutdown_token = cancel_token.clone();
                tokio::spawn(async move {
                    let _ = ctrl_c().await;
                    info!("Received shutdown signal, stopping pool...");
                    shutdown_token.cancel();
                });

                pool.run(cancel_token).await
            }),
            Self::Proxy(proxy) => Runtime::new()?.block_on(async {
                let cancel_token = CancellationToken::new();

                let shutdown_token = cancel_token.clone();
                tokio::spawn(async move {
                    let _ = ctrl_c().await;
                    info!("Received shutdown signal, stopping proxy...");
                    shutdown_token.cancel();
                });

                proxy.run(cancel_token).await
            }),
        }
    }
}
