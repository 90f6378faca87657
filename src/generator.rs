use super::*;

pub(crate) struct Generator {
    client: Arc<bitcoind_async_client::Client>,
    settings: Arc<Settings>,
    cancel: CancellationToken,
}

impl Generator {
    pub(crate) fn new(client: bitcoind_async_client::Client, settings: Arc<Settings>) -> Self {
        Self {
            client: Arc::new(client),
            settings,
            cancel: CancellationToken::new(),
        }
    }

    async fn fetch(&self) -> Result<BlockTemplate> {
        let mut rules = vec!["segwit"];
        if self.settings.chain().network() == Network::Signet {
            rules.push("signet");
        }

        let params = json!({
            "capabilities": ["coinbasetxn", "workid", "coinbase/append"],
            "rules": rules,
        });

        self.client
            .call::<BlockTemplate>("getblocktemplate", &[params])
            .await
            .context("failed to fetch block template")
    }

    pub(crate) async fn spawn(
        self,
        cancel_token: CancellationToken,
        tasks: &mut JoinSet<()>,
    ) -> Result<watch::Receiver<Arc<BlockTemplate>>> {
        let mut zmq = Zmq::connect(self.settings.clone()).await?;

        let initial_template = self.fetch().await?;

        let (template_sender, template_receiver) = watch::channel(Arc::new(initial_template));

        let update_interval = self.settings.update_interval();
        let cancel = self.cancel.clone();

        tasks.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        info!("Shutting down generator");
                        break;
                    }
                    _ = cancel.cancelled() => break,
                    hash = zmq.recv_blockhash() => {
                        match hash {
                            Ok(hash) => {
                                info!("Observed new block {hash} via ZMQ, refreshing template");
                            }
                            Err(err) => {
                                warn!("ZMQ block notification error: {err}");
                                sleep(Duration::from_secs(1)).await;
                                continue;
                            }
                        }
                    }
                    _ = sleep(update_interval) => {}
                }

                match self.fetch().await {
                    Ok(template) => {
                        template_sender.send_replace(Arc::new(template));
                    }
                    Err(err) => {
                        warn!("Failed to fetch block template: {err}");
                    }
                }
            }
        });

        Ok(template_receiver)
    }
}

pub(crate) async fn spawn_generator(
    settings: Arc<Settings>,
    cancel_token: CancellationToken,
    tasks: &mut JoinSet<()>,
) -> Result<watch::Receiver<Arc<BlockTemplate>>> {
    let client = settings
        .bitcoin_rpc_client()
        .await
        .context("failed to connect to Bitcoin Core RPC")?;

    let generator = Generator::new(client, settings);

    generator.spawn(cancel_token, tasks).await
}
