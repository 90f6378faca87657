use {
    super::*,
    crate::{
        api, event_sink::build_event_sink, http_server, kv_cache::KvCache, rate_limit::Admission,
        rate_limit::RateLimiter, relay,
    },
};

#[derive(Parser, Debug)]
pub(crate) struct Pool {
    #[command(flatten)]
    pub(crate) options: PoolOptions,
}

impl Pool {
    pub(crate) async fn run(&self, cancel_token: CancellationToken) -> Result {
        let mut tasks = JoinSet::new();

        let settings = Arc::new(
            Settings::from_pool_options(self.options.clone())
                .context("failed to create settings")?,
        );

        let local_workbase_rx = spawn_generator(settings.clone(), cancel_token.clone(), &mut tasks)
            .await
            .context("failed to subscribe to ZMQ block notifications")?;

        let workbase_rx = if settings.tbg_primary_url().is_some() {
            relay::spawn_relay(
                settings.clone(),
                local_workbase_rx,
                cancel_token.clone(),
                &mut tasks,
            )
            .await
            .context("failed to connect to relay primary")?
        } else {
            if settings.tbg_listen().is_some() {
                relay::spawn_primary(
                    settings.clone(),
                    local_workbase_rx.clone(),
                    cancel_token.clone(),
                    &mut tasks,
                )
                .await
                .context("failed to start relay primary")?;
            }
            local_workbase_rx
        };

        let extranonces = Extranonces::Pool(
            PoolExtranonces::new(settings.enonce1_size(), settings.enonce2_size())
                .context("invalid extranonce configuration")?,
        );

        let metatron = Arc::new(Metatron::new(extranonces));
        metatron.clone().spawn(cancel_token.clone(), &mut tasks);

        if let Some(http_port) = settings.http_port() {
            http_server::spawn(
                http_server::HttpConfig {
                    address: settings.address().to_string(),
                    port: http_port,
                    acme_domains: settings.acme_domains().to_vec(),
                    acme_contacts: settings.acme_contacts().to_vec(),
                    acme_cache: settings.acme_cache_path(),
                },
                api::router(metatron.clone()),
                cancel_token.clone(),
            )?;
        }

        let event_tx = build_event_sink(&settings, cancel_token.clone(), &mut tasks)
            .await
            .context("failed to build event sink")?;

        let kv_cache = match settings.redis_url() {
            Some(redis_url) => match KvCache::connect(&redis_url).await {
                Ok(kv_cache) => Some(Arc::new(kv_cache)),
                Err(e) => {
                    warn!("Failed to connect to redis at {redis_url}: {e}");
                    None
                }
            },
            None => None,
        };

        let rate_limiter = Arc::new(RateLimiter::new(
            settings.new_connections_per_minute(),
            settings.soft_ban_duration(),
            settings.maxclients(),
        ));
        rate_limiter.clone().spawn_gc(cancel_token.clone(), &mut tasks);

        let address = settings.address();
        let port = settings.port();

        let listener = TcpListener::bind((address, port))
            .await
            .with_context(|| format!("failed to bind to {address}:{port}"))?;

        info!("Stratum server listening on {address}:{port}");

        if !integration_test() && !logs_enabled() {
            spawn_throbber(metatron.clone(), cancel_token.clone(), &mut tasks);
        }

        loop {
            tokio::select! {
                Ok((stream, addr)) = listener.accept() => {
                    match rate_limiter.check(addr.ip()) {
                        Admission::Allow => {}
                        Admission::SoftBanned => {
                            debug!("Rejecting {addr} - IP is soft-banned");
                            continue;
                        }
                        Admission::RateLimited => {
                            warn!("Soft-banning {addr} - exceeded new connection rate");
                            continue;
                        }
                        Admission::AtCapacity => {
                            warn!("Rejecting {addr} - at maxclients capacity");
                            continue;
                        }
                    }

                    info!("Spawning stratifier task for {addr}");

                    let workbase_rx = workbase_rx.clone();
                    let settings = settings.clone();
                    let metatron = metatron.clone();
                    let conn_cancel_token = cancel_token.child_token();
                    let event_tx = event_tx.clone();
                    let kv_cache = kv_cache.clone();
                    let rate_limiter = rate_limiter.clone();

                    rate_limiter.connection_opened();

                    tasks.spawn(async move {
                        let mut stratifier: Stratifier<BlockTemplate> = Stratifier::new(
                            addr,
                            settings.clone(),
                            metatron,
                            None,
                            stream,
                            workbase_rx,
                            conn_cancel_token,
                            event_tx,
                            kv_cache,
                        );

                        if let Err(err) = stratifier.serve().await {
                            error!("Stratifier error: {err}")
                        }

                        rate_limiter.connection_closed();
                    });
                }
                _ = cancel_token.cancelled() => {
                    info!("Shutting down stratum server");
                    break;
                }
            }
        }

        info!("Waiting for {} tasks to complete...", tasks.len());
        while tasks.join_next().await.is_some() {}
        info!("All pool tasks stopped");

        Ok(())
    }
}
