use {
    super::*,
    crate::{
        api, event_sink::build_event_sink, http_server, kv_cache::KvCache, rate_limit::Admission,
        rate_limit::RateLimiter,
    },
};

#[derive(Parser, Debug)]
pub(crate) struct Proxy {
    #[command(flatten)]
    pub(crate) options: ProxyOptions,
}

impl Proxy {
    pub(crate) async fn run(&self, cancel_token: CancellationToken) -> Result {
        let mut tasks = JoinSet::new();

        let settings = Arc::new(
            Settings::from_proxy_options(self.options.clone())
                .context("failed to create settings")?,
        );

        let (upstream, events) = Upstream::connect(settings.clone()).await?;

        let upstream = Arc::new(upstream);

        let (workbase_rx, upstream_tx) = upstream
            .clone()
            .spawn(events, cancel_token.clone(), &mut tasks)
            .await
            .context("failed to start upstream event loop")?;

        let extranonces = Extranonces::Proxy(
            ProxyExtranonces::new(
                upstream.enonce1().clone(),
                upstream.enonce2_size(),
                settings.enonce1_extension_size(),
            )
            .context("upstream extranonce configuration incompatible with proxy mode")?,
        );
        let metatron = Arc::new(Metatron::new(extranonces));
        metatron.clone().spawn(cancel_token.clone(), &mut tasks);

        let metrics = Arc::new(Metrics {
            upstream: upstream.clone(),
            metatron: metatron.clone(),
        });

        if let Some(http_port) = settings.http_port() {
            http_server::spawn(
                http_server::HttpConfig {
                    address: settings.address().to_string(),
                    port: http_port,
                    acme_domains: settings.acme_domains().to_vec(),
                    acme_contacts: settings.acme_contacts().to_vec(),
                    acme_cache: settings.acme_cache_path(),
                },
                api::router(metatron.clone()).merge(api::proxy::router(upstream.clone())),
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

        info!("Stratum server listening for downstream miners on {address}:{port}");

        if !integration_test() && !logs_enabled() {
            spawn_throbber(metrics, cancel_token.clone(), &mut tasks);
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
                    let upstream_tx = upstream_tx.clone();
                    let conn_cancel_token = cancel_token.child_token();
                    let event_tx = event_tx.clone();
                    let kv_cache = kv_cache.clone();
                    let rate_limiter = rate_limiter.clone();

                    rate_limiter.connection_opened();

                    tasks.spawn(async move {
                        let mut stratifier: Stratifier<Notify> = Stratifier::new(
                            addr,
                            settings,
                            metatron,
                            Some(upstream_tx),
                            stream,
                            workbase_rx,
                            conn_cancel_token,
                            event_tx,
                            kv_cache,
                        );

                        if let Err(err) = stratifier.serve().await {
                            error!("Stratifier error for {addr}: {err}");
                        }

                        rate_limiter.connection_closed();
                    });
                }

                _ = async {
                    while upstream.is_connected() {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                } => {
                    warn!("Upstream connection lost, shutting down");
                    cancel_token.cancel();
                    break;
                }

                _ = cancel_token.cancelled() => {
                    info!("Shutting down proxy");
                    break;
                }
            }
        }

        info!("Waiting for {} tasks to complete...", tasks.len());
        while tasks.join_next().await.is_some() {}
        info!("All proxy tasks stopped");

        Ok(())
    }
}
