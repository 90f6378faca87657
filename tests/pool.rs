use super::*;

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
async fn basic_initialization_flow() {
    let pool = TestPool::spawn_with_args("--start-diff 0.00001");

    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();
    let mut events = client.events.subscribe();

    let (subscribe, _, _) = client.subscribe(USER_AGENT.into()).await.unwrap();

    assert_eq!(subscribe.subscriptions.len(), 2);

    assert!(client.authorize().await.is_ok());

    let difficulty = match events.recv().await.unwrap() {
        stratum::Event::SetDifficulty(difficulty) => difficulty,
        _ => panic!("Expected SetDifficulty"),
    };

    assert_eq!(difficulty, Difficulty::from(0.00001));

    let notify = match events.recv().await.unwrap() {
        stratum::Event::Notify(n) => n,
        _ => panic!("Expected Notify"),
    };

    assert_eq!(notify.job_id, JobId::from(0));
    assert!(notify.clean_jobs);
}

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
async fn configure_with_multiple_negotiation_steps() {
    let pool = TestPool::spawn_with_args("--start-diff 0.00001");

    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();

    assert!(
        client
            .configure(vec!["unknown-extension".into()], None)
            .await
            .unwrap_err()
            .to_string()
            .contains("Unsupported extension")
    );

    assert!(
        client
            .configure(
                vec!["version-rolling".into()],
                Some(Version::from_str("1fffe000").unwrap())
            )
            .await
            .is_ok()
    );

    assert!(
        client
            .configure(
                vec!["version-rolling".into()],
                Some(Version::from_str("1fffe111").unwrap())
            )
            .await
            .is_ok()
    );

    let (subscribe, _, _) = client.subscribe(USER_AGENT.into()).await.unwrap();

    assert_eq!(subscribe.subscriptions.len(), 2);

    assert!(client.authorize().await.is_ok());
}

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
async fn authorize_before_subscribe_fails() {
    let pool = TestPool::spawn();

    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();

    assert!(
        client
            .authorize()
            .await
            .unwrap_err()
            .to_string()
            .contains("Method not allowed")
    );
}

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
async fn submit_before_authorize_fails() {
    let pool = TestPool::spawn();

    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();

    client.subscribe(USER_AGENT.into()).await.unwrap();

    assert!(
        client
            .submit(
                JobId::new(3),
                Extranonce::generate(8),
                Ntime::from(0),
                Nonce::from(12345),
            )
            .await
            .unwrap_err()
            .to_string()
            .contains("Unauthorized")
    );
}

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
async fn duplicate_share_rejected() {
    let pool = TestPool::spawn_with_args("--start-diff 0.00001");
    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();
    let mut events = client.events.subscribe();

    let (subscribe, _, _) = client.subscribe(USER_AGENT.into()).await.unwrap();
    let extranonce1 = subscribe.enonce1;
    let extranonce2 = Extranonce::generate(subscribe.enonce2_size);

    client.authorize().await.unwrap();

    let (notify, difficulty) = timeout(Duration::from_secs(10), async {
        let mut difficulty = stratum::Difficulty::from(1);
        loop {
            match events.recv().await.unwrap() {
                stratum::Event::SetDifficulty(diff) => difficulty = diff,
                stratum::Event::Notify(notify) => return (notify, difficulty),
                _ => {}
            }
        }
    })
    .await
    .expect("Timeout waiting for initial notification");

    let (ntime, nonce) = solve_share(&notify, &extranonce1, &extranonce2, difficulty);

    let submit = client
        .submit(notify.job_id, extranonce2.clone(), ntime, nonce)
        .await;

    assert!(submit.is_ok());

    let submit_duplicate = client
        .submit(notify.job_id, extranonce2, ntime, nonce)
        .await;

    assert!(
        submit_duplicate
            .unwrap_err()
            .to_string()
            .contains("Duplicate")
    );
}

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
#[ignore]
async fn clean_jobs_true_on_init_and_new_block() {
    let pool = TestPool::spawn_with_args("--start-diff 0.0001");
    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();
    let mut events = client.events.subscribe();

    client.subscribe(USER_AGENT.into()).await.unwrap();
    client.authorize().await.unwrap();

    let mut notify = match events.recv().await.unwrap() {
        stratum::Event::Notify(n) => n,
        stratum::Event::SetDifficulty(_) => match events.recv().await.unwrap() {
            stratum::Event::Notify(n) => n,
            _ => panic!("expected notify"),
        },
        _ => panic!("expected notify"),
    };

    assert!(notify.clean_jobs);

    pool.mine_block();

    let timeout_result = timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await.unwrap() {
                stratum::Event::Notify(notif)
                    if notif.job_id != notify.job_id && notify.clean_jobs =>
                {
                    return notif;
                }
                _ => {}
            }
        }
    })
    .await;

    notify = timeout_result.expect("Timeout waiting for new block notification");

    assert!(notify.clean_jobs);
}

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
async fn shares_must_meet_pool_difficulty() {
    let pool = TestPool::spawn_with_args("--start-diff 0.0001");
    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();
    let mut events = client.events.subscribe();

    let (subscribe, _, _) = client.subscribe(USER_AGENT.into()).await.unwrap();
    let extranonce1 = subscribe.enonce1;
    let extranonce2 = Extranonce::generate(subscribe.enonce2_size);

    client.authorize().await.unwrap();

    let (notify, difficulty) = timeout(Duration::from_secs(10), async {
        let mut difficulty = stratum::Difficulty::from(1.0);
        loop {
            match events.recv().await.unwrap() {
                stratum::Event::SetDifficulty(diff) => difficulty = diff,
                stratum::Event::Notify(notify) => return (notify, difficulty),
                _ => {}
            }
        }
    })
    .await
    .expect("Timeout waiting for initial notification");

    let easy_diff = stratum::Difficulty::from(0.0000001);
    let (ntime, nonce) = solve_share(&notify, &extranonce1, &extranonce2, easy_diff);

    let merkle_root = stratum::merkle_root(
        &notify.coinb1,
        &notify.coinb2,
        &extranonce1,
        &extranonce2,
        &notify.merkle_branches,
    )
    .unwrap();

    let header = Header {
        version: notify.version.into(),
        prev_blockhash: notify.prevhash.clone().into(),
        merkle_root: merkle_root.into(),
        time: ntime.into(),
        bits: notify.nbits.into(),
        nonce: nonce.into(),
    };

    let hash = header.block_hash();
    let pool_target = difficulty.to_target();

    if pool_target.is_met_by(hash) {
        println!("Accidentally found valid share, skipping negative test");
        return;
    }

    let submit = client
        .submit(notify.job_id, extranonce2, ntime, nonce)
        .await;

    assert!(
        submit
            .unwrap_err()
            .to_string()
            .contains("Low difficulty")
    );
}

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
async fn stale_share_rejected() {
    let pool = TestPool::spawn_with_args("--start-diff 0.0001");
    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();
    let mut events = client.events.subscribe();

    let (subscribe, _, _) = client.subscribe(USER_AGENT.into()).await.unwrap();
    let extranonce1 = subscribe.enonce1;
    let extranonce2 = Extranonce::generate(subscribe.enonce2_size);

    client.authorize().await.unwrap();

    let (notify_a, difficulty) = timeout(Duration::from_secs(10), async {
        let mut difficulty = stratum::Difficulty::from(1.0);
        loop {
            match events.recv().await.unwrap() {
                stratum::Event::SetDifficulty(diff) => difficulty = diff,
                stratum::Event::Notify(notify) => return (notify, difficulty),
                _ => {}
            }
        }
    })
    .await
    .expect("Timeout waiting for initial notification");

    let (ntime, nonce) = solve_share(&notify_a, &extranonce1, &extranonce2, difficulty);

    pool.mine_block();

    timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await.unwrap() {
                stratum::Event::Notify(n) if n.job_id != notify_a.job_id && n.clean_jobs => {
                    break;
                }
                _ => {}
            }
        }
    })
    .await
    .expect("Timeout waiting for new block notification");

    let submit = client
        .submit(notify_a.job_id, extranonce2, ntime, nonce)
        .await;

    assert!(submit.unwrap_err().to_string().contains("Stale"));
}

#[tokio::test]
#[serial(bitcoind)]
#[timeout(90000)]
async fn invalid_job_id_rejected_as_stale() {
    let pool = TestPool::spawn();
    let mut client = pool.stratum_client().await;
    client.connect().await.unwrap();
    let mut events = client.events.subscribe();

    let (subscribe, _, _) = client.subscribe(USER_AGENT.into()).await.unwrap();
    let _extranonce1 = subscribe.enonce1;
    let extranonce2 = Extranonce::generate(subscribe.enonce2_size);

    client.authorize().await.unwrap();

    let _ = events.recv().await.unwrap();
    let _ = events.recv().await.unwrap();

    let ntime = Ntime::from(0);
    let nonce = Nonce::from(0);

    let bad_job_id = stratum::JobId::from(0xdeadbeef);

    let submit = client.submit(bad_job_id, extranonce2, ntime, nonce).await;

    assert!(submit.unwrap_err().to_string().contains("Stale"));
}

