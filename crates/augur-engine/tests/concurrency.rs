//! Concurrent submissions and claims against one wallet.

mod common;

use std::sync::Arc;

use futures::future::join_all;
use rand::Rng;

use augur_core::{ActionId, ActionType, BillingError, FundingMode, UserId};
use augur_engine::Engine;
use augur_store::{MemoryStore, Store};

use common::{engine, engine_with, ledger_totals, seeded_rng, COST};

async fn submit_concurrently(
    engine: &Engine,
    user: UserId,
    n: usize,
) -> Vec<Result<FundingMode, BillingError>> {
    let handles = (0..n).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .submit_action(&user, ActionType::fortune())
                .await
                .map(|s| s.funding_mode)
        })
    });
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect()
}

async fn exactly_k_paid_succeed(store: Arc<dyn Store>) {
    const N: usize = 12;
    const K: i64 = 5;
    let t = engine_with(store, K * COST, None);
    let user = UserId::generate();

    let results = submit_concurrently(&t.engine, user, N).await;

    let paid = results
        .iter()
        .filter(|r| matches!(r, Ok(FundingMode::Paid)))
        .count();
    let short = results
        .iter()
        .filter(|r| matches!(r, Err(BillingError::InsufficientCredits { .. })))
        .count();
    assert_eq!(paid, usize::try_from(K).unwrap());
    assert_eq!(short, N - paid);
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_paid_submissions_never_overdraw() {
    exactly_k_paid_succeed(Arc::new(MemoryStore::new())).await;
}

#[cfg(feature = "rocksdb-backend")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_paid_submissions_never_overdraw_rocksdb() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = augur_store::RocksStore::open(dir.path()).unwrap();
    exactly_k_paid_succeed(Arc::new(store)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_free_submissions_respect_daily_limit() {
    let t = engine(100, Some(2));
    let user = UserId::generate();

    let results = submit_concurrently(&t.engine, user, 3).await;

    let free = results
        .iter()
        .filter(|r| matches!(r, Ok(FundingMode::Free)))
        .count();
    let paid = results
        .iter()
        .filter(|r| matches!(r, Ok(FundingMode::Paid)))
        .count();
    assert_eq!((free, paid), (2, 1));
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 100 - COST);
    assert_eq!(t.engine.remaining_free_uses_today(&user).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lost_free_race_without_funds_is_insufficient_credits() {
    let t = engine(0, Some(1));
    let user = UserId::generate();

    let results = submit_concurrently(&t.engine, user, 4).await;

    let free = results
        .iter()
        .filter(|r| matches!(r, Ok(FundingMode::Free)))
        .count();
    let short = results
        .iter()
        .filter(|r| matches!(r, Err(BillingError::InsufficientCredits { .. })))
        .count();
    assert_eq!((free, short), (1, 3));
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn daily_reward_granted_once_under_concurrency() {
    let t = engine(100, None);
    let user = UserId::generate();

    let claims = join_all((0..8).map(|_| {
        let engine = t.engine.clone();
        tokio::spawn(async move { engine.claim_daily_reward(&user).await })
    }))
    .await;

    let granted: Vec<_> = claims
        .into_iter()
        .map(|c| c.unwrap().unwrap())
        .filter(|c| c.granted)
        .collect();
    assert_eq!(granted.len(), 1);

    let reward = granted[0].amount;
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 100 + reward);
    assert!(!t.engine.claim_daily_reward(&user).await.unwrap().granted);
}

/// Random batches of concurrent operations; balances stay non-negative and always equal the
/// sum of the ledger.
async fn random_interleavings_keep_balances_consistent(store: Arc<dyn Store>) {
    for seed in [7, 42, 1337, 0xDEAD_BEEF] {
        let t = engine_with(Arc::clone(&store), 60, Some(1));
        let users = [UserId::generate(), UserId::generate()];
        let mut rng = seeded_rng(seed);

        for _round in 0..20 {
            let batch: Vec<_> = (0..8)
                .map(|i| {
                    let engine = t.engine.clone();
                    let user = users[rng.gen_range(0..2)];
                    let op = rng.gen_range(0..7);
                    let amount = rng.gen_range(1..=40);
                    tokio::spawn(async move {
                        let result = match op {
                            0 | 1 => engine
                                .submit_action(&user, ActionType::fortune())
                                .await
                                .map(|_| ()),
                            2 => engine
                                .ledger()
                                .credit(&user, amount, format!("round bonus {i}"))
                                .await
                                .map(|_| ()),
                            3 => engine
                                .rewards()
                                .claim_ad(&user, &format!("imp-{amount}"))
                                .await
                                .map(|_| ()),
                            4 => engine
                                .ledger()
                                .convert_diamonds(&user, amount % 4 + 1)
                                .await
                                .map(|_| ()),
                            5 => {
                                let action_id = ActionId::generate();
                                match engine.ledger().debit(&user, amount, action_id).await {
                                    Ok(_) => engine
                                        .ledger()
                                        .reverse(&user, amount, action_id)
                                        .map(|_| ()),
                                    Err(e) => Err(e),
                                }
                            }
                            _ => engine.claim_daily_reward(&user).await.map(|_| ()),
                        };
                        match result {
                            Ok(())
                            | Err(
                                BillingError::InsufficientCredits { .. }
                                | BillingError::InsufficientDiamonds { .. }
                                | BillingError::AlreadyClaimed { .. },
                            ) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    })
                })
                .collect();
            for joined in join_all(batch).await {
                joined.unwrap();
            }

            for user in &users {
                let balance = t.engine.get_balance(user).await.unwrap();
                assert!(
                    balance.credits >= 0,
                    "seed {seed}: credits {}",
                    balance.credits
                );
                assert!(
                    balance.diamonds >= 0,
                    "seed {seed}: diamonds {}",
                    balance.diamonds
                );
                assert_eq!(
                    ledger_totals(t.store.as_ref(), user),
                    (balance.credits, balance.diamonds),
                    "seed {seed}: ledger drifted from wallet"
                );
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn random_interleavings_on_memory_store() {
    random_interleavings_keep_balances_consistent(Arc::new(MemoryStore::new())).await;
}

#[cfg(feature = "rocksdb-backend")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn random_interleavings_on_rocksdb() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = augur_store::RocksStore::open(dir.path()).unwrap();
    random_interleavings_keep_balances_consistent(Arc::new(store)).await;
}
