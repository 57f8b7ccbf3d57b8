use agenticpencil::clients::TelegramNotifier;
use agenticpencil::config::TelegramConfig;
use agenticpencil::db::Store;
use agenticpencil::models::account::AccountContext;
use agenticpencil::models::parse_timestamp;
use agenticpencil::models::plan::PlanId;
use agenticpencil::services::scheduler::run_cleanup;
use agenticpencil::services::{AccountService, CreditLedger, MeteringError};
use chrono::{Duration, Utc};
use futures::future::join_all;

async fn spawn_store() -> Store {
    Store::new("sqlite::memory:")
        .await
        .expect("Failed to create in-memory store")
}

fn notifier() -> TelegramNotifier {
    TelegramNotifier::new(reqwest::Client::new(), &TelegramConfig::default())
}

async fn free_account(store: &Store, email: &str) -> AccountContext {
    let profile = store
        .create_profile(email, None, Utc::now() + Duration::days(30))
        .await
        .unwrap();
    let (key, _) = store.create_api_key(&profile.id, "Default").await.unwrap();

    AccountContext {
        user_id: profile.id,
        api_key_id: key.id,
        plan: PlanId::Free,
        credits_used: 0,
        credits_reset_at: profile.credits_reset_at,
    }
}

#[tokio::test]
async fn rate_limit_counters_are_per_window() {
    let store = spawn_store().await;

    assert_eq!(store.hit_rate_limit("key-a", 120).await.unwrap(), 1);
    assert_eq!(store.hit_rate_limit("key-a", 120).await.unwrap(), 2);
    assert_eq!(store.hit_rate_limit("key-a", 120).await.unwrap(), 3);

    // New window starts from one; other keys are independent
    assert_eq!(store.hit_rate_limit("key-a", 180).await.unwrap(), 1);
    assert_eq!(store.hit_rate_limit("key-b", 120).await.unwrap(), 1);

    assert_eq!(store.prune_rate_limits(180).await.unwrap(), 2);
    assert_eq!(store.hit_rate_limit("key-a", 180).await.unwrap(), 2);
}

#[tokio::test]
async fn concurrent_hits_each_see_their_own_count() {
    let store = spawn_store().await;

    let hits = (0..10).map(|_| store.hit_rate_limit("key-c", 600));
    let mut counts: Vec<i64> = join_all(hits)
        .await
        .into_iter()
        .collect::<anyhow::Result<_>>()
        .unwrap();
    counts.sort_unstable();

    assert_eq!(counts, (1..=10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn concurrent_reservations_never_exceed_limit() {
    let store = spawn_store().await;
    let account = free_account(&store, "race@example.com").await;
    let ledger = CreditLedger::new(store.clone());

    let attempts = (0..20).map(|_| ledger.reserve(&account, "/v1/keywords/research", 5));
    let results = join_all(attempts).await;

    let granted = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(MeteringError::InsufficientCredits { .. })))
        .count();

    assert_eq!(granted, 10);
    assert_eq!(refused, 10);

    let profile = store.get_profile(&account.user_id).await.unwrap().unwrap();
    assert_eq!(profile.credits_used, 50);
}

#[tokio::test]
async fn refund_restores_reserved_credits() {
    let store = spawn_store().await;
    let account = free_account(&store, "refund@example.com").await;
    let ledger = CreditLedger::new(store.clone());

    let reservation = ledger
        .reserve(&account, "/v1/content/audit", 15)
        .await
        .unwrap();
    assert_eq!(reservation.credits_used_after, 15);
    assert_eq!(reservation.credits_remaining(), Some(35));

    ledger.refund(&reservation).await;

    let profile = store.get_profile(&account.user_id).await.unwrap().unwrap();
    assert_eq!(profile.credits_used, 0);

    // A second refund cannot push the balance negative
    assert!(!store.refund_credits(&account.user_id, 15).await.unwrap());
}

#[tokio::test]
async fn settle_records_usage() {
    let store = spawn_store().await;
    let account = free_account(&store, "settle@example.com").await;
    let ledger = CreditLedger::new(store.clone());

    let reservation = ledger
        .reserve(&account, "/v1/keywords/gaps", 10)
        .await
        .unwrap();
    ledger
        .settle(&reservation, 200, std::time::Duration::from_millis(42))
        .await;

    let calls = store.recent_usage(&account.user_id, 20).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].credits_used, 10);
    assert_eq!(calls[0].response_time_ms, 42);
}

#[tokio::test]
async fn unlimited_plan_is_never_refused() {
    let store = spawn_store().await;
    let mut account = free_account(&store, "big@example.com").await;
    account.plan = PlanId::Enterprise;
    let ledger = CreditLedger::new(store.clone());

    for _ in 0..20 {
        let reservation = ledger
            .reserve(&account, "/v1/content/audit", 15)
            .await
            .unwrap();
        assert_eq!(reservation.credits_remaining(), None);
    }

    let profile = store.get_profile(&account.user_id).await.unwrap().unwrap();
    assert_eq!(profile.credits_used, 300);
}

#[tokio::test]
async fn authenticate_resets_elapsed_window() {
    let store = spawn_store().await;
    let profile = store
        .create_profile("late@example.com", None, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    let (_, plaintext) = store.create_api_key(&profile.id, "Default").await.unwrap();
    assert!(store.reserve_credits(&profile.id, 45, Some(50)).await.unwrap());

    let accounts = AccountService::new(store.clone(), notifier());
    let account = accounts.authenticate(&plaintext).await.unwrap();

    assert_eq!(account.credits_used, 0);
    assert_eq!(account.credits_remaining(), Some(50));

    let next_reset = parse_timestamp(&account.credits_reset_at).unwrap();
    assert!(next_reset > Utc::now() + Duration::days(29));
}

#[tokio::test]
async fn authenticate_rejects_revoked_and_malformed_keys() {
    let store = spawn_store().await;
    let profile = store
        .create_profile("gone@example.com", None, Utc::now() + Duration::days(30))
        .await
        .unwrap();
    let (key, plaintext) = store.create_api_key(&profile.id, "Default").await.unwrap();
    let accounts = AccountService::new(store.clone(), notifier());

    assert!(accounts.authenticate(&plaintext).await.is_ok());
    assert!(accounts.authenticate("not-a-key").await.is_err());

    accounts.revoke_key(&profile.id, &key.id).await.unwrap();
    assert!(accounts.authenticate(&plaintext).await.is_err());
    assert!(accounts.revoke_key(&profile.id, &key.id).await.is_err());
}

#[tokio::test]
async fn cleanup_prunes_cache_and_old_windows() {
    let store = spawn_store().await;

    store
        .put_cached("fresh", "/v1/keywords/research", &vec![1, 2, 3], Duration::hours(1))
        .await
        .unwrap();
    store
        .put_cached("stale", "/v1/keywords/research", &vec![4], Duration::hours(-1))
        .await
        .unwrap();

    assert_eq!(
        store.get_cached::<Vec<i32>>("fresh").await.unwrap(),
        Some(vec![1, 2, 3])
    );
    assert_eq!(store.get_cached::<Vec<i32>>("stale").await.unwrap(), None);

    let now = Utc::now().timestamp();
    store.hit_rate_limit("key", now - 7200).await.unwrap();
    store.hit_rate_limit("key", now).await.unwrap();

    let report = run_cleanup(&store, 60).await.unwrap();
    assert_eq!(report.cache_entries, 1);
    assert_eq!(report.rate_limit_windows, 1);

    assert_eq!(store.hit_rate_limit("key", now).await.unwrap(), 2);
}
