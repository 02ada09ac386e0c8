//! PostgreSQL ledger and credential store tests.
//!
//! These run against the database named by `DATABASE_URL` and are skipped
//! when it is unset. Every test works on its own freshly created user, so the
//! suite can share a database with other runs.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;
use villa_core::auth::jwt::read_unverified_claims;
use villa_core::auth::{
    AuthConfig, AuthError, AuthService, CredentialStore, PgCredentialStore, PgLedger,
    RefreshOutcome, Registration, RejectReason, RotateOutcome, TokenIssuer, TokenLedger,
};
use villa_core::models::auth::{NewUser, Principal};

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL test");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("connect to DATABASE_URL");
    villa_core::migrate::migrate(&pool).await.expect("migrate");
    Some(pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn create_user(pool: &PgPool) -> Principal {
    PgCredentialStore::new(pool.clone())
        .create_user(NewUser {
            user_name: unique_name("ledger"),
            name: "Ledger".into(),
            password_hash: "unused".into(),
            role: "customer".into(),
        })
        .await
        .expect("create user")
}

fn issuer(pool: &PgPool) -> TokenIssuer {
    TokenIssuer::new(&AuthConfig::new("pg-secret"), Arc::new(PgLedger::new(pool.clone())))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotations_of_one_row_have_one_winner() {
    let Some(pool) = test_pool().await else { return };
    let user = create_user(&pool).await;
    let issuer = issuer(&pool);
    let ledger = Arc::new(PgLedger::new(pool.clone()));

    let chain_id = Uuid::new_v4().to_string();
    let current = issuer.new_refresh_record(user.id, &chain_id);
    ledger.insert(&current).await.unwrap();

    let attempts = (0..16).map(|_| {
        let ledger = ledger.clone();
        let replacement = issuer.new_refresh_record(user.id, &chain_id);
        let current_id = current.id;
        tokio::spawn(async move { ledger.rotate(current_id, &replacement).await.unwrap() })
    });
    let outcomes: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let winners = outcomes.iter().filter(|o| **o == RotateOutcome::Rotated).count();
    assert_eq!(winners, 1, "outcomes: {outcomes:?}");

    let chain = ledger.chain(user.id, &chain_id).await.unwrap();
    assert_eq!(chain.len(), 2, "losers must not write");
    assert_eq!(chain.iter().filter(|r| r.is_valid).count(), 1);
    assert!(!chain.iter().find(|r| r.id == current.id).unwrap().is_valid);
}

#[tokio::test]
async fn rotating_an_invalid_row_is_stale_and_writes_nothing() {
    let Some(pool) = test_pool().await else { return };
    let user = create_user(&pool).await;
    let issuer = issuer(&pool);
    let ledger = PgLedger::new(pool.clone());

    let chain_id = Uuid::new_v4().to_string();
    let current = issuer.new_refresh_record(user.id, &chain_id);
    ledger.insert(&current).await.unwrap();
    assert!(ledger.invalidate(current.id).await.unwrap());
    assert!(!ledger.invalidate(current.id).await.unwrap());

    let replacement = issuer.new_refresh_record(user.id, &chain_id);
    assert_eq!(
        ledger.rotate(current.id, &replacement).await.unwrap(),
        RotateOutcome::Stale
    );
    assert!(ledger.find_by_token(&replacement.refresh_token).await.unwrap().is_none());
}

#[tokio::test]
async fn chain_holds_at_most_one_valid_row() {
    let Some(pool) = test_pool().await else { return };
    let user = create_user(&pool).await;
    let issuer = issuer(&pool);
    let ledger = PgLedger::new(pool.clone());

    let chain_id = Uuid::new_v4().to_string();
    ledger
        .insert(&issuer.new_refresh_record(user.id, &chain_id))
        .await
        .unwrap();

    let second = ledger
        .insert(&issuer.new_refresh_record(user.id, &chain_id))
        .await;
    assert!(matches!(second, Err(AuthError::DbError(_))), "got {second:?}");
}

#[tokio::test]
async fn invalidate_chain_flips_only_that_chain() {
    let Some(pool) = test_pool().await else { return };
    let user = create_user(&pool).await;
    let issuer = issuer(&pool);
    let ledger = PgLedger::new(pool.clone());

    let chain_id = Uuid::new_v4().to_string();
    let first = issuer.new_refresh_record(user.id, &chain_id);
    ledger.insert(&first).await.unwrap();
    let second = issuer.new_refresh_record(user.id, &chain_id);
    assert_eq!(
        ledger.rotate(first.id, &second).await.unwrap(),
        RotateOutcome::Rotated
    );

    let other_chain = Uuid::new_v4().to_string();
    let other = issuer.new_refresh_record(user.id, &other_chain);
    ledger.insert(&other).await.unwrap();

    assert_eq!(ledger.invalidate_chain(user.id, &chain_id).await.unwrap(), 1);
    assert_eq!(ledger.invalidate_chain(user.id, &chain_id).await.unwrap(), 0);

    let chain = ledger.chain(user.id, &chain_id).await.unwrap();
    assert_eq!(
        chain.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );
    assert!(chain.iter().all(|r| !r.is_valid));
    assert!(ledger.find_by_token(&other.refresh_token).await.unwrap().unwrap().is_valid);
}

#[tokio::test]
async fn duplicate_user_name_is_rejected_case_insensitively() {
    let Some(pool) = test_pool().await else { return };
    let store = PgCredentialStore::new(pool.clone());
    let user_name = unique_name("dup");

    let created = store
        .create_user(NewUser {
            user_name: user_name.clone(),
            name: "First".into(),
            password_hash: "h".into(),
            role: "customer".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.normalized_email, user_name.to_uppercase());

    let err = store
        .create_user(NewUser {
            user_name: user_name.to_uppercase(),
            name: "Second".into(),
            password_hash: "h".into(),
            role: "customer".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateUser), "got {err:?}");

    let found = store
        .find_by_user_name(&user_name.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.principal.id, created.id);
    assert_eq!(found.principal.roles, vec!["customer".to_string()]);
}

#[tokio::test]
async fn reuse_after_rotation_ends_the_session() {
    let Some(pool) = test_pool().await else { return };
    let service = AuthService::postgres(&AuthConfig::new("pg-secret"), pool.clone());
    let user_name = unique_name("reuse");
    service
        .register(Registration {
            user_name: user_name.clone(),
            name: "Reuse".into(),
            password: "p".into(),
            role: None,
        })
        .await
        .unwrap();

    let a1 = service.login(&user_name, "p").await.unwrap();
    let a2 = service.refresh(&a1).await.unwrap().into_result().unwrap();

    assert_eq!(
        service.refresh(&a1).await.unwrap(),
        RefreshOutcome::Rejected(RejectReason::ReuseDetected)
    );
    assert_eq!(
        service.refresh(&a2).await.unwrap(),
        RefreshOutcome::Rejected(RejectReason::ReuseDetected)
    );

    let claims = read_unverified_claims(&a1.access_token).unwrap();
    let user_id: Uuid = claims.sub.parse().unwrap();
    let chain = PgLedger::new(pool).chain(user_id, &claims.jti).await.unwrap();
    assert_eq!(chain.len(), 2);
    assert!(chain.iter().all(|r| !r.is_valid));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refreshes_of_one_pair_have_one_winner() {
    let Some(pool) = test_pool().await else { return };
    let service = Arc::new(AuthService::postgres(&AuthConfig::new("pg-secret"), pool));
    let user_name = unique_name("race");
    service
        .register(Registration {
            user_name: user_name.clone(),
            name: "Race".into(),
            password: "p".into(),
            role: None,
        })
        .await
        .unwrap();
    let pair = service.login(&user_name, "p").await.unwrap();

    let attempts = (0..8).map(|_| {
        let service = service.clone();
        let pair = pair.clone();
        tokio::spawn(async move { service.refresh(&pair).await.unwrap() })
    });
    let outcomes: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let winners = outcomes
        .iter()
        .filter(|o| matches!(o, RefreshOutcome::Rotated(_)))
        .count();
    assert_eq!(winners, 1);
    assert!(outcomes.iter().all(|o| matches!(
        o,
        RefreshOutcome::Rotated(_) | RefreshOutcome::Rejected(RejectReason::ReuseDetected)
    )));
}
