//! `PgStore` against a live Postgres.
//!
//! Ignored by default; run with `cargo test -- --ignored` once the database
//! from `configuration.yaml` is reachable.

use chrono::{Duration, Utc};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tokenward::auth::{NewRefreshToken, TokenState};
use tokenward::configuration::{get_configuration, DatabaseSettings};
use tokenward::error::StoreError;
use tokenward::store::{PgStore, RefreshTokenStore, UserStore};
use tokenward::user::NewUser;

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn spawn_store_with_pool() -> (PgStore, PgPool) {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let pool = configure_database(&configuration.database).await;
    (PgStore::new(pool.clone()), pool)
}

async fn spawn_store() -> PgStore {
    spawn_store_with_pool().await.0
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        username: "user".to_string(),
        password_hash: "$2b$04$placeholderplaceholderplaceholderplaceholderplace".to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn duplicate_email_is_a_conflict() {
    let store = spawn_store().await;
    store.insert_user(&new_user("user@example.com")).await.unwrap();

    let again = store.insert_user(&new_user("user@example.com")).await;
    assert!(matches!(again, Err(StoreError::Conflict(_))));
}

#[tokio::test]
#[ignore]
async fn rotate_has_exactly_one_winner() {
    let store = spawn_store().await;
    let user = store.insert_user(&new_user("user@example.com")).await.unwrap();
    let original = NewRefreshToken::generate(user.id, 3600);
    store.insert(&original).await.unwrap();

    let a = NewRefreshToken::generate(user.id, 3600);
    let b = NewRefreshToken::generate(user.id, 3600);
    let (first, second) = tokio::join!(
        store.rotate(&original.token, &a),
        store.rotate(&original.token, &b)
    );

    let winners = [first.unwrap(), second.unwrap()]
        .iter()
        .filter(|r| r.is_some())
        .count();
    assert_eq!(winners, 1);

    let record = store.find_by_value(&original.token).await.unwrap().unwrap();
    assert_eq!(record.state(Utc::now()), TokenState::Revoked);
}

#[tokio::test]
#[ignore]
async fn revoke_all_only_counts_active_tokens() {
    let store = spawn_store().await;
    let user = store.insert_user(&new_user("user@example.com")).await.unwrap();
    for _ in 0..3 {
        store
            .insert(&NewRefreshToken::generate(user.id, 3600))
            .await
            .unwrap();
    }

    assert_eq!(store.revoke_all_for_user(user.id).await.unwrap(), 3);
    assert_eq!(store.revoke_all_for_user(user.id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn reset_password_applies_once_and_revokes_sessions() {
    let store = spawn_store().await;
    let user = store.insert_user(&new_user("user@example.com")).await.unwrap();
    let session = NewRefreshToken::generate(user.id, 3600);
    store.insert(&session).await.unwrap();
    let expires_at = Utc::now() + Duration::minutes(15);

    assert!(store
        .reset_password("jti-1", user.id, expires_at, "new-hash")
        .await
        .unwrap());
    assert!(!store
        .reset_password("jti-1", user.id, expires_at, "other-hash")
        .await
        .unwrap());

    let reloaded = store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.password_hash, "new-hash");
    let record = store.find_by_value(&session.token).await.unwrap().unwrap();
    assert!(record.revoked);
}

#[tokio::test]
#[ignore]
async fn reset_password_for_missing_user_changes_nothing() {
    let (store, pool) = spawn_store_with_pool().await;
    let expires_at = Utc::now() + Duration::minutes(15);

    assert!(!store
        .reset_password("jti-1", uuid::Uuid::new_v4(), expires_at, "new-hash")
        .await
        .unwrap());

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM password_reset_uses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore]
async fn reset_password_purges_expired_reset_ids() {
    let (store, pool) = spawn_store_with_pool().await;
    let user = store.insert_user(&new_user("user@example.com")).await.unwrap();

    let long_gone = Utc::now() - Duration::minutes(5);
    assert!(store
        .reset_password("jti-old", user.id, long_gone, "first-hash")
        .await
        .unwrap());
    assert!(store
        .reset_password("jti-new", user.id, Utc::now() + Duration::minutes(15), "second-hash")
        .await
        .unwrap());

    let remaining: Vec<(String,)> = sqlx::query_as("SELECT jti FROM password_reset_uses")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, vec![("jti-new".to_string(),)]);
}

#[tokio::test]
#[ignore]
async fn ping_reaches_the_database() {
    let store = spawn_store().await;
    assert!(store.ping().await.is_ok());
}

#[tokio::test]
#[ignore]
async fn update_password_hash_reports_missing_users() {
    let store = spawn_store().await;
    let user = store.insert_user(&new_user("user@example.com")).await.unwrap();

    assert!(store.update_password_hash(user.id, "new-hash").await.unwrap());
    assert!(!store
        .update_password_hash(uuid::Uuid::new_v4(), "new-hash")
        .await
        .unwrap());

    let reloaded = store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.password_hash, "new-hash");
}
