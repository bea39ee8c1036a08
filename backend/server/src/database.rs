//! # Redis
//!
//! RAM database holding every issued ticket number.
//!
//! ## Requirements
//!
//! - Uniqueness enforced by the store itself, not by the issuer's membership check
//! - O(1) membership lookups
//! - Full listing for draws, at most 90,000 values with the default range
//!
//! ## Implementation
//!
//! - Redis set `tickets`: the pool. `SADD` returns 0 when the member already exists, which
//!   is the atomic conflict signal between concurrent issuers
//! - Redis hash `tickets:created_at`: ticket to RFC 3339 creation timestamp
//! - Both writes go out as one MULTI/EXEC transaction, a ticket never exists without its timestamp
//! - Estimated memory usage:
//! (~16 bytes (set member) + ~50 bytes (hash pair)) × 90,000 = roughly 6 MB
use std::time::Duration;

use chrono::Utc;
use redis::{
    AsyncCommands, Client, Pipeline, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
    pipe,
};
use tracing::warn;

use crate::{
    error::AppError,
    store::{NumberStore, Ticket},
};

pub const TICKETS_KEY: &str = "tickets";
pub const CREATED_AT_KEY: &str = "tickets:created_at";

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, AppError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).map_err(unavailable)?;

    client
        .get_connection_manager_with_config(config)
        .await
        .map_err(unavailable)
}

fn unavailable(e: RedisError) -> AppError {
    warn!("Redis error: {e}");
    AppError::StoreUnavailable(e.to_string())
}

/// `SADD` reply first, the `HSETNX` reply is ignored.
fn insert_pipeline(value: Ticket, created_at: &str) -> Pipeline {
    let mut pipeline = pipe();
    pipeline
        .atomic()
        .sadd(TICKETS_KEY, value)
        .hset_nx(CREATED_AT_KEY, value, created_at)
        .ignore();

    pipeline
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        Ok(Self::new(init_redis(redis_url).await?))
    }
}

impl NumberStore for RedisStore {
    async fn exists(&self, value: Ticket) -> Result<bool, AppError> {
        let mut connection = self.connection.clone();

        connection
            .sismember(TICKETS_KEY, value)
            .await
            .map_err(unavailable)
    }

    async fn insert(&self, value: Ticket) -> Result<(), AppError> {
        let mut connection = self.connection.clone();

        let (added,): (u32,) = insert_pipeline(value, &Utc::now().to_rfc3339())
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;

        if added == 0 {
            return Err(AppError::StoreConflict(value));
        }

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Ticket>, AppError> {
        let mut connection = self.connection.clone();

        connection.smembers(TICKETS_KEY).await.map_err(unavailable)
    }
}
