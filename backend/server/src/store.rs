//! # Number Store
//!
//! Durable set of issued ticket numbers.
//!
//! ## Contract
//! - `exists`: membership check, no side effects
//! - `insert`: adds the value, must reject an already stored value with `StoreConflict`
//!   atomically so concurrent issuers can never both win the same number
//! - `list`: every stored value, order unspecified
//!
//! Each value also carries its creation timestamp. Nothing in the raffle logic reads it,
//! it is kept for whoever audits the store later.
use std::{
    collections::BTreeMap,
    future::Future,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};

use crate::error::AppError;

pub type Ticket = u32;

pub trait NumberStore: Send + Sync + 'static {
    fn exists(&self, value: Ticket) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn insert(&self, value: Ticket) -> impl Future<Output = Result<(), AppError>> + Send;

    fn list(&self) -> impl Future<Output = Result<Vec<Ticket>, AppError>> + Send;
}

/// In-process store, used for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tickets: Mutex<BTreeMap<Ticket, DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = Ticket>) -> Self {
        let now = Utc::now();

        Self {
            tickets: Mutex::new(values.into_iter().map(|value| (value, now)).collect()),
        }
    }

    pub fn created_at(&self, value: Ticket) -> Option<DateTime<Utc>> {
        self.lock().ok()?.get(&value).copied()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<Ticket, DateTime<Utc>>>, AppError> {
        self.tickets
            .lock()
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }
}

impl NumberStore for MemoryStore {
    async fn exists(&self, value: Ticket) -> Result<bool, AppError> {
        Ok(self.lock()?.contains_key(&value))
    }

    async fn insert(&self, value: Ticket) -> Result<(), AppError> {
        let mut tickets = self.lock()?;

        if tickets.contains_key(&value) {
            return Err(AppError::StoreConflict(value));
        }

        tickets.insert(value, Utc::now());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Ticket>, AppError> {
        Ok(self.lock()?.keys().copied().collect())
    }
}
