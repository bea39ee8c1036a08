//! # Draw Engine
//!
//! Picks the winners of a raffle from the pool of issued tickets.
//!
//! ## Placements
//! - Manual placements come first, in the order they were given (first slot is first place)
//! - Manual placements are operator overrides, they are never checked against the pool
//! - Remaining places are filled from a uniform shuffle of the pool minus the manual values
//! - More manual placements than winners truncates the placements, no error
//!
//! A draw never mutates the store, so the same ticket can win again in a later draw.
use std::collections::HashSet;

use rand::Rng;
use tracing::info;

use crate::{
    config::RaffleConfig,
    error::AppError,
    store::{NumberStore, Ticket},
};

pub struct DrawEngine {
    config: RaffleConfig,
}

impl DrawEngine {
    pub fn new(config: RaffleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RaffleConfig {
        &self.config
    }

    /// Checks the request and returns the manual placements that are set, in order.
    pub fn validate(
        &self,
        target: i64,
        pinned: &[Option<Ticket>],
    ) -> Result<Vec<Ticket>, AppError> {
        if target <= 0 {
            return Err(AppError::InvalidCount);
        }

        let mut seen = HashSet::new();
        let mut prefix = Vec::with_capacity(pinned.len());

        for &value in pinned.iter().flatten() {
            if !seen.insert(value) {
                return Err(AppError::DuplicatePinnedValue);
            }
            prefix.push(value);
        }

        Ok(prefix)
    }

    pub async fn draw<S, R>(
        &self,
        store: &S,
        target: i64,
        pinned: &[Option<Ticket>],
        rng: &mut R,
    ) -> Result<Vec<Ticket>, AppError>
    where
        S: NumberStore,
        R: Rng + Send,
    {
        let mut winners = self.validate(target, pinned)?;
        let target = usize::try_from(target).map_err(|_| AppError::InvalidCount)?;

        if winners.len() >= target {
            winners.truncate(target);
            return Ok(winners);
        }

        let mut pool: Vec<Ticket> = store
            .list()
            .await?
            .into_iter()
            .filter(|value| !winners.contains(value))
            .collect();

        let needed = target - winners.len();
        if pool.len() < needed {
            return Err(AppError::InsufficientParticipants {
                needed,
                available: pool.len(),
            });
        }

        shuffle(&mut pool, rng);
        winners.extend_from_slice(&pool[..needed]);

        info!(
            "Drew {} winners ({} manual) from a pool of {}",
            winners.len(),
            target - needed,
            pool.len()
        );

        Ok(winners)
    }
}

/// Fisher-Yates, walking down from the last index.
pub fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
