//! # Number Issuer
//!
//! Turns a paid amount into freshly minted, unique ticket numbers.
//!
//! Candidates are rejection sampled from the configured range. This only stays cheap while
//! the range is much larger than the number of issued tickets, so every ticket gets at most
//! `max_attempts` candidates before the issuance gives up with `IssuanceExhausted`.
//!
//! Requests for more tickets than the range has free numbers are refused before the first write.
use rand::Rng;
use tracing::{debug, info};

use crate::{
    config::RaffleConfig,
    error::AppError,
    store::{NumberStore, Ticket},
};

pub struct Issuer {
    config: RaffleConfig,
}

impl Issuer {
    pub fn new(config: RaffleConfig) -> Self {
        Self { config }
    }

    /// Number of distinct tickets the configured range can hold.
    pub fn capacity(&self) -> u64 {
        u64::from(self.config.max_number) - u64::from(self.config.min_number) + 1
    }

    pub fn ticket_count(&self, amount: f64) -> Result<u32, AppError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::InvalidAmount);
        }

        let count = (amount / self.config.unit_price).floor();
        if count < 1.0 {
            return Err(AppError::InsufficientAmount);
        }

        let capacity = self.capacity();
        if count > capacity as f64 {
            return Err(AppError::TooManyTickets {
                requested: count as u64,
                available: capacity,
            });
        }

        Ok(count as u32)
    }

    async fn check_free<S: NumberStore>(&self, store: &S, count: u32) -> Result<(), AppError> {
        let range = self.config.min_number..=self.config.max_number;
        let taken = store
            .list()
            .await?
            .into_iter()
            .filter(|value| range.contains(value))
            .count() as u64;

        let available = self.capacity().saturating_sub(taken);
        if u64::from(count) > available {
            return Err(AppError::TooManyTickets {
                requested: count.into(),
                available,
            });
        }

        Ok(())
    }

    pub async fn issue<S, R>(
        &self,
        store: &S,
        amount: f64,
        rng: &mut R,
    ) -> Result<Vec<Ticket>, AppError>
    where
        S: NumberStore,
        R: Rng + Send,
    {
        let count = self.ticket_count(amount)?;
        self.check_free(store, count).await?;

        let mut tickets = Vec::with_capacity(count.min(1024) as usize);

        for _ in 0..count {
            let ticket = self.mint(store, rng).await?;
            tickets.push(ticket);
        }

        info!("Issued {} tickets for amount {amount}", tickets.len());
        Ok(tickets)
    }

    async fn mint<S, R>(&self, store: &S, rng: &mut R) -> Result<Ticket, AppError>
    where
        S: NumberStore,
        R: Rng + Send,
    {
        for _ in 0..self.config.max_attempts {
            let candidate = rng.gen_range(self.config.min_number..=self.config.max_number);

            if store.exists(candidate).await? {
                debug!("Candidate {candidate} already issued, redrawing");
                continue;
            }

            match store.insert(candidate).await {
                Ok(()) => return Ok(candidate),
                Err(e) if e.is_retryable() => {
                    debug!("Lost insert race on {candidate}, redrawing");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::IssuanceExhausted(self.config.max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::store::MemoryStore;

    fn issuer() -> Issuer {
        Issuer::new(RaffleConfig::default())
    }

    #[test]
    fn test_invalid_amounts() {
        for amount in [0.0, -1.0, -3000.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(issuer().ticket_count(amount), Err(AppError::InvalidAmount));
        }
    }

    #[test]
    fn test_insufficient_amounts() {
        for amount in [0.01, 1.0, 2999.99] {
            assert_eq!(
                issuer().ticket_count(amount),
                Err(AppError::InsufficientAmount)
            );
        }
    }

    #[test]
    fn test_ticket_count_floors() {
        assert_eq!(issuer().ticket_count(3000.0), Ok(1));
        assert_eq!(issuer().ticket_count(5999.0), Ok(1));
        assert_eq!(issuer().ticket_count(9000.0), Ok(3));
        assert_eq!(issuer().ticket_count(10500.5), Ok(3));
    }

    #[tokio::test]
    async fn test_issue_mints_unique_tickets() {
        let store = MemoryStore::with_values([10000, 10001]);
        let mut rng = StdRng::seed_from_u64(7);

        let tickets = issuer().issue(&store, 30000.0, &mut rng).await.unwrap();

        assert_eq!(tickets.len(), 10);
        let unique: HashSet<_> = tickets.iter().copied().collect();
        assert_eq!(unique.len(), 10);

        for ticket in &tickets {
            assert!((10000..=99999).contains(ticket));
            assert!(![10000, 10001].contains(ticket));
        }

        assert_eq!(store.list().await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_validation_does_not_touch_store() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            issuer().issue(&store, 100.0, &mut rng).await,
            Err(AppError::InsufficientAmount)
        );
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_small_range_fills_up() {
        let issuer = Issuer::new(RaffleConfig {
            min_number: 1,
            max_number: 3,
            max_attempts: 200,
            ..RaffleConfig::default()
        });
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(42);

        let tickets = issuer.issue(&store, 9000.0, &mut rng).await.unwrap();
        let mut sorted = tickets.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3]);

        assert_eq!(
            issuer.issue(&store, 3000.0, &mut rng).await,
            Err(AppError::TooManyTickets {
                requested: 1,
                available: 0
            })
        );
        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_count_beyond_range_writes_nothing() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(
            issuer().issue(&store, 1e12, &mut rng).await,
            Err(AppError::TooManyTickets {
                requested: 333_333_333,
                available: 90_000
            })
        );
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_beyond_free_numbers_writes_nothing() {
        let issuer = Issuer::new(RaffleConfig {
            min_number: 1,
            max_number: 5,
            ..RaffleConfig::default()
        });
        // 77 sits outside the range and does not use up capacity
        let store = MemoryStore::with_values([1, 2, 3, 77]);
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(
            issuer.issue(&store, 9000.0, &mut rng).await,
            Err(AppError::TooManyTickets {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(store.list().await.unwrap(), vec![1, 2, 3, 77]);

        let tickets = issuer.issue(&store, 6000.0, &mut rng).await.unwrap();
        let mut sorted = tickets.clone();
        sorted.sort();
        assert_eq!(sorted, vec![4, 5]);
    }

    struct CrowdedStore;

    // Claims every candidate is taken while listing an empty pool.
    impl NumberStore for CrowdedStore {
        async fn exists(&self, _value: Ticket) -> Result<bool, AppError> {
            Ok(true)
        }

        async fn insert(&self, value: Ticket) -> Result<(), AppError> {
            Err(AppError::StoreConflict(value))
        }

        async fn list(&self) -> Result<Vec<Ticket>, AppError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_retry_cap_exhausts() {
        let issuer = Issuer::new(RaffleConfig {
            max_attempts: 10,
            ..RaffleConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(8);

        assert_eq!(
            issuer.issue(&CrowdedStore, 3000.0, &mut rng).await,
            Err(AppError::IssuanceExhausted(10))
        );
    }

    #[tokio::test]
    async fn test_seeded_issue_is_reproducible() {
        let first = issuer()
            .issue(&MemoryStore::new(), 15000.0, &mut StdRng::seed_from_u64(99))
            .await
            .unwrap();
        let second = issuer()
            .issue(&MemoryStore::new(), 15000.0, &mut StdRng::seed_from_u64(99))
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_issue_keeps_tickets_unique() {
        let issuer = Arc::new(Issuer::new(RaffleConfig {
            min_number: 10000,
            max_number: 10999,
            max_attempts: 1000,
            ..RaffleConfig::default()
        }));
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..16)
            .map(|seed| {
                let issuer = issuer.clone();
                let store = store.clone();

                tokio::spawn(async move {
                    let mut rng = StdRng::seed_from_u64(seed);
                    issuer.issue(store.as_ref(), 60000.0, &mut rng).await
                })
            })
            .collect();

        let mut issued = Vec::new();
        for handle in handles {
            issued.extend(handle.await.unwrap().unwrap());
        }

        let unique: HashSet<_> = issued.iter().copied().collect();
        assert_eq!(issued.len(), 16 * 20);
        assert_eq!(unique.len(), issued.len());
        assert_eq!(store.list().await.unwrap().len(), issued.len());
    }

    struct RacingStore {
        inner: MemoryStore,
        taken: Ticket,
    }

    // Reports the contested number as free, then loses the insert like a concurrent writer beat us.
    impl NumberStore for RacingStore {
        async fn exists(&self, value: Ticket) -> Result<bool, AppError> {
            if value == self.taken {
                return Ok(false);
            }
            self.inner.exists(value).await
        }

        async fn insert(&self, value: Ticket) -> Result<(), AppError> {
            self.inner.insert(value).await
        }

        async fn list(&self) -> Result<Vec<Ticket>, AppError> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_redraws() {
        let issuer = Issuer::new(RaffleConfig {
            min_number: 1,
            max_number: 2,
            max_attempts: 500,
            ..RaffleConfig::default()
        });
        let store = RacingStore {
            inner: MemoryStore::with_values([1]),
            taken: 1,
        };
        let mut rng = StdRng::seed_from_u64(3);

        let tickets = issuer.issue(&store, 3000.0, &mut rng).await.unwrap();

        assert_eq!(tickets, vec![2]);
    }
}
