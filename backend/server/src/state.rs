use std::sync::Arc;

use crate::{config::RaffleConfig, draw::DrawEngine, issuer::Issuer, store::NumberStore};

pub struct AppState<S> {
    pub store: S,
    pub issuer: Issuer,
    pub draw_engine: DrawEngine,
}

impl<S: NumberStore> AppState<S> {
    pub fn new(raffle: RaffleConfig, store: S) -> Arc<Self> {
        Arc::new(Self {
            store,
            issuer: Issuer::new(raffle.clone()),
            draw_engine: DrawEngine::new(raffle),
        })
    }
}
