use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::AppError,
    state::AppState,
    store::{NumberStore, Ticket},
    utils::{get_amount, get_count, get_fields, get_pinned},
};

#[derive(Serialize)]
pub struct Numbers {
    numbers: Vec<Ticket>,
}

#[derive(Serialize)]
pub struct Winners {
    ganadores: Vec<Ticket>,
}

pub async fn issue_handler<S: NumberStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let amount = get_fields(&body).and_then(|fields| get_amount(&fields))?;

    let mut rng = StdRng::from_entropy();
    let numbers = state
        .issuer
        .issue(&state.store, amount, &mut rng)
        .await
        .inspect_err(|e| warn!("Issuance for amount {amount} rejected: {e}"))?;

    Ok((StatusCode::CREATED, Json(Numbers { numbers })))
}

pub async fn draw_handler<S: NumberStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let fields = get_fields(&body)?;
    let count = get_count(&fields)?;
    let pinned = get_pinned(&fields)?;

    let mut rng = StdRng::from_entropy();
    let ganadores = state
        .draw_engine
        .draw(&state.store, count, &pinned, &mut rng)
        .await
        .inspect_err(|e| warn!("Draw of {count} winners rejected: {e}"))?;

    info!("Winners: {ganadores:?}");
    Ok((StatusCode::OK, Json(Winners { ganadores })))
}

pub async fn numbers_handler<S: NumberStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, AppError> {
    let mut numbers = state.store.list().await?;
    numbers.sort_unstable();

    Ok((StatusCode::OK, Json(Numbers { numbers })))
}
