//! Wallet endpoints: balance, ledger history and provider top-ups.

use api_types::wallet::{
    Direction, FundRequest, FundResponse, LedgerEntryView, LedgerQuery, LedgerResponse,
    WalletView,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::Money;

use crate::{ServerError, server::ServerState, user};

const DEFAULT_LIMIT: u64 = 50;

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.wallet_snapshot(user.id).await?;
    Ok(Json(WalletView {
        balance_minor: wallet.balance.minor(),
        last_funded_at: wallet.last_funded_at,
    }))
}

pub async fn transactions(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<LedgerResponse>, ServerError> {
    let entries = state
        .engine
        .ledger_entries(user.id, query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;

    let transactions = entries
        .into_iter()
        .map(|entry| LedgerEntryView {
            id: entry.id,
            direction: match entry.direction {
                engine::Direction::Debit => Direction::Debit,
                engine::Direction::Credit => Direction::Credit,
            },
            category: entry.category.as_str().to_string(),
            amount_minor: entry.amount.minor(),
            status: entry.status,
            reference: entry.reference,
            description: entry.description,
            created_at: entry.created_at,
        })
        .collect();
    Ok(Json(LedgerResponse { transactions }))
}

/// Ask the provider for a checkout; the wallet is credited by the webhook.
pub async fn fund(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<FundRequest>,
) -> Result<Json<FundResponse>, ServerError> {
    let amount = Money::new(payload.amount_minor);
    if !amount.is_positive() {
        return Err(ServerError::Engine(engine::EngineError::InvalidAmount(
            "amount must be > 0".to_string(),
        )));
    }
    let provider = state
        .provider
        .as_ref()
        .ok_or_else(|| ServerError::Generic("payments are not configured".to_string()))?;

    let init = provider
        .initialize_funding(user.id, &user.username, &user.email, amount)
        .await?;
    Ok(Json(FundResponse {
        authorization_url: init.authorization_url,
        access_code: init.access_code,
        reference: init.reference,
    }))
}
