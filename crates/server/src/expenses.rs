//! Expense endpoints.

use api_types::expense::{
    ExpenseDetailResponse, ExpenseListResponse, ExpenseNew, ExpenseUpdate, ExpenseView,
    SplitState, SplitView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{ExpenseCmd, Money};

use crate::{ServerError, server::ServerState, user};

fn map_state(state: engine::SplitState) -> SplitState {
    match state {
        engine::SplitState::Open => SplitState::Open,
        engine::SplitState::PartiallySettled => SplitState::PartiallySettled,
        engine::SplitState::Settled => SplitState::Settled,
    }
}

fn expense_view(expense: engine::Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        group_id: expense.group_id,
        paid_by: expense.paid_by,
        description: expense.description,
        amount_minor: expense.amount.minor(),
        created_at: expense.created_at,
    }
}

fn detail_response(detail: engine::ExpenseDetail) -> ExpenseDetailResponse {
    let payer_share_minor = detail.payer_share().minor();
    let splits = detail
        .splits
        .iter()
        .map(|split| SplitView {
            id: split.id,
            owed_by: split.owed_by,
            amount_owed_minor: split.amount_owed.minor(),
            amount_paid_minor: split.amount_paid.minor(),
            state: map_state(split.state()),
        })
        .collect();
    ExpenseDetailResponse {
        expense: expense_view(detail.expense),
        payer_share_minor,
        splits,
    }
}

pub async fn expense_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseDetailResponse>), ServerError> {
    let detail = state
        .engine
        .create_expense(
            ExpenseCmd::new(group_id, user.id, Money::new(payload.amount_minor))
                .description(payload.description),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(detail_response(detail))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let expenses = state
        .engine
        .list_group_expenses(group_id, user.id)
        .await?
        .into_iter()
        .map(expense_view)
        .collect();
    Ok(Json(ExpenseListResponse { expenses }))
}

pub async fn detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<i64>,
) -> Result<Json<ExpenseDetailResponse>, ServerError> {
    let detail = state.engine.expense_detail(expense_id, user.id).await?;
    Ok(Json(detail_response(detail)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<i64>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseDetailResponse>, ServerError> {
    if payload.description.is_none() && payload.amount_minor.is_none() {
        return Err(ServerError::Generic(
            "provide at least one of description or amount_minor".to_string(),
        ));
    }

    let mut update = engine::ExpenseUpdate::new();
    if let Some(description) = payload.description {
        update = update.description(description);
    }
    if let Some(amount_minor) = payload.amount_minor {
        update = update.amount(Money::new(amount_minor));
    }

    let detail = state
        .engine
        .update_expense(expense_id, user.id, update)
        .await?;
    Ok(Json(detail_response(detail)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(expense_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
