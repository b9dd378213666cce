use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::{net::SocketAddr, sync::Arc};

use crate::{
    PaymentProvider, balances, expenses, groups, invitations, settlement, user, wallet, webhook,
};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    /// Absent when no provider is configured; funding requests then fail.
    pub provider: Option<Arc<PaymentProvider>>,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::PasswordHash.eq(engine::password_hash(auth_header.password())))
        .one(&state.db)
        .await
        .map_err(|err| {
            tracing::error!("auth lookup failed: {err}");
            StatusCode::UNAUTHORIZED
        })?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/groups", post(groups::group_new))
        .route("/groups/{id}/members", post(groups::member_add))
        .route(
            "/groups/{id}/expenses",
            post(expenses::expense_new).get(expenses::list),
        )
        .route("/groups/{id}/summary", get(balances::group_summary))
        .route(
            "/groups/{id}/invitations",
            post(invitations::invite).get(invitations::list_pending),
        )
        .route(
            "/expenses/{id}",
            get(expenses::detail)
                .patch(expenses::update)
                .delete(expenses::delete),
        )
        .route("/splits/{id}/settle", post(settlement::settle))
        .route("/balances/owed", get(balances::owed))
        .route("/balances/owed-to-me", get(balances::owed_to_me))
        .route("/invitations/{token}/accept", post(invitations::accept))
        .route("/invitations/{id}/revoke", post(invitations::revoke))
        .route("/wallet", get(wallet::get))
        .route("/wallet/transactions", get(wallet::transactions))
        .route("/wallet/fund", post(wallet::fund))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        // Signed by the provider, not by a user.
        .route("/webhooks/payments", post(webhook::payments))
        .with_state(state)
}

pub async fn run(state: ServerState, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
