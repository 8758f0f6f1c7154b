//! Account endpoint handlers: registration, profile, wallet, history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    LinkWalletRequest, PaginationMeta, PaginationParams, ReferralRootResponse, RegisterRequest,
    TransactionDto, TransactionListResponse, UserResponse, UserSummaryDto,
};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, ServiceError};

/// `POST /users` — Register a new user, optionally under a referral code.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid email, unknown referral code, or
/// duplicate registration.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Accounts",
    summary = "Register a user",
    description = "Creates a user account. When a referral code is supplied, the referral edge is created atomically with signup; edges are validated for acyclicity here and never again.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid email or referral code", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .account_service
        .register(&req.email, req.referral_code.as_deref())
        .await?;

    // The edge was created in the same call; reflect the referrer id
    // without a second lookup when no code was supplied.
    let referrer_id = match req.referral_code {
        Some(_) => state.account_service.profile(user.id).await?.referrer_id,
        None => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from_record(user, referrer_id.map(i64::from))),
    ))
}

/// `GET /users/{id}` — Fetch a user profile.
///
/// # Errors
///
/// Returns [`ServiceError::UserNotFound`] when the user does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Accounts",
    summary = "Get user profile",
    params(
        ("id" = i64, Path, description = "User id"),
    ),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let profile = state.account_service.profile(UserId::new(id)).await?;
    Ok(Json(UserResponse::from(profile)))
}

/// `PUT /users/{id}/wallet` — Link a wallet address.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid address or unknown user.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/wallet",
    tag = "Accounts",
    summary = "Link wallet address",
    description = "Sets the wallet address reward transfers are sent to. Required before this user can receive any reward tier.",
    params(
        ("id" = i64, Path, description = "User id"),
    ),
    request_body = LinkWalletRequest,
    responses(
        (status = 200, description = "Wallet linked", body = UserResponse),
        (status = 400, description = "Invalid wallet address", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn link_wallet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<LinkWalletRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = UserId::new(id);
    state
        .account_service
        .link_wallet(user, &req.wallet_address)
        .await?;
    let profile = state.account_service.profile(user).await?;
    Ok(Json(UserResponse::from(profile)))
}

/// `GET /users/{id}/transactions` — Paginated transaction history.
///
/// # Errors
///
/// Returns [`ServiceError::UserNotFound`] when the user does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/transactions",
    tag = "Accounts",
    summary = "List transactions",
    params(
        ("id" = i64, Path, description = "User id"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated transaction list", body = TransactionListResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let params = params.clamped();
    let (rows, total) = state
        .account_service
        .transactions(UserId::new(id), params.page, params.per_page)
        .await?;

    let total_pages = if total == 0 {
        0
    } else {
        total.div_ceil(params.per_page)
    };

    Ok(Json(TransactionListResponse {
        data: rows.into_iter().map(TransactionDto::from).collect(),
        pagination: PaginationMeta {
            page: params.page,
            per_page: params.per_page,
            total,
            total_pages,
        },
    }))
}

/// `GET /users/{id}/referral/root` — Resolve the chain's root ancestor.
///
/// # Errors
///
/// Returns [`ServiceError::UserNotFound`] when the user does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/referral/root",
    tag = "Accounts",
    summary = "Resolve referral root",
    description = "Walks the referral chain upward and returns the root ancestor, or null when the user has no referrer.",
    params(
        ("id" = i64, Path, description = "User id"),
    ),
    responses(
        (status = 200, description = "Root ancestor (possibly null)", body = ReferralRootResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn get_referral_root(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let root = state.account_service.find_root(UserId::new(id)).await?;
    Ok(Json(ReferralRootResponse {
        root: root.map(UserSummaryDto::from),
    }))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/{id}", get(get_profile))
        .route("/users/{id}/wallet", put(link_wallet))
        .route("/users/{id}/transactions", get(list_transactions))
        .route("/users/{id}/referral/root", get(get_referral_root))
}
