use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use engage_utils::scoring::SubmittedAnswer;
use models::{Event, Feedback, MerchOrder, Merchandise};
use serde::Deserialize;
use tracing::info;

use crate::config::AppState;
use crate::db;
use crate::error::Error;
use crate::principal::Principal;

#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i64,
    pub comment: Option<String>,
}

pub async fn get_status_ping() -> impl IntoResponse {
    info!("Status");
    StatusCode::OK
}

pub async fn get_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, Error> {
    let events = db::list_events(&state.pool).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<db::EventDetail>, Error> {
    let detail = db::get_event_detail(&state.pool, event_id).await?;
    Ok(Json(detail))
}

pub async fn post_start_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
) -> Result<Json<db::EventDetail>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let detail = db::start_event(&state.pool, event_id, &user).await?;
    Ok(Json(detail))
}

pub async fn post_submit_quiz(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
    Json(request): Json<SubmitQuizRequest>,
) -> Result<Json<db::SubmitOutcome>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let outcome = db::submit_quiz(&state.pool, event_id, &user, &request.answers).await?;
    Ok(Json(outcome))
}

pub async fn post_feedback(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<Feedback>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let feedback =
        db::submit_feedback(&state.pool, event_id, &user, request.rating, request.comment).await?;
    Ok(Json(feedback))
}

pub async fn get_completed_events(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<db::CompletedEvent>>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let completed = db::completed_events(&state.pool, &user).await?;
    Ok(Json(completed))
}

pub async fn get_my_feedbacks(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Feedback>>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let feedbacks = db::my_feedbacks(&state.pool, &user).await?;
    Ok(Json(feedbacks))
}

pub async fn get_merchandise_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<Merchandise>>, Error> {
    let items = db::list_merchandise(&state.pool).await?;
    Ok(Json(items))
}

pub async fn get_merchandise_item(
    State(state): State<AppState>,
    Path(merch_id): Path<i64>,
) -> Result<Json<Merchandise>, Error> {
    let merch = db::get_merchandise(&state.pool, merch_id).await?;
    Ok(Json(merch))
}

pub async fn post_purchase(
    State(state): State<AppState>,
    Path(merch_id): Path<i64>,
    principal: Principal,
    Json(request): Json<db::PurchaseRequest>,
) -> Result<Json<db::PurchaseOutcome>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let outcome = db::purchase(&state.pool, merch_id, &user, request).await?;
    Ok(Json(outcome))
}

pub async fn get_orders(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<MerchOrder>>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let orders = db::list_orders(&state.pool, &user).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    principal: Principal,
) -> Result<Json<MerchOrder>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let order = db::get_order(&state.pool, order_id, &user).await?;
    Ok(Json(order))
}

pub async fn get_points(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<db::PointsOverview>, Error> {
    let user = db::require_user(&state.pool, principal.user_id).await?;
    let overview = db::points_overview(&state.pool, &user).await?;
    Ok(Json(overview))
}
