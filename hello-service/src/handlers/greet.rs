use crate::middleware::RequestPrincipal;
use crate::models::{GreetRequest, GreetResponse};
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;

/// `POST /api/v0/greet`
pub async fn greet(
    State(state): State<AppState>,
    principal: RequestPrincipal,
    Json(request): Json<GreetRequest>,
) -> Result<Json<GreetResponse>, AppError> {
    let response = state.greeter.greet(&principal, &request).await?;
    Ok(Json(response))
}
