use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use service_core::error::AppError;
use service_core::middleware::RequestId;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dtos::{ApiResponse, DialogData, DialogRequest};
use crate::startup::AppState;

#[tracing::instrument(skip(state, request_id, payload), fields(request_id = %request_id.as_str()))]
pub async fn generate_dialog(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<DialogRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DialogData>>, AppError> {
    validate_user_id(&user_id)?;

    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected dialog payload");
        AppError::from(rejection)
    })?;
    request.validate()?;

    let data = state
        .dialog
        .generate(
            user_id.trim(),
            &request.text,
            request.eval.as_ref(),
            Some(request_id.as_str()),
        )
        .await?;

    Ok(Json(ApiResponse::success(data)))
}

fn validate_user_id(user_id: &str) -> Result<(), AppError> {
    let code = match user_id.trim() {
        "" => "required",
        "." | ".." => "dot_segment",
        _ => return Ok(()),
    };

    let mut errors = ValidationErrors::new();
    let mut error = ValidationError::new(code);
    error.message = Some("Invalid user ID".into());
    errors.add("user_id", error);
    Err(AppError::ValidationError(errors))
}
