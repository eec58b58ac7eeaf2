//! Flow catalog endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::flow::{FlowKind, FlowVariant};
use crate::rest::dto::{FlowResponse, VariantResponse};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// List every flow kind with its variants
#[utoipa::path(
    get,
    path = "/api/v1/flows",
    tag = "Flows",
    responses(
        (status = 200, description = "Flow catalog", body = Vec<FlowResponse>)
    )
)]
pub async fn list(State(state): State<ApiState>) -> Json<Vec<FlowResponse>> {
    let flows = FlowKind::all()
        .iter()
        .map(|kind| FlowResponse::new(*kind, state.config.is_enabled(*kind)))
        .collect();
    Json(flows)
}

/// Get one variant, e.g. `renew-adult-child`
#[utoipa::path(
    get,
    path = "/api/v1/flows/{kind}/{variant}",
    tag = "Flows",
    params(
        ("kind" = String, Path, description = "Flow kind (`apply`, `renew`, `protected-renew`)"),
        ("variant" = String, Path, description = "Applicant type (`adult`, `adult-child`, `child`)")
    ),
    responses(
        (status = 200, description = "Variant details", body = VariantResponse),
        (status = 404, description = "Unknown flow kind or variant", body = ErrorResponse)
    )
)]
pub async fn get_variant(
    Path((kind, variant)): Path<(String, String)>,
) -> Result<Json<VariantResponse>, ApiError> {
    let flow_kind = FlowKind::from_slug(&kind)
        .ok_or_else(|| ApiError::NotFound(format!("Flow '{}' not found", kind)))?;
    let found = FlowVariant::from_slug(flow_kind, &variant).ok_or_else(|| {
        ApiError::NotFound(format!("Variant '{}' not found in '{}'", variant, kind))
    })?;

    Ok(Json(VariantResponse::from(&found)))
}
