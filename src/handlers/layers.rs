//! Layer and feature handlers

use std::num::IntErrorKind;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::{require_editor, require_reader, Principal};
use crate::models::{
    CreateFeature, DeleteFeature, DeleteFeatureOut, FeatureCollectionOut, FeatureOut,
    LayerListOut, ListFeaturesQuery, PatchFeatureOut, UpdateFeature,
};
use crate::{AppError, AppResult, AppState};

/// List all layers
pub async fn list_layers(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<LayerListOut>> {
    require_reader(&principal)?;
    Ok(Json(state.layers.list_layers().await?))
}

/// Features of a layer intersecting `bbox`
pub async fn list_features(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(layer_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ListFeaturesQuery>,
) -> AppResult<Json<FeatureCollectionOut>> {
    require_reader(&principal)?;
    let limit = parse_limit(query.limit.as_deref())?;
    let collection = state
        .features
        .list_features(layer_id, query.bbox.as_deref(), limit)
        .await?;
    Ok(Json(collection))
}

pub async fn create_feature(
    State(state): State<AppState>,
    principal: Principal,
    AppPath(layer_id): AppPath<Uuid>,
    AppJson(req): AppJson<CreateFeature>,
) -> AppResult<impl IntoResponse> {
    require_editor(&principal)?;
    let feature = state.features.create_feature(layer_id, req).await?;

    let location = format!("/api/v1/layers/{}/features/{}", layer_id, feature.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(feature)))
}

pub async fn get_feature(
    State(state): State<AppState>,
    principal: Principal,
    AppPath((layer_id, feature_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<FeatureOut>> {
    require_reader(&principal)?;
    Ok(Json(state.features.get_feature(layer_id, feature_id).await?))
}

/// Versioned partial update
pub async fn patch_feature(
    State(state): State<AppState>,
    principal: Principal,
    AppPath((layer_id, feature_id)): AppPath<(Uuid, Uuid)>,
    AppJson(req): AppJson<UpdateFeature>,
) -> AppResult<Json<PatchFeatureOut>> {
    require_editor(&principal)?;
    req.validate()?;

    let feature = state.features.update_feature(layer_id, feature_id, req).await?;
    Ok(Json(PatchFeatureOut { feature }))
}

/// Versioned delete; the expected version travels in the body
pub async fn delete_feature(
    State(state): State<AppState>,
    principal: Principal,
    AppPath((layer_id, feature_id)): AppPath<(Uuid, Uuid)>,
    AppJson(req): AppJson<DeleteFeature>,
) -> AppResult<Json<DeleteFeatureOut>> {
    require_editor(&principal)?;
    req.validate()?;

    let out = state
        .features
        .delete_feature(layer_id, feature_id, req.version)
        .await?;
    Ok(Json(out))
}

/// Any integer is accepted and later clamped; out-of-range integers
/// saturate. Only non-integers are rejected.
fn parse_limit(raw: Option<&str>) -> AppResult<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match raw.trim().parse::<i64>() {
        Ok(limit) => Ok(Some(limit)),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(Some(i64::MAX)),
            IntErrorKind::NegOverflow => Ok(Some(i64::MIN)),
            _ => Err(AppError::ValidationError(format!(
                "limit must be an integer, got '{}'",
                raw
            ))),
        },
    }
}
