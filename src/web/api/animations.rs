use crate::error::CoreError;
use crate::models::animation::{AnimationConfig, AnimationId, AnimationState};
use crate::models::parameter::{ParamId, ParamValue};
use crate::web::api::{ApiContext, ApiError};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize)]
pub struct AnimationListView {
    pub animations: Vec<AnimationConfig>,
    pub current: Option<AnimationState>,
    pub running: bool,
}

pub async fn get_animations(State(context): State<ApiContext>) -> Json<AnimationListView> {
    Json(AnimationListView {
        animations: context.animations.list(),
        current: context.animations.current_state(),
        running: context.animations.is_running().await,
    })
}

#[derive(Deserialize)]
pub struct StartRequest {
    pub id: String,
    #[serde(default)]
    pub parameters: HashMap<String, ParamValue>,
}

pub async fn start_animation(
    State(context): State<ApiContext>,
    Json(body): Json<StartRequest>,
) -> Result<Json<AnimationListView>, ApiError> {
    let id = AnimationId::from_key(&body.id)
        .ok_or_else(|| ApiError(CoreError::NotFound(format!("animation '{}'", body.id))))?;

    let mut overrides = HashMap::new();
    for (key, value) in body.parameters {
        let param = ParamId::from_key(&key).ok_or_else(|| {
            ApiError(CoreError::InvalidArgument(format!(
                "unknown parameter '{}'",
                key
            )))
        })?;
        overrides.insert(param, value);
    }

    context.animations.start(id, overrides).await?;
    Ok(Json(AnimationListView {
        animations: context.animations.list(),
        current: context.animations.current_state(),
        running: context.animations.is_running().await,
    }))
}

pub async fn stop_animation(
    State(context): State<ApiContext>,
) -> Result<Json<AnimationListView>, ApiError> {
    context.animations.stop().await?;
    Ok(Json(AnimationListView {
        animations: context.animations.list(),
        current: context.animations.current_state(),
        running: context.animations.is_running().await,
    }))
}

/// Either an absolute value or an encoder-style delta.
#[derive(Deserialize)]
pub struct ParameterUpdate {
    pub value: Option<ParamValue>,
    pub delta: Option<i64>,
}

#[derive(Serialize)]
pub struct ParameterView {
    pub param: String,
    pub value: ParamValue,
}

pub async fn update_parameter(
    State(context): State<ApiContext>,
    Path(param): Path<String>,
    Json(body): Json<ParameterUpdate>,
) -> Result<Json<ParameterView>, ApiError> {
    let id = ParamId::from_key(&param)
        .ok_or_else(|| ApiError(CoreError::NotFound(format!("parameter '{}'", param))))?;

    let value = match (body.value, body.delta) {
        (Some(value), None) => context.animations.set_parameter(id, value).await?,
        (None, Some(delta)) => context.animations.adjust_parameter(id, delta).await?,
        _ => {
            return Err(ApiError(CoreError::InvalidArgument(
                "provide exactly one of 'value' or 'delta'".into(),
            )))
        }
    };

    Ok(Json(ParameterView {
        param: id.as_key().to_string(),
        value,
    }))
}
