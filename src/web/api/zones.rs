use crate::error::CoreError;
use crate::models::state::ColorSpec;
use crate::models::zone::{Zone, ZoneId, ZoneRenderMode};
use crate::web::api::{ApiContext, ApiError};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct ZoneView {
    pub id: String,
    pub display_name: String,
    pub gpio: u8,
    pub pixel_count: usize,
    pub enabled: bool,
    pub reversed: bool,
    pub render_mode: ZoneRenderMode,
    pub color: ColorSpec,
    pub rgb: [u8; 3],
    pub brightness: u8,
    pub is_on: bool,
}

impl ZoneView {
    fn from_zone(zone: &Zone) -> Self {
        Self {
            id: zone.config.id.as_key().to_string(),
            display_name: zone.config.display_name.clone(),
            gpio: zone.config.gpio,
            pixel_count: zone.config.pixel_count,
            enabled: zone.config.enabled,
            reversed: zone.config.reversed,
            render_mode: zone.state.render_mode,
            color: ColorSpec::from_color(&zone.state.color),
            rgb: zone.state.color.to_rgb(),
            brightness: zone.state.brightness,
            is_on: zone.state.is_on,
        }
    }
}

fn parse_zone(key: &str) -> Result<ZoneId, ApiError> {
    ZoneId::from_key(key)
        .ok_or_else(|| ApiError(CoreError::NotFound(format!("zone '{}' is unknown", key))))
}

pub async fn get_zones(State(context): State<ApiContext>) -> Json<Vec<ZoneView>> {
    let zones = context.zones.snapshot();
    Json(zones.iter().map(ZoneView::from_zone).collect())
}

pub async fn get_zone(
    State(context): State<ApiContext>,
    Path(zone): Path<String>,
) -> Result<Json<ZoneView>, ApiError> {
    let id = parse_zone(&zone)?;
    let zone = context.zones.get(id)?;
    Ok(Json(ZoneView::from_zone(&zone)))
}

#[derive(Deserialize)]
pub struct ColorUpdate {
    pub color: ColorSpec,
}

pub async fn update_color(
    State(context): State<ApiContext>,
    Path(zone): Path<String>,
    Json(body): Json<ColorUpdate>,
) -> Result<Json<ZoneView>, ApiError> {
    let id = parse_zone(&zone)?;
    context.zones.set_color_spec(id, &body.color).await?;
    Ok(Json(ZoneView::from_zone(&context.zones.get(id)?)))
}

#[derive(Deserialize)]
pub struct BrightnessUpdate {
    pub brightness: u8,
}

pub async fn update_brightness(
    State(context): State<ApiContext>,
    Path(zone): Path<String>,
    Json(body): Json<BrightnessUpdate>,
) -> Result<Json<ZoneView>, ApiError> {
    let id = parse_zone(&zone)?;
    context.zones.set_brightness(id, body.brightness).await?;
    Ok(Json(ZoneView::from_zone(&context.zones.get(id)?)))
}

#[derive(Deserialize)]
pub struct RenderModeUpdate {
    pub render_mode: ZoneRenderMode,
}

pub async fn update_render_mode(
    State(context): State<ApiContext>,
    Path(zone): Path<String>,
    Json(body): Json<RenderModeUpdate>,
) -> Result<Json<ZoneView>, ApiError> {
    let id = parse_zone(&zone)?;
    context.zones.set_render_mode(id, body.render_mode).await?;
    Ok(Json(ZoneView::from_zone(&context.zones.get(id)?)))
}

#[derive(Deserialize)]
pub struct PowerUpdate {
    pub on: bool,
}

pub async fn update_power(
    State(context): State<ApiContext>,
    Path(zone): Path<String>,
    Json(body): Json<PowerUpdate>,
) -> Result<Json<ZoneView>, ApiError> {
    let id = parse_zone(&zone)?;
    context.zones.set_power(id, body.on).await?;
    Ok(Json(ZoneView::from_zone(&context.zones.get(id)?)))
}
