use crate::engine::frame_manager::FrameStats;
use crate::models::animation::AnimationId;
use crate::web::api::ApiContext;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Serialize)]
pub struct StatusView {
    pub frame_stats: FrameStats,
    pub channels: Vec<u8>,
    pub tasks: HashMap<&'static str, usize>,
    pub current_animation: Option<AnimationId>,
    pub animation_running: bool,
    pub edit_mode: bool,
    pub lamp_white_mode: bool,
}

pub async fn get_status(State(context): State<ApiContext>) -> Json<StatusView> {
    Json(StatusView {
        frame_stats: context.core.frame_manager.stats(),
        channels: context.core.frame_manager.gpios(),
        tasks: context.core.task_registry.summary(),
        current_animation: context.animations.current_state().map(|s| s.id),
        animation_running: context.animations.is_running().await,
        edit_mode: context.app.edit_mode(),
        lamp_white_mode: context.app.lamp_white_mode(),
    })
}
