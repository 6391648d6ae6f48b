//! Whole-system shutdown: a running engine + render loop wound down by the
//! coordinator, leaving black strips and no live tasks.

use rpi_led_zone_controller::config::presets::ColorPresets;
use rpi_led_zone_controller::engine::animation::AnimationEngine;
use rpi_led_zone_controller::engine::frame_manager::FrameManager;
use rpi_led_zone_controller::engine::indicator::SelectedZoneIndicator;
use rpi_led_zone_controller::engine::transition::{Easing, TransitionConfig, TransitionService};
use rpi_led_zone_controller::events::EventBus;
use rpi_led_zone_controller::hardware::VirtualStrip;
use rpi_led_zone_controller::led::{LedChannel, ZonePixelMapper};
use rpi_led_zone_controller::lifecycle::handlers::{
    AnimationShutdownHandler, FrameManagerShutdownHandler, IndicatorShutdownHandler,
    LedClearShutdownHandler, TaskCancellationHandler,
};
use rpi_led_zone_controller::lifecycle::task_registry::TaskCategory;
use rpi_led_zone_controller::lifecycle::{ShutdownCoordinator, TaskRegistry};
use rpi_led_zone_controller::models::animation::AnimationId;
use rpi_led_zone_controller::models::state::PersistedState;
use rpi_led_zone_controller::models::zone::{ZoneConfig, ZoneId, ZoneRenderMode};
use rpi_led_zone_controller::services::{StateSaver, ZoneService};
use rpi_led_zone_controller::storage::StateStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn zone(id: ZoneId, start: usize, count: usize) -> ZoneConfig {
    ZoneConfig {
        id,
        display_name: id.as_key().to_string(),
        gpio: 18,
        pixel_count: count,
        enabled: true,
        reversed: false,
        start_index: start,
        end_index: start + count - 1,
    }
}

#[tokio::test]
async fn coordinator_winds_the_whole_stack_down() {
    let configs = vec![zone(ZoneId::Floor, 0, 6), zone(ZoneId::Lamp, 6, 4)];
    let mapper = ZonePixelMapper::new(&configs).unwrap();
    let channel = LedChannel::new(18, Box::new(VirtualStrip::new(10)), mapper);
    let fm = FrameManager::new(vec![channel], 120);

    let bus = EventBus::new();
    let registry = TaskRegistry::new();
    let transitions = TransitionService::new(Arc::clone(&fm));

    let store = StateStore::new(std::env::temp_dir().join(format!(
        "led-shutdown-test-{}.json",
        std::process::id()
    )));
    let mut persisted = PersistedState::default();
    persisted.application.edit_mode_on = false;
    let saver = StateSaver::new(store, persisted.clone());
    let zones = ZoneService::new(
        configs,
        ColorPresets::builtin(),
        &persisted,
        Arc::clone(&bus),
        saver,
    );

    // Put every zone into animation mode so the engine runs on both.
    zones
        .set_render_mode(ZoneId::Floor, ZoneRenderMode::Animation)
        .await
        .unwrap();
    zones
        .set_render_mode(ZoneId::Lamp, ZoneRenderMode::Animation)
        .await
        .unwrap();

    let engine = AnimationEngine::new(
        Arc::clone(&fm),
        Arc::clone(&transitions),
        Arc::clone(&registry),
        zones.snapshot_fn(),
    );
    let indicator = SelectedZoneIndicator::new(
        Arc::clone(&fm),
        Arc::clone(&registry),
        zones.snapshot_fn(),
    );

    {
        let fm = Arc::clone(&fm);
        registry.create_tracked_task(TaskCategory::Render, "frame render loop", async move {
            fm.run().await;
            Ok(())
        });
    }

    engine
        .start(
            AnimationId::ColorCycle,
            Vec::new(),
            Some(TransitionConfig {
                duration_ms: 40,
                steps: 4,
                easing: Easing::Linear,
            }),
            None,
            HashMap::new(),
        )
        .await
        .unwrap();

    // The animation visibly lights the strip.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let lit = fm
        .channel_snapshot(18)
        .unwrap()
        .iter()
        .any(|c| c.to_rgb() != [0, 0, 0]);
    assert!(lit, "animation should light pixels before shutdown");

    let coordinator = ShutdownCoordinator::new();
    coordinator.register(AnimationShutdownHandler::new(Arc::clone(&engine)));
    coordinator.register(IndicatorShutdownHandler::new(Arc::clone(&indicator)));
    coordinator.register(FrameManagerShutdownHandler::new(Arc::clone(&fm)));
    coordinator.register(LedClearShutdownHandler::new(Arc::clone(&fm)));
    coordinator.register(TaskCancellationHandler::new(Arc::clone(&registry)));

    coordinator.trigger("test shutdown");
    coordinator.shutdown_all().await;

    // Strip cleared, engine stopped, no live tracked tasks.
    let frame = fm.channel_snapshot(18).unwrap();
    for pixel in &frame {
        assert_eq!(pixel.to_rgb(), [0, 0, 0]);
    }
    assert!(!engine.is_running().await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(registry.active().is_empty(), "all tasks drained");
}
