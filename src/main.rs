use chrono::Local;
use colored::*;
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rpi_led_zone_controller::config::{init_config, AppConfig};
use rpi_led_zone_controller::context::CoreContext;
use rpi_led_zone_controller::engine::animation::AnimationEngine;
use rpi_led_zone_controller::engine::frame_manager::FrameManager;
use rpi_led_zone_controller::engine::indicator::SelectedZoneIndicator;
use rpi_led_zone_controller::engine::transition::TransitionService;
use rpi_led_zone_controller::error::CoreResult;
use rpi_led_zone_controller::events::EventBus;
use rpi_led_zone_controller::hardware::create_strip;
use rpi_led_zone_controller::input;
use rpi_led_zone_controller::led::{LedChannel, ZonePixelMapper};
use rpi_led_zone_controller::lifecycle::handlers::{
    AnimationShutdownHandler, ApiServerShutdownHandler, FrameManagerShutdownHandler,
    IndicatorShutdownHandler, LedClearShutdownHandler, TaskCancellationHandler,
};
use rpi_led_zone_controller::lifecycle::task_registry::TaskCategory;
use rpi_led_zone_controller::lifecycle::{ShutdownCoordinator, TaskRegistry};
use rpi_led_zone_controller::models::color::Color;
use rpi_led_zone_controller::models::frame::{Frame, FramePriority, FrameSource};
use rpi_led_zone_controller::models::zone::{ZoneId, ZoneRenderMode};
use rpi_led_zone_controller::services::{
    AnimationService, AppStateService, StateSaver, ZoneService,
};
use rpi_led_zone_controller::storage::StateStore;
use rpi_led_zone_controller::web::api::{router, ApiContext};
use tokio::sync::{oneshot, watch};

#[tokio::main]
async fn main() {
    // Timestamped, level-colored log lines; RUST_LOG overrides the filter.
    Builder::new()
        .format(|buf, record| {
            let level = match record.level() {
                log::Level::Error => record.level().to_string().red().bold(),
                log::Level::Warn => record.level().to_string().yellow().bold(),
                log::Level::Info => record.level().to_string().green(),
                log::Level::Debug => record.level().to_string().blue(),
                log::Level::Trace => record.level().to_string().purple(),
            };

            let message = match record.level() {
                log::Level::Error => record.args().to_string().red(),
                log::Level::Warn => record.args().to_string().yellow(),
                log::Level::Info => record.args().to_string().normal(),
                log::Level::Debug => record.args().to_string().blue(),
                log::Level::Trace => record.args().to_string().purple(),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level,
                message
            )
        })
        .filter(None, LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    info!("Starting LED Zone Controller");

    let config = match init_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // The render tick competes with DMA timing; give the process a boost
    // when we actually drive hardware.
    #[cfg(target_os = "linux")]
    if !config.virtual_strips {
        unsafe {
            libc::nice(-20);
            let pid = libc::getpid();
            let sched_param = libc::sched_param { sched_priority: 99 };
            if libc::sched_setscheduler(pid, libc::SCHED_FIFO, &sched_param) != 0 {
                warn!(
                    "Failed to set real-time scheduling: {}",
                    std::io::Error::last_os_error()
                );
            }
        }
    }

    let store = StateStore::new(config.state_file.clone());
    let persisted = match store.load() {
        Ok(state) => state,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let channels = match build_channels(&config) {
        Ok(channels) => channels,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Core context.
    let event_bus = EventBus::new();
    let task_registry = TaskRegistry::new();
    task_registry.set_event_bus(Arc::clone(&event_bus));
    let frame_manager = FrameManager::new(channels, config.fps);
    let transitions = TransitionService::new(Arc::clone(&frame_manager));
    let core = Arc::new(CoreContext {
        event_bus: Arc::clone(&event_bus),
        task_registry: Arc::clone(&task_registry),
        frame_manager: Arc::clone(&frame_manager),
        transitions: Arc::clone(&transitions),
    });

    // State services over config + persisted state.
    let saver = StateSaver::new(Arc::clone(&store), persisted.clone());
    let zones = ZoneService::new(
        config.zones.clone(),
        config.presets.clone(),
        &persisted,
        Arc::clone(&event_bus),
        Arc::clone(&saver),
    );
    let animations = AnimationService::new(
        config.animations.clone(),
        config.parameters.clone(),
        persisted.current_animation.as_ref(),
        Arc::clone(&event_bus),
        Arc::clone(&saver),
    );
    let app = AppStateService::new(
        &persisted.application,
        Arc::clone(&zones),
        Arc::clone(&event_bus),
        Arc::clone(&saver),
    );

    let engine = AnimationEngine::new(
        Arc::clone(&frame_manager),
        Arc::clone(&transitions),
        Arc::clone(&task_registry),
        zones.snapshot_fn(),
    );
    animations.set_engine(Arc::clone(&engine));

    let indicator = SelectedZoneIndicator::new(
        Arc::clone(&frame_manager),
        Arc::clone(&task_registry),
        zones.snapshot_fn(),
    );
    indicator.attach(&event_bus);

    // Render loop.
    {
        let frame_manager = Arc::clone(&frame_manager);
        task_registry.create_tracked_task(TaskCategory::Render, "frame render loop", async move {
            frame_manager.run().await;
            Ok(())
        });
    }

    if config.stdin_input {
        input::stdin::spawn(&task_registry, Arc::clone(&event_bus));
    }

    restore_visual_state(&frame_manager, &zones, &animations).await;

    // API server with a pre-bind check: a second instance must not fight
    // over the LED hardware.
    let ip_addr = match config.interface.parse::<std::net::IpAddr>() {
        Ok(addr) => addr,
        Err(e) => {
            error!(
                "Invalid network interface address '{}': {}",
                config.interface, e
            );
            std::process::exit(1);
        }
    };
    let addr = SocketAddr::from((ip_addr, config.port));
    let listener = match bind_with_retry(addr).await {
        Some(listener) => listener,
        None => {
            error!(
                "Port {} still held after all attempts; another instance is running",
                config.port
            );
            std::process::exit(2);
        }
    };

    let (api_stop_tx, api_stop_rx) = oneshot::channel::<()>();
    let (api_done_tx, api_done_rx) = watch::channel(false);

    // Shutdown coordination.
    let coordinator = ShutdownCoordinator::new();
    coordinator.register(AnimationShutdownHandler::new(Arc::clone(&engine)));
    coordinator.register(IndicatorShutdownHandler::new(Arc::clone(&indicator)));
    coordinator.register(FrameManagerShutdownHandler::new(Arc::clone(&frame_manager)));
    coordinator.register(LedClearShutdownHandler::new(Arc::clone(&frame_manager)));
    coordinator.register(ApiServerShutdownHandler::new(api_stop_tx, api_done_rx));
    coordinator.register(TaskCancellationHandler::new(Arc::clone(&task_registry)));
    coordinator.install_signal_handlers();
    coordinator.watch_critical_tasks(Arc::clone(&task_registry));

    let api_context = ApiContext::new(
        Arc::clone(&core),
        Arc::clone(&zones),
        Arc::clone(&animations),
        Arc::clone(&app),
    );
    let api = router(api_context);

    info!("Server running on http://{}", addr);
    task_registry.create_tracked_task(TaskCategory::Api, "api server", async move {
        let result = axum::serve(listener, api)
            .with_graceful_shutdown(async {
                let _ = api_stop_rx.await;
            })
            .await;
        let _ = api_done_tx.send(true);
        result.map_err(|e| {
            rpi_led_zone_controller::error::CoreError::IllegalState(format!("server error: {}", e))
        })
    });

    let reason = coordinator.wait_for_shutdown().await;
    info!("Shutting down ({})", reason);
    coordinator.shutdown_all().await;
    saver.flush();

    info!("Goodbye");
}

/// Build one LED channel per configured strip, wiring the zones of its
/// GPIO into the channel's mapper.
fn build_channels(config: &AppConfig) -> CoreResult<Vec<LedChannel>> {
    let mut channels = Vec::new();
    for strip_config in &config.hardware.strips {
        let strip = create_strip(strip_config, config.virtual_strips)?;

        let strip_zones: Vec<_> = config
            .zones
            .iter()
            .filter(|z| z.gpio == strip_config.gpio_pin)
            .cloned()
            .collect();
        let mapper = ZonePixelMapper::new(&strip_zones)?;

        info!(
            "Channel ready: GPIO {} ({} pixels, {} zones)",
            strip_config.gpio_pin,
            strip_config.pixel_count,
            strip_zones.len()
        );
        channels.push(LedChannel::new(strip_config.gpio_pin, strip, mapper));
    }
    Ok(channels)
}

/// Bring the strips back to the persisted picture: static zones render
/// immediately, and a persisted animation resumes if any zone is in
/// animation mode.
async fn restore_visual_state(
    frame_manager: &Arc<FrameManager>,
    zones: &Arc<ZoneService>,
    animations: &Arc<AnimationService>,
) {
    let snapshot = zones.snapshot();

    let mut zone_colors: HashMap<ZoneId, Color> = HashMap::new();
    for zone in &snapshot {
        if !zone.config.enabled || zone.config.pixel_count == 0 {
            continue;
        }
        if zone.state.render_mode == ZoneRenderMode::Off {
            zone_colors.insert(zone.config.id, Color::black());
            continue;
        }
        let [r, g, b] = zone.effective_rgb();
        zone_colors.insert(zone.config.id, Color::from_rgb(r, g, b));
    }

    if !zone_colors.is_empty() {
        frame_manager.submit_zone_frame(Frame::zone(
            zone_colors,
            FramePriority::Manual,
            FrameSource::Static,
            None,
        ));
    }

    let wants_animation = snapshot
        .iter()
        .any(|z| z.config.enabled && z.state.render_mode == ZoneRenderMode::Animation);
    if wants_animation {
        if let Some(state) = animations.current_state() {
            info!("Resuming persisted animation {}", state.id);
            if let Err(e) = animations.start(state.id, HashMap::new()).await {
                warn!("Could not resume animation: {}", e);
            }
        }
    }
}

/// Pre-bind check with retry; a stale instance gets a short grace period
/// to release the port.
async fn bind_with_retry(addr: SocketAddr) -> Option<tokio::net::TcpListener> {
    for attempt in 1..=3 {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => return Some(listener),
            Err(e) => {
                warn!("Bind attempt {}/3 on {} failed: {}", attempt, addr, e);
                if attempt < 3 {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
    None
}
