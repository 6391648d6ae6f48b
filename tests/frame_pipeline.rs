//! End-to-end frame pipeline tests: submissions through the public frame
//! manager API, rendered by the real loop in pause/step mode onto virtual
//! strips.

use rpi_led_zone_controller::engine::frame_manager::FrameManager;
use rpi_led_zone_controller::hardware::VirtualStrip;
use rpi_led_zone_controller::led::{LedChannel, ZonePixelMapper};
use rpi_led_zone_controller::models::color::Color;
use rpi_led_zone_controller::models::frame::{Frame, FramePriority, FrameSource};
use rpi_led_zone_controller::models::zone::{ZoneConfig, ZoneId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn zone(id: ZoneId, start: usize, count: usize, reversed: bool) -> ZoneConfig {
    ZoneConfig {
        id,
        display_name: id.as_key().to_string(),
        gpio: 18,
        pixel_count: count,
        enabled: true,
        reversed,
        start_index: start,
        end_index: start + count - 1,
    }
}

/// Frame manager over FLOOR [0..3) and LAMP [3..5), loop running but
/// paused so each `step_frame` renders exactly one tick.
async fn paused_manager() -> Arc<FrameManager> {
    let mapper = ZonePixelMapper::new(&[
        zone(ZoneId::Floor, 0, 3, false),
        zone(ZoneId::Lamp, 3, 2, false),
    ])
    .unwrap();
    let channel = LedChannel::new(18, Box::new(VirtualStrip::new(5)), mapper);
    let fm = FrameManager::new(vec![channel], 240);

    fm.pause();
    let runner = Arc::clone(&fm);
    tokio::spawn(async move { runner.run().await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    fm
}

async fn step(fm: &Arc<FrameManager>) {
    fm.step_frame().unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
}

fn zone_frame(zone: ZoneId, rgb: [u8; 3], priority: FramePriority) -> Arc<Frame> {
    let mut colors = HashMap::new();
    colors.insert(zone, Color::from_rgb(rgb[0], rgb[1], rgb[2]));
    Frame::zone(colors, priority, FrameSource::Manual, None)
}

#[tokio::test]
async fn transition_priority_beats_animation_within_one_tick() {
    let fm = paused_manager().await;

    fm.submit_zone_frame(zone_frame(ZoneId::Floor, [255, 0, 0], FramePriority::Animation));
    fm.submit_zone_frame(zone_frame(ZoneId::Floor, [0, 255, 0], FramePriority::Transition));
    step(&fm).await;

    let frame = fm.channel_snapshot(18).unwrap();
    for i in 0..3 {
        assert_eq!(frame[i].to_rgb(), [0, 255, 0], "pixel {}", i);
    }

    fm.stop();
}

#[tokio::test]
async fn zone_frame_preserves_pixels_of_other_zones() {
    let fm = paused_manager().await;

    let mut pixels = HashMap::new();
    pixels.insert(ZoneId::Floor, vec![Color::from_rgb(255, 0, 0); 3]);
    pixels.insert(ZoneId::Lamp, vec![Color::from_rgb(0, 0, 255); 2]);
    fm.submit_pixel_frame(Frame::pixel(
        pixels,
        FramePriority::Manual,
        FrameSource::Manual,
        None,
    ));
    step(&fm).await;

    fm.submit_zone_frame(zone_frame(ZoneId::Floor, [0, 255, 0], FramePriority::Animation));
    step(&fm).await;

    let frame = fm.channel_snapshot(18).unwrap();
    for i in 0..3 {
        assert_eq!(frame[i].to_rgb(), [0, 255, 0], "floor pixel {}", i);
    }
    for i in 3..5 {
        assert_eq!(frame[i].to_rgb(), [0, 0, 255], "lamp pixel {}", i);
    }

    fm.stop();
}

#[tokio::test]
async fn resubmitting_the_same_frame_object_skips_the_push() {
    let fm = paused_manager().await;

    let frame = zone_frame(ZoneId::Floor, [40, 0, 0], FramePriority::Animation);
    fm.submit_zone_frame(Arc::clone(&frame));
    step(&fm).await;
    fm.submit_zone_frame(frame);
    step(&fm).await;

    let stats = fm.stats();
    assert_eq!(stats.frames_rendered, 1);
    assert!(stats.dma_skipped >= 1);

    fm.stop();
}

#[tokio::test]
async fn reversed_zone_receives_pixels_high_to_low() {
    let mapper = ZonePixelMapper::new(&[
        zone(ZoneId::Top, 0, 10, false),
        zone(ZoneId::Pixel, 10, 4, true),
    ])
    .unwrap();
    let channel = LedChannel::new(18, Box::new(VirtualStrip::new(14)), mapper);
    let fm = FrameManager::new(vec![channel], 240);
    fm.pause();
    let runner = Arc::clone(&fm);
    tokio::spawn(async move { runner.run().await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let mut pixels = HashMap::new();
    pixels.insert(
        ZoneId::Pixel,
        vec![
            Color::from_rgb(1, 0, 0),
            Color::from_rgb(2, 0, 0),
            Color::from_rgb(3, 0, 0),
            Color::from_rgb(4, 0, 0),
        ],
    );
    fm.submit_pixel_frame(Frame::pixel(
        pixels,
        FramePriority::Manual,
        FrameSource::Manual,
        None,
    ));
    step(&fm).await;

    let frame = fm.channel_snapshot(18).unwrap();
    assert_eq!(frame[13].to_rgb(), [1, 0, 0]);
    assert_eq!(frame[12].to_rgb(), [2, 0, 0]);
    assert_eq!(frame[11].to_rgb(), [3, 0, 0]);
    assert_eq!(frame[10].to_rgb(), [4, 0, 0]);
    for i in 0..10 {
        assert_eq!(frame[i].to_rgb(), [0, 0, 0], "untouched pixel {}", i);
    }

    fm.stop();
}

#[tokio::test]
async fn resume_renders_continuously_without_stepping() {
    let fm = paused_manager().await;
    fm.resume();

    fm.submit_zone_frame(zone_frame(ZoneId::Lamp, [9, 9, 9], FramePriority::Manual));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let frame = fm.channel_snapshot(18).unwrap();
    assert_eq!(frame[3].to_rgb(), [9, 9, 9]);

    fm.stop();
}
