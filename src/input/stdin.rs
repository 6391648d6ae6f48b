//! Stdin keyboard adapter: development input without the control panel.
//!
//! Reads lines from stdin and publishes each as a `KeyboardKeyPress` event.
//! Modifier prefixes are accepted in the form `ctrl+shift+x`.

use crate::error::CoreResult;
use crate::events::EventBus;
use crate::lifecycle::task_registry::{TaskCategory, TaskRegistry};
use crate::models::events::{Event, EventData, EventOrigin, KeyModifier};
use log::{debug, info};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Parse `ctrl+shift+a` into key + modifiers.
fn parse_key(raw: &str) -> Option<(String, Vec<KeyModifier>)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut modifiers = Vec::new();
    let mut key = None;
    for part in trimmed.split('+') {
        match part.to_ascii_lowercase().as_str() {
            "ctrl" => modifiers.push(KeyModifier::Ctrl),
            "shift" => modifiers.push(KeyModifier::Shift),
            "alt" => modifiers.push(KeyModifier::Alt),
            other if !other.is_empty() => key = Some(other.to_string()),
            _ => {}
        }
    }

    key.map(|k| (k, modifiers))
}

/// Spawn the reader as a tracked INPUT task.
pub fn spawn(registry: &Arc<TaskRegistry>, bus: Arc<EventBus>) -> u64 {
    let handle = registry.create_tracked_task(
        TaskCategory::Input,
        "stdin keyboard adapter",
        run(bus),
    );
    handle.id
}

async fn run(bus: Arc<EventBus>) -> CoreResult<()> {
    info!("Stdin keyboard adapter started");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some((key, modifiers)) = parse_key(&line) else {
                    continue;
                };
                debug!("Key press from stdin: {} {:?}", key, modifiers);
                bus.publish(Event::new(
                    EventOrigin::Input,
                    EventData::KeyboardKeyPress { key, modifiers },
                ))
                .await;
            }
            Ok(None) => {
                info!("Stdin closed, keyboard adapter exiting");
                return Ok(());
            }
            Err(e) => {
                info!("Stdin read error ({}), keyboard adapter exiting", e);
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_keys_and_modifier_chains() {
        assert_eq!(parse_key("a"), Some(("a".into(), vec![])));
        assert_eq!(
            parse_key("ctrl+shift+x"),
            Some(("x".into(), vec![KeyModifier::Ctrl, KeyModifier::Shift]))
        );
        assert_eq!(parse_key("  enter  "), Some(("enter".into(), vec![])));
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("   "), None);
    }
}
