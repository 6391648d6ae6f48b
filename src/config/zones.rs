use crate::config::hardware::HardwareConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::zone::{ZoneConfig, ZoneId};
use serde::{Deserialize, Serialize};

/// One zone declaration from zones.yaml. Order within the file determines
/// physical placement on the strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneEntry {
    pub id: ZoneId,
    pub display_name: String,
    pub pixel_count: usize,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub reversed: bool,
    pub gpio: u8,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZonesConfig {
    pub zones: Vec<ZoneEntry>,
}

impl ZonesConfig {
    pub fn from_yaml(raw: &str) -> CoreResult<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| CoreError::ConfigInvalid(format!("zones.yaml: {}", e)))
    }

    /// Resolve zone entries to absolute index ranges by cumulative sum per
    /// GPIO. Disabled zones reserve their range too, so the physical layout
    /// never shifts when a zone is toggled off.
    pub fn resolve(&self, hardware: &HardwareConfig) -> CoreResult<Vec<ZoneConfig>> {
        let mut resolved = Vec::with_capacity(self.zones.len());
        let mut seen: Vec<ZoneId> = Vec::new();

        for gpio in self.zones.iter().map(|z| z.gpio).collect::<std::collections::BTreeSet<_>>() {
            let strip = hardware.strip_for_gpio(gpio).ok_or_else(|| {
                CoreError::ConfigInvalid(format!(
                    "zones.yaml: GPIO {} has zones but no strip in hardware.yaml",
                    gpio
                ))
            })?;

            let mut cursor = 0usize;
            for entry in self.zones.iter().filter(|z| z.gpio == gpio) {
                if seen.contains(&entry.id) {
                    return Err(CoreError::ConfigInvalid(format!(
                        "zones.yaml: zone '{}' declared twice",
                        entry.id
                    )));
                }
                seen.push(entry.id);

                let start_index = cursor;
                let end_index = if entry.pixel_count == 0 {
                    cursor
                } else {
                    cursor + entry.pixel_count - 1
                };
                cursor += entry.pixel_count;

                resolved.push(ZoneConfig {
                    id: entry.id,
                    display_name: entry.display_name.clone(),
                    gpio,
                    pixel_count: entry.pixel_count,
                    enabled: entry.enabled,
                    reversed: entry.reversed,
                    start_index,
                    end_index,
                });
            }

            // The zone ranges must tile the strip exactly.
            if cursor != strip.pixel_count {
                return Err(CoreError::ConfigInvalid(format!(
                    "zones.yaml: zones on GPIO {} cover {} pixels but strip '{}' has {}",
                    gpio, cursor, strip.id, strip.pixel_count
                )));
            }
        }

        if resolved.is_empty() {
            return Err(CoreError::ConfigInvalid(
                "zones.yaml: no zones declared".into(),
            ));
        }
        Ok(resolved)
    }

    /// Compiled-in zone table for the builtin hardware layout.
    pub fn builtin() -> Self {
        let zone = |id: ZoneId, name: &str, count: usize, reversed: bool, gpio: u8| ZoneEntry {
            id,
            display_name: name.to_string(),
            pixel_count: count,
            enabled: true,
            reversed,
            gpio,
        };
        Self {
            zones: vec![
                zone(ZoneId::Floor, "Floor", 18, false, 18),
                zone(ZoneId::Left, "Left", 12, false, 18),
                zone(ZoneId::Top, "Top", 14, false, 18),
                zone(ZoneId::Right, "Right", 12, true, 18),
                zone(ZoneId::Bottom, "Bottom", 11, true, 18),
                zone(ZoneId::Lamp, "Lamp", 19, false, 18),
                zone(ZoneId::Pixel, "Pixel Strip", 30, false, 19),
                zone(ZoneId::Preview, "Preview Panel", 8, false, 19),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_zones_resolve_against_builtin_hardware() {
        let hardware = HardwareConfig::builtin();
        let zones = ZonesConfig::builtin().resolve(&hardware).unwrap();

        // Cumulative indices per GPIO, in declaration order.
        let floor = zones.iter().find(|z| z.id == ZoneId::Floor).unwrap();
        assert_eq!((floor.start_index, floor.end_index), (0, 17));
        let left = zones.iter().find(|z| z.id == ZoneId::Left).unwrap();
        assert_eq!(left.start_index, 18);

        let preview = zones.iter().find(|z| z.id == ZoneId::Preview).unwrap();
        assert_eq!((preview.start_index, preview.end_index), (30, 37));
        assert_eq!(preview.gpio, 19);
    }

    #[test]
    fn disabled_zones_still_reserve_their_range() {
        let hardware = HardwareConfig::builtin();
        let mut config = ZonesConfig::builtin();
        config.zones[0].enabled = false;

        let zones = config.resolve(&hardware).unwrap();
        let floor = zones.iter().find(|z| z.id == ZoneId::Floor).unwrap();
        assert!(!floor.enabled);
        assert_eq!((floor.start_index, floor.end_index), (0, 17));

        let left = zones.iter().find(|z| z.id == ZoneId::Left).unwrap();
        assert_eq!(left.start_index, 18);
    }

    #[test]
    fn pixel_count_mismatch_is_rejected() {
        let hardware = HardwareConfig::builtin();
        let mut config = ZonesConfig::builtin();
        config.zones[0].pixel_count += 1;
        assert!(matches!(
            config.resolve(&hardware),
            Err(CoreError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn unknown_gpio_is_rejected() {
        let hardware = HardwareConfig::builtin();
        let mut config = ZonesConfig::builtin();
        config.zones[0].gpio = 99;
        assert!(matches!(
            config.resolve(&hardware),
            Err(CoreError::ConfigInvalid(_))
        ));
    }
}
