use crate::error::{CoreError, CoreResult};
use crate::models::zone::{ZoneConfig, ZoneId};
use std::collections::HashMap;

/// Maps logical zone pixels to absolute strip indices for one GPIO chain.
/// Pure after construction: `zone_indices[z][i]` is the physical index of
/// logical pixel `i`, already accounting for reversed zones.
#[derive(Debug, Clone)]
pub struct ZonePixelMapper {
    order: Vec<ZoneId>,
    ranges: HashMap<ZoneId, (usize, usize)>,
    indices: HashMap<ZoneId, Vec<usize>>,
}

impl ZonePixelMapper {
    /// Build from the zones of one strip. Zones must already carry their
    /// resolved `start_index`/`end_index`; overlapping ranges are a config
    /// bug and rejected here.
    pub fn new(zones: &[ZoneConfig]) -> CoreResult<Self> {
        let mut order = Vec::new();
        let mut ranges = HashMap::new();
        let mut indices = HashMap::new();
        let mut claimed: Vec<(usize, usize, ZoneId)> = Vec::new();

        for zone in zones {
            if zone.pixel_count == 0 {
                // Disabled/empty zones keep their place in the order but own
                // no pixels.
                order.push(zone.id);
                ranges.insert(zone.id, (zone.start_index, zone.start_index));
                indices.insert(zone.id, Vec::new());
                continue;
            }

            let (start, end) = if zone.start_index <= zone.end_index {
                (zone.start_index, zone.end_index)
            } else {
                (zone.end_index, zone.start_index)
            };

            for (s, e, other) in &claimed {
                if start <= *e && *s <= end {
                    return Err(CoreError::ConfigInvalid(format!(
                        "zones {} and {} overlap on pixels {}..={}",
                        zone.id,
                        other,
                        start.max(*s),
                        end.min(*e)
                    )));
                }
            }
            claimed.push((start, end, zone.id));

            let mut zone_indices: Vec<usize> = (start..=end).collect();
            if zone.reversed {
                zone_indices.reverse();
            }

            order.push(zone.id);
            ranges.insert(zone.id, (start, end));
            indices.insert(zone.id, zone_indices);
        }

        Ok(Self {
            order,
            ranges,
            indices,
        })
    }

    pub fn all_zone_ids(&self) -> &[ZoneId] {
        &self.order
    }

    pub fn contains(&self, zone: ZoneId) -> bool {
        self.indices.contains_key(&zone)
    }

    pub fn get_indices(&self, zone: ZoneId) -> &[usize] {
        self.indices.get(&zone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn zone_range(&self, zone: ZoneId) -> Option<(usize, usize)> {
        self.ranges.get(&zone).copied()
    }

    pub fn zone_length(&self, zone: ZoneId) -> usize {
        self.get_indices(zone).len()
    }
}
