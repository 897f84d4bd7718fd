//! ZoneSet - hot-reloadable zone snapshot.
//!
//! The consumer borrows the current `Arc<ZoneSet>` once per cycle; writers
//! publish a whole new set through [`ZoneHandle::update`].

use std::sync::Arc;

use contracts::Zone;
use tokio::sync::watch;
use tracing::{info, warn};

/// Enabled, well-formed zones in configuration order
#[derive(Debug, Clone, Default)]
pub struct ZoneSet {
    zones: Vec<Zone>,
}

impl ZoneSet {
    /// Disabled zones are skipped; malformed ones are skipped with a warning.
    pub fn new(zones: impl IntoIterator<Item = Zone>) -> Self {
        let zones = zones
            .into_iter()
            .filter(|zone| {
                if !zone.enabled {
                    return false;
                }
                match zone.geometry.check() {
                    Ok(()) => true,
                    Err(reason) => {
                        warn!(zone_id = %zone.zone_id, %reason, "Zone disabled: malformed geometry");
                        false
                    }
                }
            })
            .collect();
        Self { zones }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> + '_ {
        self.zones.iter()
    }

    pub fn get(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.zone_id == zone_id)
    }

    pub fn contains(&self, zone_id: &str) -> bool {
        self.get(zone_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Publisher side of the zone snapshot
#[derive(Debug, Clone)]
pub struct ZoneHandle {
    tx: Arc<watch::Sender<Arc<ZoneSet>>>,
}

impl ZoneHandle {
    pub fn new(zones: impl IntoIterator<Item = Zone>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(ZoneSet::new(zones)));
        Self { tx: Arc::new(tx) }
    }

    /// Replace the active zone set
    pub fn update(&self, zones: impl IntoIterator<Item = Zone>) {
        let set = ZoneSet::new(zones);
        info!(zones = set.len(), "Zone set updated");
        self.tx.send_replace(Arc::new(set));
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ZoneSet>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Arc<ZoneSet> {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ZoneGeometry, ZoneRules, ZoneType};

    fn make_zone(id: &str, enabled: bool, points: usize) -> Zone {
        Zone {
            zone_id: id.into(),
            name: id.to_uppercase(),
            geometry: ZoneGeometry::FloorPolygon {
                plane: Default::default(),
                points: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
                    .into_iter()
                    .take(points)
                    .collect(),
            },
            rules: ZoneRules::default(),
            enabled,
            zone_type: ZoneType::Monitoring,
            priority: 5,
        }
    }

    #[test]
    fn test_filters_disabled_and_malformed() {
        let set = ZoneSet::new(vec![
            make_zone("a", true, 4),
            make_zone("b", false, 4),
            make_zone("c", true, 2),
        ]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("a"));
        assert!(!set.contains("b"));
        assert!(!set.contains("c"));
    }

    #[test]
    fn test_hot_reload_visible_to_subscribers() {
        let handle = ZoneHandle::new(vec![make_zone("a", true, 4)]);
        let mut rx = handle.subscribe();
        assert!(rx.borrow_and_update().contains("a"));

        handle.update(vec![make_zone("b", true, 3)]);
        assert!(rx.has_changed().unwrap());
        let current = rx.borrow_and_update().clone();
        assert!(current.contains("b"));
        assert!(!current.contains("a"));
        assert_eq!(handle.current().len(), 1);
    }
}
