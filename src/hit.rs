//! Pointer hit-testing against the document, in image space.
//!
//! All finders are first-match-wins in collection order, never nearest-match.

use crate::model::{EntityRef, MapDocument, Platform, Portal, Spawn};

pub const PLATFORM_TOLERANCE: i32 = 6;
pub const PORTAL_TOLERANCE: f32 = 10.0;
pub const SPAWN_TOLERANCE: f32 = 10.0;

/// First platform whose row is within `tol` of `y` and whose span covers `x`.
pub fn find_platform(platforms: &[Platform], x: i32, y: i32, tol: i32) -> Option<usize> {
    platforms
        .iter()
        .position(|p| (y - p.y).abs() < tol && p.x_start <= x && x <= p.x_end)
}

/// First portal whose entry point lies within `tol` of `(x, y)`. Exit points
/// are not selectable.
pub fn find_portal(portals: &[Portal], x: i32, y: i32, tol: f32) -> Option<usize> {
    portals
        .iter()
        .position(|p| distance((x, y), p.entry()) < tol)
}

pub fn find_spawn(spawns: &[Spawn], x: i32, y: i32, tol: f32) -> Option<usize> {
    spawns
        .iter()
        .position(|s| distance((x, y), (s.x, s.y)) < tol)
}

fn distance(a: (i32, i32), b: (i32, i32)) -> f32 {
    let dx = (a.0 - b.0) as f32;
    let dy = (a.1 - b.1) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Which entity kinds are currently shown and therefore pickable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layers {
    pub platforms: bool,
    pub portals: bool,
    pub spawns: bool,
    pub jump_paths: bool,
}

impl Default for Layers {
    fn default() -> Self {
        Self {
            platforms: true,
            portals: true,
            spawns: true,
            jump_paths: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub platform: i32,
    pub portal: f32,
    pub spawn: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            platform: PLATFORM_TOLERANCE,
            portal: PORTAL_TOLERANCE,
            spawn: SPAWN_TOLERANCE,
        }
    }
}

/// Picks the entity under `(x, y)`. Kinds are tried portal, platform, spawn;
/// the first kind with a hit wins and hidden kinds are skipped.
pub fn pick(
    doc: &MapDocument,
    x: i32,
    y: i32,
    layers: Layers,
    tol: Tolerances,
) -> Option<EntityRef> {
    if layers.portals {
        if let Some(i) = find_portal(&doc.portals, x, y, tol.portal) {
            return Some(EntityRef::Portal(i));
        }
    }
    if layers.platforms {
        if let Some(i) = find_platform(&doc.platforms, x, y, tol.platform) {
            return Some(EntityRef::Platform(i));
        }
    }
    if layers.spawns {
        if let Some(i) = find_spawn(&doc.spawns, x, y, tol.spawn) {
            return Some(EntityRef::Spawn(i));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_hit_needs_row_and_span() {
        let platforms = vec![Platform::new(20, 10, 50)];
        assert_eq!(find_platform(&platforms, 10, 25, 6), Some(0));
        assert_eq!(find_platform(&platforms, 50, 15, 6), Some(0));
        assert_eq!(find_platform(&platforms, 30, 26, 6), None);
        assert_eq!(find_platform(&platforms, 51, 20, 6), None);
    }

    #[test]
    fn platform_hit_prefers_lowest_index_over_nearest() {
        let platforms = vec![
            Platform::new(24, 0, 100),
            Platform::new(20, 0, 100),
            Platform::new(20, 0, 100),
        ];
        // index 1 sits exactly on the pointer row, index 0 is 4px away
        assert_eq!(find_platform(&platforms, 50, 20, 6), Some(0));
    }

    #[test]
    fn portal_hit_tests_entry_only() {
        let portals = vec![Portal::new((10, 10), (80, 80))];
        assert_eq!(find_portal(&portals, 16, 16, 10.0), Some(0));
        assert_eq!(find_portal(&portals, 80, 80, 10.0), None);
        // exactly on the radius is a miss
        assert_eq!(find_portal(&portals, 20, 10, 10.0), None);
    }

    #[test]
    fn spawn_hit_by_distance() {
        let spawns = vec![Spawn::new(40, 40), Spawn::new(42, 40)];
        assert_eq!(find_spawn(&spawns, 43, 40, 10.0), Some(0));
        assert_eq!(find_spawn(&spawns, 60, 40, 10.0), None);
    }

    #[test]
    fn pick_order_is_portal_platform_spawn() {
        let doc = MapDocument {
            platforms: vec![Platform::new(30, 0, 60)],
            portals: vec![Portal::new((30, 30), (0, 0))],
            spawns: vec![Spawn::new(30, 30)],
        };
        let tol = Tolerances::default();
        let mut layers = Layers::default();
        assert_eq!(pick(&doc, 30, 30, layers, tol), Some(EntityRef::Portal(0)));
        layers.portals = false;
        assert_eq!(pick(&doc, 30, 30, layers, tol), Some(EntityRef::Platform(0)));
        layers.platforms = false;
        assert_eq!(pick(&doc, 30, 30, layers, tol), Some(EntityRef::Spawn(0)));
        layers.spawns = false;
        assert_eq!(pick(&doc, 30, 30, layers, tol), None);
    }
}
