use serde::{Deserialize, Serialize};

pub const DEFAULT_SPAWN_DESC: &str = "Spawn Point";

// ── Entities ────────────────────────────────────────────────────────────────

/// A horizontal ledge in image pixel space.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub y: i32,
    pub x_start: i32,
    pub x_end: i32,
}

impl Platform {
    /// Builds a platform from two column bounds given in either order.
    pub fn new(y: i32, x0: i32, x1: i32) -> Self {
        Self {
            id: None,
            y,
            x_start: x0.min(x1),
            x_end: x0.max(x1),
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.x_start + self.x_end) / 2, self.y)
    }

    pub fn overlaps(&self, other: &Platform) -> bool {
        !(self.x_end < other.x_start || self.x_start > other.x_end)
    }

    fn clamp_to(&mut self, bounds: Bounds) {
        self.y = bounds.clamp_y(self.y);
        let a = bounds.clamp_x(self.x_start);
        let b = bounds.clamp_x(self.x_end);
        self.x_start = a.min(b);
        self.x_end = a.max(b);
    }
}

/// A directed link from an entry point to an exit point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portal {
    pub in_x: i32,
    pub in_y: i32,
    pub out_x: i32,
    pub out_y: i32,
}

impl Portal {
    pub fn new(entry: (i32, i32), exit: (i32, i32)) -> Self {
        Self {
            in_x: entry.0,
            in_y: entry.1,
            out_x: exit.0,
            out_y: exit.1,
        }
    }

    pub fn entry(&self) -> (i32, i32) {
        (self.in_x, self.in_y)
    }

    pub fn exit(&self) -> (i32, i32) {
        (self.out_x, self.out_y)
    }

    fn clamp_to(&mut self, bounds: Bounds) {
        self.in_x = bounds.clamp_x(self.in_x);
        self.in_y = bounds.clamp_y(self.in_y);
        self.out_x = bounds.clamp_x(self.out_x);
        self.out_y = bounds.clamp_y(self.out_y);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawn {
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_spawn_desc")]
    pub desc: String,
}

fn default_spawn_desc() -> String {
    DEFAULT_SPAWN_DESC.to_owned()
}

impl Spawn {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            desc: default_spawn_desc(),
        }
    }

    fn clamp_to(&mut self, bounds: Bounds) {
        self.x = bounds.clamp_x(self.x);
        self.y = bounds.clamp_y(self.y);
    }
}

// ── Tagged references ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Platform,
    Portal,
    Spawn,
}

/// Index of an entity inside its own collection, tagged with the collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Platform(usize),
    Portal(usize),
    Spawn(usize),
}

impl EntityRef {
    pub fn kind(self) -> EntityKind {
        match self {
            Self::Platform(_) => EntityKind::Platform,
            Self::Portal(_) => EntityKind::Portal,
            Self::Spawn(_) => EntityKind::Spawn,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Platform(i) | Self::Portal(i) | Self::Spawn(i) => i,
        }
    }
}

/// An owned entity of any kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Platform(Platform),
    Portal(Portal),
    Spawn(Spawn),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Platform(_) => EntityKind::Platform,
            Self::Portal(_) => EntityKind::Portal,
            Self::Spawn(_) => EntityKind::Spawn,
        }
    }

    fn clamp_to(&mut self, bounds: Bounds) {
        match self {
            Self::Platform(p) => p.clamp_to(bounds),
            Self::Portal(p) => p.clamp_to(bounds),
            Self::Spawn(s) => s.clamp_to(bounds),
        }
    }
}

// ── Bounds ──────────────────────────────────────────────────────────────────

/// Pixel dimensions of the annotated image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn clamp_x(self, x: i32) -> i32 {
        x.clamp(0, (self.width as i32 - 1).max(0))
    }

    pub fn clamp_y(self, y: i32) -> i32 {
        y.clamp(0, (self.height as i32 - 1).max(0))
    }

    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }
}

// ── Document ────────────────────────────────────────────────────────────────

/// Everything annotated on one minimap. Relationships between entities are
/// derived on demand, never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDocument {
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub portals: Vec<Portal>,
    #[serde(default)]
    pub spawns: Vec<Spawn>,
}

impl MapDocument {
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty() && self.portals.is_empty() && self.spawns.is_empty()
    }

    pub fn len_of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Platform => self.platforms.len(),
            EntityKind::Portal => self.portals.len(),
            EntityKind::Spawn => self.spawns.len(),
        }
    }

    pub fn next_platform_id(&self) -> u32 {
        self.platforms
            .iter()
            .filter_map(|p| p.id)
            .max()
            .map_or(0, |id| id + 1)
    }

    pub fn get(&self, at: EntityRef) -> Option<Entity> {
        match at {
            EntityRef::Platform(i) => self.platforms.get(i).cloned().map(Entity::Platform),
            EntityRef::Portal(i) => self.portals.get(i).cloned().map(Entity::Portal),
            EntityRef::Spawn(i) => self.spawns.get(i).cloned().map(Entity::Spawn),
        }
    }

    /// Appends an entity, clamped to `bounds`. Platforms without an id get
    /// the next free one.
    pub fn push(&mut self, mut entity: Entity, bounds: Bounds) -> EntityRef {
        entity.clamp_to(bounds);
        match entity {
            Entity::Platform(mut p) => {
                if p.id.is_none() {
                    p.id = Some(self.next_platform_id());
                }
                self.platforms.push(p);
                EntityRef::Platform(self.platforms.len() - 1)
            }
            Entity::Portal(p) => {
                self.portals.push(p);
                EntityRef::Portal(self.portals.len() - 1)
            }
            Entity::Spawn(s) => {
                self.spawns.push(s);
                EntityRef::Spawn(self.spawns.len() - 1)
            }
        }
    }

    /// Re-inserts an entity at `index` (clamped to the collection length).
    pub(crate) fn insert(&mut self, index: usize, entity: Entity) -> EntityRef {
        match entity {
            Entity::Platform(p) => {
                let i = index.min(self.platforms.len());
                self.platforms.insert(i, p);
                EntityRef::Platform(i)
            }
            Entity::Portal(p) => {
                let i = index.min(self.portals.len());
                self.portals.insert(i, p);
                EntityRef::Portal(i)
            }
            Entity::Spawn(s) => {
                let i = index.min(self.spawns.len());
                self.spawns.insert(i, s);
                EntityRef::Spawn(i)
            }
        }
    }

    pub fn remove(&mut self, at: EntityRef) -> Option<Entity> {
        match at {
            EntityRef::Platform(i) if i < self.platforms.len() => {
                Some(Entity::Platform(self.platforms.remove(i)))
            }
            EntityRef::Portal(i) if i < self.portals.len() => {
                Some(Entity::Portal(self.portals.remove(i)))
            }
            EntityRef::Spawn(i) if i < self.spawns.len() => {
                Some(Entity::Spawn(self.spawns.remove(i)))
            }
            _ => None,
        }
    }

    pub(crate) fn pop(&mut self, kind: EntityKind) -> Option<Entity> {
        match kind {
            EntityKind::Platform => self.platforms.pop().map(Entity::Platform),
            EntityKind::Portal => self.portals.pop().map(Entity::Portal),
            EntityKind::Spawn => self.spawns.pop().map(Entity::Spawn),
        }
    }

    /// Replaces the entity at `index` in the collection named by the variant
    /// of `entity`. Coordinates are clamped to `bounds`. Returns false when
    /// the index is out of range.
    pub fn replace(&mut self, index: usize, mut entity: Entity, bounds: Bounds) -> bool {
        entity.clamp_to(bounds);
        match entity {
            Entity::Platform(p) => match self.platforms.get_mut(index) {
                Some(slot) => {
                    *slot = p;
                    true
                }
                None => false,
            },
            Entity::Portal(p) => match self.portals.get_mut(index) {
                Some(slot) => {
                    *slot = p;
                    true
                }
                None => false,
            },
            Entity::Spawn(s) => match self.spawns.get_mut(index) {
                Some(slot) => {
                    *slot = s;
                    true
                }
                None => false,
            },
        }
    }

    /// Moves an entity by whole pixels. Portals only move their entry point.
    pub fn nudge(&mut self, at: EntityRef, dx: i32, dy: i32, bounds: Bounds) -> bool {
        match at {
            EntityRef::Platform(i) => {
                let Some(p) = self.platforms.get_mut(i) else {
                    return false;
                };
                // shift the whole segment, keeping its length when it fits
                let len = p.x_end - p.x_start;
                let max_start = (bounds.clamp_x(i32::MAX) - len).max(0);
                p.x_start = (p.x_start + dx).clamp(0, max_start);
                p.x_end = bounds.clamp_x(p.x_start + len);
                p.y = bounds.clamp_y(p.y + dy);
            }
            EntityRef::Portal(i) => {
                let Some(p) = self.portals.get_mut(i) else {
                    return false;
                };
                p.in_x = bounds.clamp_x(p.in_x + dx);
                p.in_y = bounds.clamp_y(p.in_y + dy);
            }
            EntityRef::Spawn(i) => {
                let Some(s) = self.spawns.get_mut(i) else {
                    return false;
                };
                s.x = bounds.clamp_x(s.x + dx);
                s.y = bounds.clamp_y(s.y + dy);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(100, 80)
    }

    #[test]
    fn platform_new_orders_bounds() {
        let p = Platform::new(5, 30, 10);
        assert_eq!((p.x_start, p.x_end), (10, 30));
    }

    #[test]
    fn push_assigns_next_platform_id() {
        let mut doc = MapDocument::default();
        doc.push(Entity::Platform(Platform::new(1, 0, 5).with_id(7)), bounds());
        let at = doc.push(Entity::Platform(Platform::new(2, 0, 5)), bounds());
        assert_eq!(at, EntityRef::Platform(1));
        assert_eq!(doc.platforms[1].id, Some(8));
    }

    #[test]
    fn push_clamps_coordinates() {
        let mut doc = MapDocument::default();
        doc.push(Entity::Spawn(Spawn::new(-4, 500)), bounds());
        assert_eq!((doc.spawns[0].x, doc.spawns[0].y), (0, 79));
    }

    #[test]
    fn replace_uses_variant_to_pick_collection() {
        let mut doc = MapDocument::default();
        doc.push(Entity::Portal(Portal::new((1, 1), (2, 2))), bounds());
        assert!(!doc.replace(0, Entity::Spawn(Spawn::new(3, 3)), bounds()));
        assert!(doc.replace(0, Entity::Portal(Portal::new((9, 9), (200, 2))), bounds()));
        assert_eq!(doc.portals[0], Portal::new((9, 9), (99, 2)));
    }

    #[test]
    fn replace_keeps_platform_ordered() {
        let mut doc = MapDocument::default();
        doc.push(Entity::Platform(Platform::new(1, 0, 5)), bounds());
        let edited = Platform {
            id: Some(0),
            y: 3,
            x_start: 40,
            x_end: 20,
        };
        assert!(doc.replace(0, Entity::Platform(edited), bounds()));
        assert_eq!((doc.platforms[0].x_start, doc.platforms[0].x_end), (20, 40));
    }

    #[test]
    fn nudge_portal_moves_entry_only() {
        let mut doc = MapDocument::default();
        doc.push(Entity::Portal(Portal::new((10, 10), (50, 50))), bounds());
        assert!(doc.nudge(EntityRef::Portal(0), 3, -2, bounds()));
        assert_eq!(doc.portals[0], Portal::new((13, 8), (50, 50)));
    }

    #[test]
    fn nudge_platform_stops_at_edge_without_shrinking() {
        let mut doc = MapDocument::default();
        doc.push(Entity::Platform(Platform::new(10, 80, 95)), bounds());
        doc.nudge(EntityRef::Platform(0), 10, 0, bounds());
        let p = &doc.platforms[0];
        assert_eq!((p.x_start, p.x_end), (84, 99));
    }

    #[test]
    fn nudge_out_of_range_is_rejected() {
        let mut doc = MapDocument::default();
        assert!(!doc.nudge(EntityRef::Spawn(0), 1, 1, bounds()));
    }

    #[test]
    fn remove_and_insert_restore_order() {
        let mut doc = MapDocument::default();
        for x in [1, 2, 3] {
            doc.push(Entity::Spawn(Spawn::new(x, 0)), bounds());
        }
        let removed = doc.remove(EntityRef::Spawn(1)).unwrap();
        doc.insert(1, removed);
        let xs: Vec<i32> = doc.spawns.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![1, 2, 3]);
    }
}
