//! A single editing session over one [`MapDocument`].
//!
//! The session owns the document and turns pointer gestures (already in
//! image pixels) into mutations. It is driven from one thread; rendering only
//! reads it through [`Session::document`] and [`Session::preview`].

use crate::config::EditorConfig;
use crate::detect::Region;
use crate::hit::{self, Layers, Tolerances};
use crate::jump;
use crate::model::{
    Bounds, Entity, EntityKind, EntityRef, MapDocument, Platform, Portal, Spawn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Pan,
    DrawPlatform,
    Portal,
    Spawn,
    DetectRegion,
}

/// One undo step. The stack is shared by every entity kind.
#[derive(Clone, Debug, PartialEq)]
enum Action {
    Added(EntityKind),
    AddedPlatforms(usize),
    Deleted { at: EntityRef, entity: Entity },
    PortalEntry((i32, i32)),
}

/// What [`Session::undo`] reverted.
#[derive(Clone, Debug, PartialEq)]
pub enum Undone {
    Removed(Vec<Entity>),
    Restored(EntityRef),
    CancelledPortalEntry,
}

#[derive(Clone, Debug, PartialEq)]
enum Drag {
    None,
    Platform { start: (i32, i32), current_x: i32 },
    Region { start: (i32, i32), current: (i32, i32) },
}

/// Result of a primary-button press.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Press {
    Selected(EntityRef),
    /// Nothing under the pointer in pan mode; the host should start panning.
    Pan,
    DragStarted,
    PortalEntry,
    Added(EntityRef),
}

/// Result of releasing the primary button.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Release {
    Added(EntityRef),
    Region(Region),
    Nothing,
}

/// Uncommitted gesture state, for drawing only.
#[derive(Clone, Debug, PartialEq)]
pub enum Preview {
    Platform(Platform),
    Region(Region),
    PortalEntry((i32, i32)),
}

pub struct Session {
    doc: MapDocument,
    bounds: Bounds,
    mode: Mode,
    layers: Layers,
    tolerances: Tolerances,
    min_drag_length: i32,
    history: Vec<Action>,
    pending_entry: Option<(i32, i32)>,
    drag: Drag,
    selected: Option<EntityRef>,
    dirty: bool,
}

impl Session {
    pub fn new(doc: MapDocument, bounds: Bounds, config: &EditorConfig) -> Self {
        Self {
            doc,
            bounds,
            mode: Mode::Pan,
            layers: Layers::default(),
            tolerances: config.tolerances(),
            min_drag_length: config.min_drag_length,
            history: Vec::new(),
            pending_entry: None,
            drag: Drag::None,
            selected: None,
            dirty: false,
        }
    }

    pub fn document(&self) -> &MapDocument {
        &self.doc
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn layers(&self) -> Layers {
        self.layers
    }

    pub fn layers_mut(&mut self) -> &mut Layers {
        &mut self.layers
    }

    pub fn selected(&self) -> Option<EntityRef> {
        self.selected
    }

    pub fn select(&mut self, at: Option<EntityRef>) {
        self.selected = at.filter(|r| r.index() < self.doc.len_of(r.kind()));
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Swaps in a freshly loaded document. History and gestures are dropped.
    pub fn replace_document(&mut self, doc: MapDocument, dirty: bool) {
        self.doc = doc;
        self.history.clear();
        self.pending_entry = None;
        self.drag = Drag::None;
        self.selected = None;
        self.dirty = dirty;
    }

    /// Switching modes abandons any gesture in progress, including a
    /// half-placed portal.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        self.cancel_portal_entry();
        self.drag = Drag::None;
        self.mode = mode;
    }

    fn cancel_portal_entry(&mut self) {
        if self.pending_entry.take().is_some() {
            if let Some(pos) = self
                .history
                .iter()
                .rposition(|a| matches!(a, Action::PortalEntry(_)))
            {
                self.history.remove(pos);
            }
        }
    }

    fn add(&mut self, entity: Entity) -> EntityRef {
        let kind = entity.kind();
        let at = self.doc.push(entity, self.bounds);
        self.history.push(Action::Added(kind));
        self.dirty = true;
        at
    }

    // ── Pointer gestures ────────────────────────────────────────────────────

    pub fn press(&mut self, x: i32, y: i32) -> Press {
        match self.mode {
            Mode::Pan => match hit::pick(&self.doc, x, y, self.layers, self.tolerances) {
                Some(at) => {
                    self.selected = Some(at);
                    Press::Selected(at)
                }
                None => Press::Pan,
            },
            Mode::DrawPlatform => {
                self.drag = Drag::Platform {
                    start: (x, y),
                    current_x: x,
                };
                Press::DragStarted
            }
            Mode::DetectRegion => {
                self.drag = Drag::Region {
                    start: (x, y),
                    current: (x, y),
                };
                Press::DragStarted
            }
            Mode::Portal => match self.pending_entry {
                None => {
                    let entry = (self.bounds.clamp_x(x), self.bounds.clamp_y(y));
                    self.pending_entry = Some(entry);
                    self.history.push(Action::PortalEntry(entry));
                    Press::PortalEntry
                }
                Some(entry) => {
                    self.cancel_portal_entry();
                    let at = self.add(Entity::Portal(Portal::new(entry, (x, y))));
                    Press::Added(at)
                }
            },
            Mode::Spawn => {
                let at = self.add(Entity::Spawn(Spawn::new(x, y)));
                Press::Added(at)
            }
        }
    }

    pub fn drag_to(&mut self, x: i32, y: i32) {
        match &mut self.drag {
            Drag::Platform { current_x, .. } => *current_x = x,
            Drag::Region { current, .. } => *current = (x, y),
            Drag::None => {}
        }
    }

    pub fn release(&mut self, x: i32, y: i32) -> Release {
        self.drag_to(x, y);
        match std::mem::replace(&mut self.drag, Drag::None) {
            Drag::Platform { start, current_x } => {
                if (current_x - start.0).abs() <= self.min_drag_length {
                    return Release::Nothing;
                }
                let platform = Platform::new(start.1, start.0, current_x);
                Release::Added(self.add(Entity::Platform(platform)))
            }
            Drag::Region { start, current } => Release::Region(Region::from_corners(start, current)),
            Drag::None => Release::Nothing,
        }
    }

    pub fn preview(&self) -> Option<Preview> {
        match &self.drag {
            Drag::Platform { start, current_x } => {
                Some(Preview::Platform(Platform::new(start.1, start.0, *current_x)))
            }
            Drag::Region { start, current } => {
                Some(Preview::Region(Region::from_corners(*start, *current)))
            }
            Drag::None => self.pending_entry.map(Preview::PortalEntry),
        }
    }

    // ── Direct edits ────────────────────────────────────────────────────────

    /// Replaces the entity at `index`; the variant of `entity` names the
    /// collection.
    pub fn edit(&mut self, index: usize, entity: Entity) -> bool {
        let changed = self.doc.replace(index, entity, self.bounds);
        self.dirty |= changed;
        changed
    }

    pub fn nudge(&mut self, at: EntityRef, dx: i32, dy: i32) -> bool {
        let changed = self.doc.nudge(at, dx, dy, self.bounds);
        self.dirty |= changed;
        changed
    }

    pub fn nudge_selected(&mut self, dx: i32, dy: i32) -> bool {
        match self.selected {
            Some(at) => self.nudge(at, dx, dy),
            None => false,
        }
    }

    pub fn delete(&mut self, at: EntityRef) -> Option<Entity> {
        let entity = self.doc.remove(at)?;
        self.history.push(Action::Deleted {
            at,
            entity: entity.clone(),
        });
        self.selected = None;
        self.dirty = true;
        Some(entity)
    }

    /// Appends auto-detected platforms as a single undo step.
    pub fn append_detected(&mut self, platforms: Vec<Platform>) -> usize {
        let count = platforms.len();
        if count == 0 {
            return 0;
        }
        for platform in platforms {
            self.doc.push(Entity::Platform(platform), self.bounds);
        }
        self.history.push(Action::AddedPlatforms(count));
        self.dirty = true;
        count
    }

    /// Reverts the most recent action of any kind.
    pub fn undo(&mut self) -> Option<Undone> {
        let action = self.history.pop()?;
        self.selected = None;
        let undone = match action {
            Action::Added(kind) => Undone::Removed(self.doc.pop(kind).into_iter().collect()),
            Action::AddedPlatforms(count) => {
                let mut removed: Vec<Entity> = (0..count)
                    .filter_map(|_| self.doc.pop(EntityKind::Platform))
                    .collect();
                removed.reverse();
                Undone::Removed(removed)
            }
            Action::Deleted { at, entity } => Undone::Restored(self.doc.insert(at.index(), entity)),
            Action::PortalEntry(_) => {
                self.pending_entry = None;
                return Some(Undone::CancelledPortalEntry);
            }
        };
        self.dirty = true;
        tracing::debug!(?undone, "undo");
        Some(undone)
    }

    pub fn jump_edges(&self) -> Vec<(usize, usize)> {
        jump::jump_edges(&self.doc.platforms)
    }
}
