use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;
use egui_extras::{Column, TableBuilder};
use image::DynamicImage;
use minimap_editor::detect::{detect, DetectionConfig, Region};
use minimap_editor::model::{Bounds, Entity, EntityRef, MapDocument};
use minimap_editor::persist::{self, Loaded};
use minimap_editor::render::{
    self, JUMP_COLOR, PLATFORM_COLOR, PORTAL_COLOR, PORTAL_ENTRY_COLOR, SPAWN_COLOR,
};
use minimap_editor::session::{Mode, Preview, Press, Release, Session, Undone};
use minimap_editor::view::{to_pixel, ViewTransform};
use minimap_editor::EditorConfig;

const SELECTED_COLOR: egui::Color32 = egui::Color32::YELLOW;
const PREVIEW_COLOR: egui::Color32 = egui::Color32::RED;
const NUDGE_FAST: i32 = 10;

fn to_color32(c: [u8; 4]) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}

/// Keys gathered from one frame's input, handled after the input lock is released.
#[derive(Default)]
struct Shortcuts {
    undo: bool,
    save: bool,
    delete: bool,
    escape: bool,
    nudge: (i32, i32),
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct MapEditorApp {
    image_path: PathBuf,
    map_path: Option<PathBuf>,
    texture: Option<egui::TextureHandle>,
    raw_image: DynamicImage,

    session: Session,
    view: ViewTransform,
    config: EditorConfig,
    detection: DetectionConfig,

    panning: bool,
    status: String,
    error: Option<String>,
}

impl MapEditorApp {
    pub fn new(
        image_path: PathBuf,
        raw_image: DynamicImage,
        map: Option<(PathBuf, Loaded)>,
        config: EditorConfig,
    ) -> Self {
        let bounds = Bounds::new(raw_image.width(), raw_image.height());
        let view = ViewTransform::new(bounds.width, bounds.height);
        let mut session = Session::new(MapDocument::default(), bounds, &config);
        let mut status = String::from("Ready");
        let mut map_path = None;
        if let Some((path, loaded)) = map {
            if let Some(warning) = loaded.warning {
                status = format!("{warning}; save to keep the fix");
            }
            session.replace_document(loaded.document, loaded.warning.is_some());
            map_path = Some(path);
        }
        let detection = config.detection;

        Self {
            image_path,
            map_path,
            texture: None,
            raw_image,
            session,
            view,
            config,
            detection,
            panning: false,
            status,
            error: None,
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        let rgba = self.raw_image.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.texture = Some(ctx.load_texture("minimap", color_image, egui::TextureOptions::NEAREST));
    }

    /// Image pixel -> screen position inside `canvas_rect`.
    fn image_to_screen(&self, canvas_rect: egui::Rect, (x, y): (i32, i32)) -> egui::Pos2 {
        let img_pos = egui::pos2(x as f32 + 0.5, y as f32 + 0.5);
        canvas_rect.min + self.view.to_viewport(img_pos, canvas_rect.size()).to_vec2()
    }

    /// Screen position -> image pixel under it.
    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> (i32, i32) {
        let local = (screen_pos - canvas_rect.min).to_pos2();
        to_pixel(self.view.to_image(local, canvas_rect.size()))
    }

    fn fail(&mut self, what: &str, err: impl std::fmt::Display) {
        tracing::warn!(error = %err, "{what} failed");
        self.error = Some(format!("{what} failed:\n{err}"));
    }

    // ── Actions ─────────────────────────────────────────────────────────────

    fn undo(&mut self) {
        self.status = match self.session.undo() {
            Some(Undone::Removed(entities)) => format!("Undo: removed {} item(s)", entities.len()),
            Some(Undone::Restored(_)) => "Undo: restored deleted item".to_owned(),
            Some(Undone::CancelledPortalEntry) => "Undo: portal entry cancelled".to_owned(),
            None => "Nothing to undo".to_owned(),
        };
    }

    fn delete_selected(&mut self) {
        if let Some(at) = self.session.selected() {
            if self.session.delete(at).is_some() {
                self.status = format!("Deleted {:?}", at.kind());
            }
        }
    }

    fn save(&mut self) {
        match self.map_path.clone() {
            Some(path) => self.save_to(path),
            None => self.save_as(),
        }
    }

    fn save_as(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Map data", &["json"])
            .set_file_name("map_data.json")
            .save_file();
        if let Some(path) = picked {
            self.save_to(path);
        }
    }

    fn save_to(&mut self, path: PathBuf) {
        match persist::save_file(&path, self.session.document()) {
            Ok(()) => {
                self.session.mark_saved();
                self.status = format!("Saved {}", path.display());
                self.map_path = Some(path);
            }
            Err(err) => self.fail("Save", err),
        }
    }

    fn open_map(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Map data", &["json"])
            .pick_file()
        else {
            return;
        };
        match persist::load_file(&path) {
            Ok(loaded) => {
                self.status = match loaded.warning {
                    Some(warning) => format!("{warning}; save to keep the fix"),
                    None => format!("Opened {}", path.display()),
                };
                let dirty = loaded.is_dirty();
                self.session.replace_document(loaded.document, dirty);
                self.map_path = Some(path);
            }
            Err(err) => self.fail("Open", err),
        }
    }

    fn export_annotated(&mut self) {
        let jump_paths = self.session.layers().jump_paths;
        match render::export_annotated(
            &self.image_path,
            &self.raw_image,
            self.session.document(),
            jump_paths,
        ) {
            Ok(path) => self.status = format!("Exported {}", path.display()),
            Err(err) => self.fail("Export", err),
        }
    }

    fn run_detection(&mut self, region: Option<Region>) {
        match detect(&self.raw_image, region, &self.detection) {
            Ok(found) => {
                let added = self.session.append_detected(found);
                tracing::info!(added, ?region, "auto-detected platforms");
                self.status = format!("Detected {added} platform(s)");
            }
            Err(err) => self.fail("Detection", err),
        }
    }

    fn apply_shortcuts(&mut self, keys: Shortcuts) {
        if keys.undo {
            self.undo();
        }
        if keys.save {
            self.save();
        }
        if keys.delete {
            self.delete_selected();
        }
        if keys.escape {
            if self.session.selected().is_some() {
                self.session.select(None);
            } else {
                self.session.set_mode(Mode::Pan);
            }
        }
        if keys.nudge != (0, 0) {
            self.session.nudge_selected(keys.nudge.0, keys.nudge.1);
        }
    }

    // ── Panels ──────────────────────────────────────────────────────────────

    fn sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Control panel");
        ui.separator();

        ui.group(|ui| {
            ui.label("Mode");
            let mut mode = self.session.mode();
            ui.selectable_value(&mut mode, Mode::Pan, "Pan / select");
            ui.selectable_value(&mut mode, Mode::DrawPlatform, "Draw platform");
            ui.selectable_value(&mut mode, Mode::Portal, "Portal (click, click)");
            ui.selectable_value(&mut mode, Mode::Spawn, "Spawn point");
            ui.selectable_value(&mut mode, Mode::DetectRegion, "Detect in region");
            self.session.set_mode(mode);
        });

        ui.group(|ui| {
            ui.label("Layers");
            let layers = self.session.layers_mut();
            ui.checkbox(&mut layers.platforms, "Platforms");
            ui.checkbox(&mut layers.portals, "Portals");
            ui.checkbox(&mut layers.spawns, "Spawns");
            ui.checkbox(&mut layers.jump_paths, "Jump paths");
        });

        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui.button("Zoom +").clicked() {
                    self.view.zoom_by(self.config.zoom_step);
                }
                if ui.button("Zoom -").clicked() {
                    self.view.zoom_by(-self.config.zoom_step);
                }
                ui.label(format!("x{:.1}", self.view.zoom()));
            });
        });

        ui.group(|ui| {
            ui.label("Auto-detect");
            ui.add(egui::Slider::new(&mut self.detection.threshold, 0..=255).text("threshold"));
            ui.add(egui::Slider::new(&mut self.detection.min_length, 1..=200).text("min length"));
            if ui.button("Detect whole map").clicked() {
                self.run_detection(None);
            }
        });

        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(self.session.can_undo(), egui::Button::new("Undo"))
                    .clicked()
                {
                    self.undo();
                }
                if ui
                    .add_enabled(self.session.selected().is_some(), egui::Button::new("Delete"))
                    .clicked()
                {
                    self.delete_selected();
                }
            });
            ui.horizontal(|ui| {
                let label = if self.session.is_dirty() { "Save *" } else { "Save" };
                if ui.button(label).clicked() {
                    self.save();
                }
                if ui.button("Save as").clicked() {
                    self.save_as();
                }
            });
            ui.horizontal(|ui| {
                if ui.button("Open map").clicked() {
                    self.open_map();
                }
                if ui.button("Export PNG").clicked() {
                    self.export_annotated();
                }
            });
        });

        ui.separator();
        self.entity_list(ui);
    }

    fn entity_list(&mut self, ui: &mut egui::Ui) {
        let doc = self.session.document();
        let rows: Vec<(EntityRef, String)> = doc
            .platforms
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let id = p.id.map_or_else(|| "-".to_owned(), |id| id.to_string());
                (
                    EntityRef::Platform(i),
                    format!("P{id}  y={} x={}..{}", p.y, p.x_start, p.x_end),
                )
            })
            .chain(doc.portals.iter().enumerate().map(|(i, p)| {
                (
                    EntityRef::Portal(i),
                    format!("Portal  ({},{}) -> ({},{})", p.in_x, p.in_y, p.out_x, p.out_y),
                )
            }))
            .chain(doc.spawns.iter().enumerate().map(|(i, s)| {
                (EntityRef::Spawn(i), format!("{}  ({},{})", s.desc, s.x, s.y))
            }))
            .collect();

        let selected = self.session.selected();
        let mut clicked = None;
        ui.push_id("entities", |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::exact(28.0))
                .column(Column::remainder())
                .header(18.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("#");
                    });
                    header.col(|ui| {
                        ui.strong(format!("{} item(s)", rows.len()));
                    });
                })
                .body(|mut body| {
                    for (at, text) in &rows {
                        body.row(18.0, |mut row| {
                            row.col(|ui| {
                                ui.label(at.index().to_string());
                            });
                            row.col(|ui| {
                                if ui.selectable_label(selected == Some(*at), text).clicked() {
                                    clicked = Some(*at);
                                }
                            });
                        });
                    }
                });
        });
        if clicked.is_some() {
            self.session.select(clicked);
        }
    }

    /// Field editor for the selected entity. Edits apply live.
    fn property_window(&mut self, ctx: &egui::Context) {
        let Some(at) = self.session.selected() else {
            return;
        };
        let Some(mut entity) = self.session.document().get(at) else {
            self.session.select(None);
            return;
        };
        let bounds = self.session.bounds();
        let max_x = bounds.width.saturating_sub(1) as i32;
        let max_y = bounds.height.saturating_sub(1) as i32;
        let title = format!("{:?} #{}", at.kind(), at.index());

        let mut open = true;
        let mut changed = false;
        let mut delete = false;
        egui::Window::new(title)
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| {
                egui::Grid::new("fields").num_columns(2).show(ui, |ui| {
                    let mut field = |ui: &mut egui::Ui, label: &str, value: &mut i32, max: i32| {
                        ui.label(label);
                        changed |= ui
                            .add(egui::DragValue::new(value).range(0..=max))
                            .changed();
                        ui.end_row();
                    };
                    match &mut entity {
                        Entity::Platform(p) => {
                            field(ui, "Y", &mut p.y, max_y);
                            field(ui, "X start", &mut p.x_start, max_x);
                            field(ui, "X end", &mut p.x_end, max_x);
                        }
                        Entity::Portal(p) => {
                            field(ui, "In X", &mut p.in_x, max_x);
                            field(ui, "In Y", &mut p.in_y, max_y);
                            field(ui, "Out X", &mut p.out_x, max_x);
                            field(ui, "Out Y", &mut p.out_y, max_y);
                        }
                        Entity::Spawn(s) => {
                            field(ui, "X", &mut s.x, max_x);
                            field(ui, "Y", &mut s.y, max_y);
                            ui.label("Label");
                            changed |= ui.text_edit_singleline(&mut s.desc).changed();
                            ui.end_row();
                        }
                    }
                });
                ui.separator();
                ui.label("Arrow keys nudge (Shift: x10)");
                if ui
                    .add(egui::Button::new("Delete").fill(egui::Color32::from_rgb(0xff, 0x44, 0x44)))
                    .clicked()
                {
                    delete = true;
                }
            });

        if changed {
            self.session.edit(at.index(), entity);
        }
        if delete {
            self.delete_selected();
        } else if !open {
            self.session.select(None);
        }
    }

    fn error_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.error.clone() else {
            return;
        };
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    self.error = None;
                }
            });
    }

    // ── Canvas ──────────────────────────────────────────────────────────────

    fn draw_overlays(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let doc = self.session.document();
        let layers = self.session.layers();
        let selected = self.session.selected();

        if layers.jump_paths {
            let stroke = egui::Stroke::new(1.0, to_color32(JUMP_COLOR));
            for (i, j) in self.session.jump_edges() {
                let a = self.image_to_screen(canvas_rect, doc.platforms[i].center());
                let b = self.image_to_screen(canvas_rect, doc.platforms[j].center());
                painter.line_segment([a, b], stroke);
            }
        }
        if layers.platforms {
            for (i, p) in doc.platforms.iter().enumerate() {
                let color = if selected == Some(EntityRef::Platform(i)) {
                    SELECTED_COLOR
                } else {
                    to_color32(PLATFORM_COLOR)
                };
                let a = self.image_to_screen(canvas_rect, (p.x_start, p.y));
                let b = self.image_to_screen(canvas_rect, (p.x_end, p.y));
                painter.line_segment([a, b], egui::Stroke::new(2.0, color));
            }
        }
        if layers.portals {
            for (i, p) in doc.portals.iter().enumerate() {
                let entry = self.image_to_screen(canvas_rect, p.entry());
                let exit = self.image_to_screen(canvas_rect, p.exit());
                painter.arrow(entry, exit - entry, egui::Stroke::new(2.0, to_color32(PORTAL_COLOR)));
                let dot = if selected == Some(EntityRef::Portal(i)) {
                    SELECTED_COLOR
                } else {
                    to_color32(PORTAL_ENTRY_COLOR)
                };
                painter.circle_filled(entry, 4.0, dot);
            }
        }
        if layers.spawns {
            for (i, s) in doc.spawns.iter().enumerate() {
                let pos = self.image_to_screen(canvas_rect, (s.x, s.y));
                let color = if selected == Some(EntityRef::Spawn(i)) {
                    SELECTED_COLOR
                } else {
                    to_color32(SPAWN_COLOR)
                };
                painter.circle_filled(pos, 4.0, color);
                painter.text(
                    pos + egui::vec2(6.0, -6.0),
                    egui::Align2::LEFT_BOTTOM,
                    &s.desc,
                    egui::FontId::proportional(12.0),
                    color,
                );
            }
        }

        match self.session.preview() {
            Some(Preview::Platform(p)) => {
                let a = self.image_to_screen(canvas_rect, (p.x_start, p.y));
                let b = self.image_to_screen(canvas_rect, (p.x_end, p.y));
                painter.line_segment([a, b], egui::Stroke::new(2.0, PREVIEW_COLOR));
            }
            Some(Preview::Region(r)) => {
                let a = self.image_to_screen(canvas_rect, (r.x1, r.y1));
                let b = self.image_to_screen(canvas_rect, (r.x2, r.y2));
                painter.rect_stroke(
                    egui::Rect::from_two_pos(a, b),
                    0.0,
                    egui::Stroke::new(1.5, PREVIEW_COLOR),
                    egui::StrokeKind::Middle,
                );
            }
            Some(Preview::PortalEntry(entry)) => {
                let pos = self.image_to_screen(canvas_rect, entry);
                painter.circle_stroke(pos, 6.0, egui::Stroke::new(2.0, PREVIEW_COLOR));
            }
            None => {}
        }
    }

    fn canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        let viewport = canvas_rect.size();

        painter.rect_filled(canvas_rect, 0.0, egui::Color32::BLACK);
        if let Some(ref tex) = self.texture {
            painter.image(tex.id(), canvas_rect, self.view.uv_rect(), egui::Color32::WHITE);
        }
        self.draw_overlays(&painter, canvas_rect);

        let doc = self.session.document();
        painter.text(
            canvas_rect.min + egui::vec2(15.0, 15.0),
            egui::Align2::LEFT_TOP,
            format!(
                "Mode: {:?} | Zoom: x{:.1} | Platforms: {} Portals: {} Spawns: {}",
                self.session.mode(),
                self.view.zoom(),
                doc.platforms.len(),
                doc.portals.len(),
                doc.spawns.len(),
            ),
            egui::FontId::proportional(14.0),
            egui::Color32::YELLOW,
        );

        // Zoom (scroll wheel, fixed steps)
        if response.hovered() {
            let scroll = ctx.input(|i| i.raw_scroll_delta.y);
            if scroll > 0.0 {
                self.view.zoom_by(self.config.zoom_step);
            } else if scroll < 0.0 {
                self.view.zoom_by(-self.config.zoom_step);
            }
        }

        // Pan (secondary or middle drag, or primary drag on empty space)
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
            || (self.panning && response.dragged_by(egui::PointerButton::Primary))
        {
            self.view.pan_by(response.drag_delta(), viewport);
        }

        let (pressed, down, released, pointer) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });
        let Some(pointer) = pointer else {
            return;
        };
        let (x, y) = self.screen_to_image(canvas_rect, pointer);

        if pressed && response.hovered() {
            match self.session.press(x, y) {
                Press::Pan => self.panning = true,
                Press::Added(at) => self.status = format!("Added {:?}", at.kind()),
                Press::PortalEntry => self.status = "Portal entry set, click the exit".to_owned(),
                Press::Selected(_) | Press::DragStarted => {}
            }
        } else if down {
            self.session.drag_to(x, y);
        }
        if released {
            self.panning = false;
            match self.session.release(x, y) {
                Release::Added(at) => self.status = format!("Added {:?}", at.kind()),
                Release::Region(region) => self.run_detection(Some(region)),
                Release::Nothing => {}
            }
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for MapEditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);
        ctx.request_repaint_after(Duration::from_millis(self.config.refresh_interval_ms));

        if !ctx.wants_keyboard_input() {
            let keys = ctx.input(|i| {
                let step = if i.modifiers.shift { NUDGE_FAST } else { 1 };
                let mut keys = Shortcuts {
                    undo: i.modifiers.command && i.key_pressed(egui::Key::Z),
                    save: i.modifiers.command && i.key_pressed(egui::Key::S),
                    delete: i.key_pressed(egui::Key::Delete),
                    escape: i.key_pressed(egui::Key::Escape),
                    nudge: (0, 0),
                };
                if i.key_pressed(egui::Key::ArrowLeft) {
                    keys.nudge.0 -= step;
                }
                if i.key_pressed(egui::Key::ArrowRight) {
                    keys.nudge.0 += step;
                }
                if i.key_pressed(egui::Key::ArrowUp) {
                    keys.nudge.1 -= step;
                }
                if i.key_pressed(egui::Key::ArrowDown) {
                    keys.nudge.1 += step;
                }
                keys
            });
            self.apply_shortcuts(keys);
        }

        egui::SidePanel::left("sidebar")
            .exact_width(self.config.sidebar_width)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.sidebar(ui));
            });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(&self.status);
        });

        self.property_window(ctx);
        self.error_window(ctx);

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ctx, ui));
    }
}
