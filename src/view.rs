//! Mapping between image pixel space and the on-screen viewport.
//!
//! The viewport always shows the clipped crop of the image around the pan
//! centre, stretched to the full viewport. Every conversion interpolates over
//! that clipped crop, so clicks near the image border land where the user
//! sees them.

use egui::{pos2, vec2, Pos2, Rect, Vec2};

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 10.0;

/// Viewports smaller than this on either axis are treated as
/// [`FALLBACK_VIEWPORT`] (the window is not laid out yet).
const MIN_VIEWPORT_EXTENT: f32 = 10.0;
const FALLBACK_VIEWPORT: Vec2 = vec2(800.0, 600.0);

#[derive(Clone, Debug, PartialEq)]
pub struct ViewTransform {
    image_size: Vec2,
    pan: Pos2,
    zoom: f32,
}

impl ViewTransform {
    /// Starts unzoomed, centred on the image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image_size: vec2(width as f32, height as f32),
            pan: pos2((width / 2) as f32, (height / 2) as f32),
            zoom: MIN_ZOOM,
        }
    }

    pub fn image_size(&self) -> Vec2 {
        self.image_size
    }

    pub fn pan_center(&self) -> Pos2 {
        self.pan
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Moves the pan centre, clamped to the image.
    pub fn set_pan_center(&mut self, center: Pos2) {
        self.pan = pos2(
            center.x.clamp(0.0, self.image_size.x),
            center.y.clamp(0.0, self.image_size.y),
        );
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn zoom_by(&mut self, delta: f32) {
        self.set_zoom(self.zoom + delta);
    }

    /// Image-space rectangle currently on screen. Each edge is clipped to the
    /// image on its own; clipping one side never recentres the other.
    pub fn visible_region(&self) -> Rect {
        let size = self.image_size / self.zoom;
        let x1 = (self.pan.x - size.x / 2.0).trunc();
        let y1 = (self.pan.y - size.y / 2.0).trunc();
        let region = Rect::from_min_max(
            pos2(x1.max(0.0), y1.max(0.0)),
            pos2(
                (x1 + size.x).trunc().min(self.image_size.x),
                (y1 + size.y).trunc().min(self.image_size.y),
            ),
        );
        if region.width() < 1.0 || region.height() < 1.0 {
            Rect::from_min_size(Pos2::ZERO, self.image_size)
        } else {
            region
        }
    }

    /// Visible region in normalised texture coordinates.
    pub fn uv_rect(&self) -> Rect {
        let region = self.visible_region();
        Rect::from_min_max(
            pos2(
                region.min.x / self.image_size.x.max(1.0),
                region.min.y / self.image_size.y.max(1.0),
            ),
            pos2(
                region.max.x / self.image_size.x.max(1.0),
                region.max.y / self.image_size.y.max(1.0),
            ),
        )
    }

    /// Viewport pixel -> image pixel.
    pub fn to_image(&self, viewport_pos: Pos2, viewport: Vec2) -> Pos2 {
        let viewport = effective_viewport(viewport);
        let region = self.visible_region();
        pos2(
            region.min.x + viewport_pos.x / viewport.x * region.width(),
            region.min.y + viewport_pos.y / viewport.y * region.height(),
        )
    }

    /// Image pixel -> viewport pixel; the inverse of [`Self::to_image`].
    pub fn to_viewport(&self, image_pos: Pos2, viewport: Vec2) -> Pos2 {
        let viewport = effective_viewport(viewport);
        let region = self.visible_region();
        pos2(
            (image_pos.x - region.min.x) / region.width() * viewport.x,
            (image_pos.y - region.min.y) / region.height() * viewport.y,
        )
    }

    /// Drags the view by a viewport-space delta: the image follows the
    /// pointer, so the pan centre moves the opposite way.
    pub fn pan_by(&mut self, delta: Vec2, viewport: Vec2) {
        let viewport = effective_viewport(viewport);
        let region = self.visible_region();
        let scale = vec2(region.width() / viewport.x, region.height() / viewport.y);
        self.set_pan_center(self.pan - delta * scale);
    }
}

fn effective_viewport(viewport: Vec2) -> Vec2 {
    if viewport.x < MIN_VIEWPORT_EXTENT || viewport.y < MIN_VIEWPORT_EXTENT {
        FALLBACK_VIEWPORT
    } else {
        viewport
    }
}

/// Rounds an image-space position down to the pixel that contains it.
pub fn to_pixel(pos: Pos2) -> (i32, i32) {
    (pos.x.floor() as i32, pos.y.floor() as i32)
}
