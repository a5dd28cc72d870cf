//! Rasterised overlay used by "export annotated PNG".

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::error::MapError;
use crate::jump;
use crate::model::MapDocument;

pub const PLATFORM_COLOR: [u8; 4] = [0, 255, 0, 255];
pub const JUMP_COLOR: [u8; 4] = [0, 120, 255, 255];
pub const PORTAL_COLOR: [u8; 4] = [0, 100, 255, 255];
pub const PORTAL_ENTRY_COLOR: [u8; 4] = [0, 0, 255, 255];
pub const SPAWN_COLOR: [u8; 4] = [255, 0, 255, 255];

/// Draws jump paths, platforms, portals and spawns over a copy of `image`.
pub fn render_overlay(image: &DynamicImage, doc: &MapDocument, jump_paths: bool) -> RgbaImage {
    let mut img = image.to_rgba8();

    if jump_paths {
        for (i, j) in jump::jump_edges(&doc.platforms) {
            let a = doc.platforms[i].center();
            let b = doc.platforms[j].center();
            draw_line_on_image(&mut img, a, b, 1.0, JUMP_COLOR);
        }
    }
    for p in &doc.platforms {
        draw_line_on_image(&mut img, (p.x_start, p.y), (p.x_end, p.y), 2.0, PLATFORM_COLOR);
    }
    for portal in &doc.portals {
        draw_arrow_on_image(&mut img, portal.entry(), portal.exit(), 2.0, PORTAL_COLOR);
        draw_filled_circle_mut(&mut img, portal.entry(), 4, Rgba(PORTAL_ENTRY_COLOR));
    }
    for spawn in &doc.spawns {
        draw_filled_circle_mut(&mut img, (spawn.x, spawn.y), 3, Rgba(SPAWN_COLOR));
    }
    img
}

/// `<dir>/<stem>_annotated.png` next to the source image.
pub fn annotated_path(image_path: &Path) -> PathBuf {
    image_path.with_file_name(format!(
        "{}_annotated.png",
        image_path
            .file_stem()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("out")
    ))
}

pub fn export_annotated(
    image_path: &Path,
    image: &DynamicImage,
    doc: &MapDocument,
    jump_paths: bool,
) -> Result<PathBuf, MapError> {
    let out_path = annotated_path(image_path);
    render_overlay(image, doc, jump_paths)
        .save(&out_path)
        .map_err(MapError::Encode)?;
    tracing::info!(path = %out_path.display(), "exported annotated image");
    Ok(out_path)
}

fn draw_arrow_on_image(
    img: &mut RgbaImage,
    start: (i32, i32),
    end: (i32, i32),
    thickness: f32,
    color: [u8; 4],
) {
    draw_line_on_image(img, start, end, thickness, color);
    let (sx, sy) = (start.0 as f32, start.1 as f32);
    let (ex, ey) = (end.0 as f32, end.1 as f32);
    let dx = ex - sx;
    let dy = ey - sy;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= 0.0 {
        return;
    }
    let dir = (dx / len, dy / len);
    let perp = (-dir.1, dir.0);
    // head is a tenth of the shaft, at least 4px
    let head_len = (len * 0.1).max(4.0);
    for side in [1.0, -1.0] {
        let tip = (
            (ex - dir.0 * head_len + side * perp.0 * head_len * 0.5).round() as i32,
            (ey - dir.1 * head_len + side * perp.1 * head_len * 0.5).round() as i32,
        );
        draw_line_on_image(img, end, tip, thickness, color);
    }
}

fn draw_line_on_image(
    img: &mut RgbaImage,
    start: (i32, i32),
    end: (i32, i32),
    thickness: f32,
    color: [u8; 4],
) {
    let (x0, y0) = (start.0 as f32, start.1 as f32);
    let dx = end.0 as f32 - x0;
    let dy = end.1 as f32 - y0;
    let len = (dx * dx + dy * dy).sqrt();
    let steps = (len * 2.0) as i32;
    let half_t = (thickness / 2.0).max(0.5) as i32;
    let (w, h) = (img.width() as i32, img.height() as i32);

    for i in 0..=steps {
        let t = i as f32 / steps.max(1) as f32;
        let cx = (x0 + dx * t).round() as i32;
        let cy = (y0 + dy * t).round() as i32;
        for oy in -half_t..=half_t {
            for ox in -half_t..=half_t {
                let px = cx + ox;
                let py = cy + oy;
                if px >= 0 && px < w && py >= 0 && py < h {
                    img.put_pixel(px as u32, py as u32, Rgba(color));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Platform, Portal, Spawn};
    use image::RgbImage;

    fn blank() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(100, 100))
    }

    #[test]
    fn platforms_and_spawns_are_painted() {
        let doc = MapDocument {
            platforms: vec![Platform::new(20, 10, 60)],
            portals: vec![Portal::new((80, 80), (90, 10))],
            spawns: vec![Spawn::new(50, 50)],
        };
        let img = render_overlay(&blank(), &doc, false);
        assert_eq!(img.get_pixel(30, 20).0, PLATFORM_COLOR);
        assert_eq!(img.get_pixel(50, 50).0, SPAWN_COLOR);
        assert_eq!(img.get_pixel(80, 80).0, PORTAL_ENTRY_COLOR);
        assert_eq!(img.get_pixel(5, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn jump_paths_are_optional() {
        let doc = MapDocument {
            platforms: vec![Platform::new(60, 0, 40), Platform::new(20, 0, 40)],
            ..MapDocument::default()
        };
        // midpoint of the vertical jump line between the two centres
        let with = render_overlay(&blank(), &doc, true);
        assert_eq!(with.get_pixel(20, 40).0, JUMP_COLOR);
        let without = render_overlay(&blank(), &doc, false);
        assert_eq!(without.get_pixel(20, 40).0, [0, 0, 0, 255]);
    }

    #[test]
    fn annotated_path_sits_next_to_source() {
        assert_eq!(
            annotated_path(Path::new("/maps/henesys.png")),
            PathBuf::from("/maps/henesys_annotated.png")
        );
    }
}
