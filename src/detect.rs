//! Platform auto-detection from minimap pixels.
//!
//! Pipeline: luma -> binary threshold -> horizontal opening -> outer
//! contours -> bounding boxes that look like ledges.

use image::{imageops, DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::model::Platform;

/// Blobs this tall or taller are walls or icons, not ledges.
pub const MAX_LEDGE_HEIGHT: u32 = 8;

const FOREGROUND: Luma<u8> = Luma([255]);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Pixels with luma at or above this value are foreground.
    pub threshold: u8,
    /// Shortest horizontal run, in pixels, kept as a ledge.
    pub min_length: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 128,
            min_length: 15,
        }
    }
}

/// Axis-aligned rectangle in full-image coordinates. Corners may be given in
/// any order; the far edges are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Region {
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        Self {
            x1: a.0,
            y1: a.1,
            x2: b.0,
            y2: b.1,
        }
    }

    /// `(x, y, width, height)` of the part inside a `width x height` image.
    fn clip(self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x1.min(self.x2).max(0);
        let y0 = self.y1.min(self.y2).max(0);
        let x1 = self.x1.max(self.x2).min(width as i32);
        let y1 = self.y1.max(self.y2).min(height as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// Finds ledge-shaped bright runs in `image`, optionally only inside
/// `region`. Results are in full-image coordinates, carry no id, and come
/// out in contour raster-scan order.
pub fn detect(
    image: &DynamicImage,
    region: Option<Region>,
    config: &DetectionConfig,
) -> Result<Vec<Platform>, MapError> {
    if config.min_length == 0 {
        return Err(MapError::InvalidConfig(
            "min_length must be at least 1".to_owned(),
        ));
    }
    let (x_off, y_off, width, height) = match region {
        Some(r) => r
            .clip(image.width(), image.height())
            .ok_or(MapError::EmptyRegion(r))?,
        None => (0, 0, image.width(), image.height()),
    };
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }

    let luma = image.to_luma8();
    let gray = imageops::crop_imm(&luma, x_off, y_off, width, height).to_image();
    let binary = binarize(&gray, config.threshold);
    let opened = open_horizontal(&binary, config.min_length);

    // contour coordinates are in the padded frame, one pixel right and down
    let x_off = x_off as i32 - 1;
    let y_off = y_off as i32 - 1;
    let platforms: Vec<Platform> = find_contours::<i32>(&pad(&opened))
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let min_x = c.points.iter().map(|p| p.x).min()?;
            let max_x = c.points.iter().map(|p| p.x).max()?;
            let min_y = c.points.iter().map(|p| p.y).min()?;
            let max_y = c.points.iter().map(|p| p.y).max()?;
            let w = max_x - min_x + 1;
            let h = max_y - min_y + 1;
            if w < config.min_length as i32 || h >= MAX_LEDGE_HEIGHT as i32 {
                return None;
            }
            let x_start = min_x + x_off;
            // +1 puts the line on the ledge's top edge
            Some(Platform::new(min_y + y_off + 1, x_start, x_start + w))
        })
        .collect();

    tracing::debug!(
        candidates = platforms.len(),
        threshold = config.threshold,
        min_length = config.min_length,
        "platform detection finished"
    );
    Ok(platforms)
}

fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] >= threshold {
            FOREGROUND
        } else {
            Luma([0])
        }
    })
}

/// Surrounds `binary` with a one-pixel background frame. The border follower
/// only starts an outer border at a background-to-foreground transition, so
/// blobs touching the raster edge would otherwise come back as holes.
fn pad(binary: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(binary.width() + 2, binary.height() + 2);
    imageops::replace(&mut out, binary, 1, 1);
    out
}

/// Opening with a `len x 1` structuring element: runs of at least `len`
/// foreground pixels survive unchanged, shorter runs vanish.
pub(crate) fn open_horizontal(binary: &GrayImage, len: u32) -> GrayImage {
    let eroded = erode_horizontal(binary, len);
    dilate_horizontal(&eroded, len)
}

/// Foreground iff the whole window `[x - len/2, x - len/2 + len)` is
/// foreground. Pixels outside the image count as background.
fn erode_horizontal(src: &GrayImage, len: u32) -> GrayImage {
    let (width, height) = src.dimensions();
    let anchor = i64::from(len / 2);
    let len = i64::from(len);
    let mut out = GrayImage::new(width, height);
    let mut prefix = vec![0i64; width as usize + 1];
    for y in 0..height {
        row_prefix(src, y, &mut prefix);
        for x in 0..width {
            let lo = i64::from(x) - anchor;
            let hi = lo + len;
            if lo >= 0 && hi <= i64::from(width) && prefix[hi as usize] - prefix[lo as usize] == len
            {
                out.put_pixel(x, y, FOREGROUND);
            }
        }
    }
    out
}

/// Dilation by the reflected window, so that erode-then-dilate restores
/// surviving runs to their exact original extent.
fn dilate_horizontal(src: &GrayImage, len: u32) -> GrayImage {
    let (width, height) = src.dimensions();
    let anchor = i64::from(len / 2);
    let len = i64::from(len);
    let mut out = GrayImage::new(width, height);
    let mut prefix = vec![0i64; width as usize + 1];
    for y in 0..height {
        row_prefix(src, y, &mut prefix);
        for x in 0..width {
            let lo = (i64::from(x) - (len - 1 - anchor)).max(0);
            let hi = (i64::from(x) + anchor + 1).min(i64::from(width));
            if hi > lo && prefix[hi as usize] - prefix[lo as usize] > 0 {
                out.put_pixel(x, y, FOREGROUND);
            }
        }
    }
    out
}

fn row_prefix(src: &GrayImage, y: u32, prefix: &mut [i64]) {
    prefix[0] = 0;
    for x in 0..src.width() {
        let on = i64::from(src.get_pixel(x, y)[0] > 0);
        prefix[x as usize + 1] = prefix[x as usize] + on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Black canvas with white bars `(x, y, len, thickness)`.
    fn bars(width: u32, height: u32, layout: &[(u32, u32, u32, u32)]) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let lit = layout
                .iter()
                .any(|&(bx, by, len, t)| x >= bx && x < bx + len && y >= by && y < by + t);
            if lit {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn run_lengths(img: &GrayImage, y: u32) -> Vec<(u32, u32)> {
        let mut runs = Vec::new();
        let mut start = None;
        for x in 0..=img.width() {
            let on = x < img.width() && img.get_pixel(x, y)[0] > 0;
            match (on, start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    runs.push((s, x - s));
                    start = None;
                }
                _ => {}
            }
        }
        runs
    }

    #[test]
    fn two_bars_become_two_platforms() {
        let img = bars(100, 100, &[(0, 20, 40, 3), (0, 50, 40, 3)]);
        let config = DetectionConfig {
            threshold: 128,
            min_length: 15,
        };
        let found = detect(&img, None, &config).unwrap();
        assert_eq!(
            found,
            vec![Platform::new(21, 0, 40), Platform::new(51, 0, 40)]
        );
    }

    #[test]
    fn opening_keeps_long_runs_exactly() {
        let gray = GrayImage::from_fn(30, 1, |x, _| {
            if (2..6).contains(&x) || (10..28).contains(&x) {
                FOREGROUND
            } else {
                Luma([0])
            }
        });
        for len in [5, 6] {
            let opened = open_horizontal(&gray, len);
            assert_eq!(run_lengths(&opened, 0), vec![(10, 18)], "len {len}");
        }
        assert_eq!(run_lengths(&open_horizontal(&gray, 4), 0), vec![(2, 4), (10, 18)]);
    }

    #[test]
    fn opening_keeps_runs_touching_the_border() {
        let gray = GrayImage::from_fn(20, 1, |x, _| if x < 8 { FOREGROUND } else { Luma([0]) });
        assert_eq!(run_lengths(&open_horizontal(&gray, 8), 0), vec![(0, 8)]);
        assert!(run_lengths(&open_horizontal(&gray, 9), 0).is_empty());
    }

    #[test]
    fn short_and_tall_blobs_are_rejected() {
        let img = bars(120, 60, &[(5, 5, 10, 2), (40, 10, 30, 30), (80, 50, 30, 2)]);
        let found = detect(&img, None, &DetectionConfig::default()).unwrap();
        assert_eq!(found, vec![Platform::new(51, 80, 110)]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(40, 10, |_, y| {
            if y == 4 {
                Luma([128])
            } else {
                Luma([0])
            }
        }));
        let mut config = DetectionConfig {
            threshold: 128,
            min_length: 20,
        };
        assert_eq!(detect(&img, None, &config).unwrap(), vec![Platform::new(5, 0, 40)]);
        config.threshold = 129;
        assert!(detect(&img, None, &config).unwrap().is_empty());
    }

    #[test]
    fn region_results_are_in_image_coordinates() {
        let img = bars(120, 100, &[(50, 60, 40, 2), (0, 10, 40, 2)]);
        let region = Region::from_corners((100, 80), (40, 50));
        let found = detect(&img, Some(region), &DetectionConfig::default()).unwrap();
        assert_eq!(found, vec![Platform::new(61, 50, 90)]);
    }

    #[test]
    fn ledges_on_the_image_border_are_kept() {
        let img = bars(60, 10, &[(0, 4, 30, 1), (35, 0, 25, 1), (10, 9, 20, 1)]);
        let found = detect(&img, None, &DetectionConfig::default()).unwrap();
        assert_eq!(
            found,
            vec![
                Platform::new(1, 35, 60),
                Platform::new(5, 0, 30),
                Platform::new(10, 10, 30),
            ]
        );
    }

    #[test]
    fn region_edge_cutting_a_ledge_keeps_the_inside_part() {
        let img = bars(100, 50, &[(10, 20, 50, 2)]);
        let region = Region::from_corners((30, 10), (80, 40));
        let found = detect(&img, Some(region), &DetectionConfig::default()).unwrap();
        assert_eq!(found, vec![Platform::new(21, 30, 60)]);
    }

    #[test]
    fn blobs_nested_in_a_hole_are_ignored() {
        // 7-row ring with 20px walls around a 40px ledge
        let img = bars(
            120,
            20,
            &[
                (5, 2, 100, 1),
                (5, 8, 100, 1),
                (5, 3, 20, 5),
                (85, 3, 20, 5),
                (35, 5, 40, 1),
            ],
        );
        let found = detect(&img, None, &DetectionConfig::default()).unwrap();
        assert_eq!(found, vec![Platform::new(3, 5, 105)]);
    }

    #[test]
    fn region_outside_image_is_an_error() {
        let img = bars(50, 50, &[]);
        let region = Region::from_corners((60, 60), (90, 90));
        let err = detect(&img, Some(region), &DetectionConfig::default()).unwrap_err();
        assert!(matches!(err, MapError::EmptyRegion(r) if r == region));
    }

    #[test]
    fn zero_min_length_is_rejected() {
        let img = bars(10, 10, &[]);
        let config = DetectionConfig {
            threshold: 10,
            min_length: 0,
        };
        assert!(matches!(
            detect(&img, None, &config),
            Err(MapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn raising_min_length_never_adds_platforms() {
        let layout: Vec<(u32, u32, u32, u32)> = (1..=12).map(|i| (3 + i, 4 + 6 * i, 5 * i, 1)).collect();
        let img = bars(100, 90, &layout);
        let mut previous = usize::MAX;
        for min_length in 1..=70 {
            let config = DetectionConfig {
                threshold: 128,
                min_length,
            };
            let count = detect(&img, None, &config).unwrap().len();
            assert!(count <= previous, "min_length {min_length}: {count} > {previous}");
            previous = count;
        }
        let config = DetectionConfig {
            threshold: 128,
            min_length: 15,
        };
        assert_eq!(detect(&img, None, &config).unwrap().len(), 10);
    }

    #[test]
    fn detection_is_repeatable() {
        let img = bars(100, 100, &[(10, 10, 50, 2), (30, 40, 20, 1), (5, 70, 90, 4)]);
        let config = DetectionConfig::default();
        let first = detect(&img, None, &config).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first, detect(&img, None, &config).unwrap());
    }
}
