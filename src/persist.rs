//! JSON persistence for map documents, including the legacy id repair.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MapError, ValidationWarning};
use crate::model::MapDocument;

const INDENT: &[u8] = b"    ";

/// A parsed document plus what had to be fixed on the way in.
#[derive(Clone, Debug, PartialEq)]
pub struct Loaded {
    pub document: MapDocument,
    pub warning: Option<ValidationWarning>,
}

impl Loaded {
    /// True when the document was repaired and should be saved again.
    pub fn is_dirty(&self) -> bool {
        self.warning.is_some()
    }
}

pub fn to_bytes(doc: &MapDocument) -> Result<Vec<u8>, MapError> {
    pretty(doc)
}

fn pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, MapError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

/// Parses a document. `portals` and `spawns` may be absent; `platforms`
/// may not. Platforms without an id get their position as id.
pub fn from_bytes(bytes: &[u8]) -> Result<Loaded, MapError> {
    let mut document: MapDocument = serde_json::from_slice(bytes)?;
    let repaired = repair_ids(&mut document);
    let warning = (repaired > 0).then_some(ValidationWarning::MissingPlatformIds { repaired });
    if let Some(warning) = warning {
        tracing::warn!(%warning, "repaired legacy map document");
    }
    Ok(Loaded { document, warning })
}

/// Gives every platform lacking an id its index as id. Platforms that
/// already have one are left alone, so a second pass changes nothing.
/// Mixed documents can end up with duplicates (`[{"id": 1}, {}]` becomes
/// `[1, 1]`), the same result the legacy repair script produced.
pub fn repair_ids(doc: &mut MapDocument) -> usize {
    let mut repaired = 0;
    for (i, platform) in doc.platforms.iter_mut().enumerate() {
        if platform.id.is_none() {
            platform.id = Some(i as u32);
            repaired += 1;
        }
    }
    repaired
}

pub fn load_file(path: &Path) -> Result<Loaded, MapError> {
    let bytes = std::fs::read(path).map_err(|e| MapError::io(path, e))?;
    let loaded = from_bytes(&bytes)?;
    tracing::info!(
        path = %path.display(),
        platforms = loaded.document.platforms.len(),
        portals = loaded.document.portals.len(),
        spawns = loaded.document.spawns.len(),
        "loaded map document"
    );
    Ok(loaded)
}

pub fn save_file(path: &Path, doc: &MapDocument) -> Result<(), MapError> {
    let bytes = to_bytes(doc)?;
    std::fs::write(path, bytes).map_err(|e| MapError::io(path, e))?;
    tracing::info!(path = %path.display(), "saved map document");
    Ok(())
}

/// Reads and decodes an image file (PNG, JPEG, BMP, ...).
pub fn load_image(path: &Path) -> Result<DynamicImage, MapError> {
    let bytes = std::fs::read(path).map_err(|e| MapError::io(path, e))?;
    let image = image::load_from_memory(&bytes)?;
    tracing::info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "loaded image"
    );
    Ok(image)
}

// ── Batch repair ────────────────────────────────────────────────────────────

/// Repairs one file in place. Returns whether it had to be rewritten.
///
/// Works on the raw JSON so keys the editor does not know about survive the
/// rewrite; only missing platform ids are added.
pub fn repair_file(path: &Path) -> Result<bool, MapError> {
    let bytes = std::fs::read(path).map_err(|e| MapError::io(path, e))?;
    let mut raw: Value = serde_json::from_slice(&bytes)?;
    MapDocument::deserialize(&raw)?;

    let repaired = repair_raw_ids(&mut raw);
    if repaired == 0 {
        return Ok(false);
    }
    std::fs::write(path, pretty(&raw)?).map_err(|e| MapError::io(path, e))?;
    tracing::info!(path = %path.display(), repaired, "rewrote map document");
    Ok(true)
}

/// [`repair_ids`] over an unparsed document. A `null` id counts as missing.
fn repair_raw_ids(raw: &mut Value) -> usize {
    let Some(platforms) = raw.get_mut("platforms").and_then(Value::as_array_mut) else {
        return 0;
    };
    let mut repaired = 0;
    for (i, entry) in platforms.iter_mut().enumerate() {
        if let Some(fields) = entry.as_object_mut() {
            if fields.get("id").map_or(true, Value::is_null) {
                fields.insert("id".to_owned(), Value::from(i));
                repaired += 1;
            }
        }
    }
    repaired
}

#[derive(Debug, Default)]
pub struct RepairTally {
    /// Files that were already complete or were rewritten.
    pub succeeded: usize,
    pub rewritten: usize,
    pub failed: Vec<(PathBuf, MapError)>,
}

impl RepairTally {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

pub fn repair_files<I, P>(paths: I) -> RepairTally
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut tally = RepairTally::default();
    for path in paths {
        let path = path.as_ref();
        match repair_file(path) {
            Ok(rewritten) => {
                tally.succeeded += 1;
                if rewritten {
                    tally.rewritten += 1;
                }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not repair map document");
                tally.failed.push((path.to_path_buf(), err));
            }
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Platform, Portal, Spawn};

    fn sample() -> MapDocument {
        MapDocument {
            platforms: vec![
                Platform::new(40, 10, 90).with_id(0),
                Platform::new(70, 0, 30).with_id(1),
            ],
            portals: vec![Portal::new((5, 6), (70, 80))],
            spawns: vec![Spawn {
                x: 12,
                y: 34,
                desc: "보스 입구".to_owned(),
            }],
        }
    }

    #[test]
    fn round_trip_is_lossless() {
        let doc = sample();
        let loaded = from_bytes(&to_bytes(&doc).unwrap()).unwrap();
        assert_eq!(loaded.document, doc);
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn output_uses_four_space_indent_and_raw_utf8() {
        let text = String::from_utf8(to_bytes(&sample()).unwrap()).unwrap();
        assert!(text.starts_with("{\n    \"platforms\": [\n        {\n            \"id\": 0,"));
        assert!(text.contains("보스 입구"));
    }

    #[test]
    fn missing_optional_sections_default_to_empty() {
        let loaded = from_bytes(br#"{"platforms": [{"id": 3, "y": 1, "x_start": 2, "x_end": 9}]}"#)
            .unwrap();
        assert!(loaded.document.portals.is_empty());
        assert!(loaded.document.spawns.is_empty());
        assert_eq!(loaded.document.platforms[0].id, Some(3));
    }

    #[test]
    fn spawn_desc_defaults() {
        let loaded = from_bytes(br#"{"platforms": [], "spawns": [{"x": 1, "y": 2}]}"#).unwrap();
        assert_eq!(loaded.document.spawns[0], Spawn::new(1, 2));
    }

    #[test]
    fn empty_platforms_is_valid() {
        let loaded = from_bytes(br#"{"platforms": []}"#).unwrap();
        assert!(loaded.document.is_empty());
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn absent_platforms_is_a_format_error() {
        let err = from_bytes(br#"{"portals": []}"#).unwrap_err();
        assert!(matches!(err, MapError::Format(_)));
        assert!(matches!(from_bytes(b"[1, 2]"), Err(MapError::Format(_))));
        assert!(matches!(from_bytes(b"{not json"), Err(MapError::Format(_))));
    }

    #[test]
    fn repair_assigns_position_ids() {
        let json = br#"{"platforms": [
            {"y": 1, "x_start": 0, "x_end": 5},
            {"id": 9, "y": 2, "x_start": 0, "x_end": 5},
            {"y": 3, "x_start": 0, "x_end": 5}
        ]}"#;
        let loaded = from_bytes(json).unwrap();
        let ids: Vec<_> = loaded.document.platforms.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(0), Some(9), Some(2)]);
        assert_eq!(
            loaded.warning,
            Some(ValidationWarning::MissingPlatformIds { repaired: 2 })
        );
    }

    #[test]
    fn repair_is_idempotent() {
        let json = br#"{"platforms": [{"y": 1, "x_start": 0, "x_end": 5}, {"y": 2, "x_start": 3, "x_end": 8}]}"#;
        let first = from_bytes(json).unwrap();
        assert!(first.is_dirty());
        let second = from_bytes(&to_bytes(&first.document).unwrap()).unwrap();
        assert!(!second.is_dirty());
        assert_eq!(second.document, first.document);

        let mut doc = second.document;
        assert_eq!(repair_ids(&mut doc), 0);
    }

    #[test]
    fn repair_can_collide_with_an_existing_id() {
        let json = br#"{"platforms": [{"id": 1, "y": 1, "x_start": 0, "x_end": 5}, {"y": 2, "x_start": 0, "x_end": 5}]}"#;
        let loaded = from_bytes(json).unwrap();
        let ids: Vec<_> = loaded.document.platforms.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(1), Some(1)]);
    }

    #[test]
    fn raw_repair_matches_typed_repair() {
        let mut raw: Value = serde_json::from_str(
            r#"{"platforms": [{"y": 1, "x_start": 0, "x_end": 5}, {"id": 9, "y": 2, "x_start": 0, "x_end": 5}]}"#,
        )
        .unwrap();
        assert_eq!(repair_raw_ids(&mut raw), 1);
        assert_eq!(raw["platforms"][0]["id"], 0);
        assert_eq!(raw["platforms"][1]["id"], 9);
        assert_eq!(repair_raw_ids(&mut raw), 0);
    }
}
