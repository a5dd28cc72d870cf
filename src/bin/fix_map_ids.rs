//! Batch repair for legacy map documents: gives every platform without an
//! `id` its position as id and rewrites the file in place.

use std::path::PathBuf;

use clap::Parser;
use minimap_editor::persist::{repair_files, RepairTally};

#[derive(Parser, Debug)]
#[command(name = "fix-map-ids", version)]
struct Cli {
    /// Map documents to repair. A multi-file picker opens when omitted.
    files: Vec<PathBuf>,
}

fn summary(tally: &RepairTally) -> String {
    let mut text = format!(
        "{} file(s): {} ok ({} rewritten), {} failed",
        tally.total(),
        tally.succeeded,
        tally.rewritten,
        tally.failed.len()
    );
    for (path, err) in &tally.failed {
        text.push_str(&format!("\n  {}: {err}", path.display()));
    }
    text
}

fn main() -> anyhow::Result<()> {
    minimap_editor::init_logging();
    let cli = Cli::parse();

    let from_picker = cli.files.is_empty();
    let files = if from_picker {
        rfd::FileDialog::new()
            .set_title("Select map documents to repair")
            .add_filter("JSON files", &["json"])
            .pick_files()
            .unwrap_or_default()
    } else {
        cli.files
    };
    if files.is_empty() {
        tracing::info!("no files selected");
        return Ok(());
    }

    let tally = repair_files(&files);
    let text = summary(&tally);
    println!("{text}");
    if from_picker {
        let _ = rfd::MessageDialog::new()
            .set_title("Repair finished")
            .set_description(text)
            .set_level(rfd::MessageLevel::Info)
            .show();
    }

    if tally.failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} file(s) could not be repaired", tally.failed.len())
    }
}
