use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::database::SliceDatabase;
use crate::error::Result;
use crate::export::{CAMERAS_FILE, ExportStats, IMAGES_FILE, POINTS_FILE, export_model};
use crate::nvm::read_nvm;

/// Input and output locations of one slice.
///
/// `slice<N>.nvm` and `slice<N>.db` are looked up in `input_dir`.
#[derive(Debug, Clone)]
pub struct SliceConfig {
    pub slice: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl SliceConfig {
    pub fn new(slice: impl Into<String>, output_dir: impl AsRef<Path>) -> SliceConfig {
        SliceConfig {
            slice: slice.into(),
            input_dir: PathBuf::from("."),
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn with_input_dir(mut self, input_dir: impl AsRef<Path>) -> SliceConfig {
        self.input_dir = input_dir.as_ref().to_path_buf();
        self
    }

    pub fn nvm_path(&self) -> PathBuf {
        self.input_dir.join(format!("slice{}.nvm", self.slice))
    }

    pub fn db_path(&self) -> PathBuf {
        self.input_dir.join(format!("slice{}.db", self.slice))
    }
}

/// Printed by the binary after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub slice: String,
    pub nvm: PathBuf,
    pub database: PathBuf,
    pub stats: ExportStats,
    pub files: Vec<PathBuf>,
}

/// Reads the slice, reconciles it with its database and writes the model.
pub fn convert_slice(config: &SliceConfig) -> Result<ConversionSummary> {
    let nvm_path = config.nvm_path();
    let db_path = config.db_path();
    log::info!(
        "converting slice {} ({} + {})",
        config.slice,
        nvm_path.display(),
        db_path.display()
    );

    let model = read_nvm(&nvm_path)?;
    log::info!(
        "read {} images and {} points ({} observations)",
        model.images.len(),
        model.points.len(),
        model.num_observations()
    );

    std::fs::create_dir_all(&config.output_dir)?;
    let db = SliceDatabase::new(&db_path);
    let stats = export_model(&model, &db, &config.output_dir)?;

    Ok(ConversionSummary {
        slice: config.slice.clone(),
        nvm: nvm_path,
        database: db_path,
        stats,
        files: [POINTS_FILE, IMAGES_FILE, CAMERAS_FILE]
            .iter()
            .map(|name| config.output_dir.join(name))
            .collect(),
    })
}
