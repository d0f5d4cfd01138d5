pub mod config;
pub mod errors;
pub mod imageops_ai;
pub mod model;
pub mod options;
pub mod traits;

pub mod mocks;

mod progress_tracker;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub use config::Config;
pub use errors::{RestoreError, Result};
pub use model::{InferenceSettings, Model, TensorBindings};
pub use options::{ChannelOrder, RestoreOptions};
pub use traits::*;

use progress_tracker::ProgressTracker;

/// Extensions accepted as input, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

pub fn is_supported_image_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Creates `path` (and parents) if missing; a no-op when it already exists.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| RestoreError::FileSystem {
        path: path.to_path_buf(),
        operation: "出力ディレクトリ作成".to_string(),
        source: e,
    })
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Written output files, in processing order.
    pub written: Vec<PathBuf>,
    /// Directory entries skipped for their extension.
    pub skipped: usize,
}

/// Files found in the input directory, split by the extension allow-list.
#[derive(Debug, Default)]
struct InputListing {
    images: Vec<PathBuf>,
    skipped: usize,
}

pub struct BatchRunner<M: RestorationModel> {
    model: M,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl<M: RestorationModel> BatchRunner<M> {
    pub fn new(model: M, input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Restores every accepted image in the input directory, in file name order.
    ///
    /// The first unreadable image or failed inference aborts the whole batch.
    pub fn run(&self) -> Result<BatchSummary> {
        if !self.input_dir.is_dir() {
            return Err(RestoreError::FileSystem {
                path: self.input_dir.clone(),
                operation: "ディレクトリ存在確認".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        ensure_output_dir(&self.output_dir)?;

        let InputListing { images, skipped } = self.collect_image_files()?;
        if images.is_empty() {
            info!("No images to process in {}", self.input_dir.display());
            return Ok(BatchSummary {
                written: Vec::new(),
                skipped,
            });
        }

        let tracker = ProgressTracker::new(images.len());
        let mut written = Vec::with_capacity(images.len());
        for input_file in &images {
            match self.process_single_image(input_file, &tracker) {
                Ok(output_file) => written.push(output_file),
                Err(e) => {
                    tracker.abandon();
                    return Err(e);
                }
            }
        }
        tracker.finish();

        info!(
            "Processed {} image(s), skipped {} file(s)",
            written.len(),
            skipped
        );
        Ok(BatchSummary { written, skipped })
    }

    fn collect_image_files(&self) -> Result<InputListing> {
        let mut listing = InputListing::default();

        let entries = WalkDir::new(&self.input_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries {
            let entry = entry.map_err(|e| RestoreError::FileSystem {
                path: self.input_dir.clone(),
                operation: "入力ディレクトリ走査".to_string(),
                source: e.into(),
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if is_supported_image_format(path) {
                listing.images.push(entry.into_path());
            } else {
                debug!("Skipping unsupported file {}", path.display());
                listing.skipped += 1;
            }
        }

        Ok(listing)
    }

    /// Output location for `input_file`: same file name, inside the output directory.
    pub fn output_path(&self, input_file: &Path) -> Result<PathBuf> {
        input_file
            .file_name()
            .map(|name| self.output_dir.join(name))
            .ok_or_else(|| RestoreError::Validation {
                field: "input file".to_string(),
                reason: format!("{} has no file name", input_file.display()),
            })
    }

    fn process_single_image(&self, input_file: &Path, tracker: &ProgressTracker) -> Result<PathBuf> {
        let output_file = self.output_path(input_file)?;
        let file_name = input_file
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        tracker.processing(&file_name);

        let img = image::open(input_file).map_err(|e| RestoreError::ImageProcessing {
            path: input_file.display().to_string(),
            operation: "画像読み込み".to_string(),
            source: Box::new(e),
        })?;

        let restored = self
            .model
            .restore_image(&img)
            .map_err(|e| RestoreError::ImageProcessing {
                path: input_file.display().to_string(),
                operation: "画像復元".to_string(),
                source: Box::new(e),
            })?;

        restored
            .save(&output_file)
            .map_err(|e| RestoreError::ImageProcessing {
                path: output_file.display().to_string(),
                operation: "画像保存".to_string(),
                source: Box::new(e),
            })?;

        tracker.saved(&output_file);
        Ok(output_file)
    }
}

impl BatchRunner<Model> {
    /// Loads the ONNX graph named by `config.weights` and binds it to the configured folders.
    pub fn with_onnx_model(config: &Config, options: &RestoreOptions) -> Result<Self> {
        let model = Model::new(&config.weights, options, config.device_id, config.num_threads)?;
        Ok(Self::new(
            model,
            config.input_folder.clone(),
            config.output_folder.clone(),
        ))
    }
}
