//! The active sample source and the upload handler that replaces it.
//!
//! A [`Session`] starts on the built-in sample set. Each successful upload
//! swaps in the new samples whole; a failed upload leaves the session
//! exactly as it was.

use crate::analysis::{aggregate, extract_ages};
use crate::error::UploadError;
use crate::models::{Active, DistributionSummary, UploadedSamples, AGE_COLUMN};
use crate::upload::decoder::{self, InputFormat};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// Settings that govern how uploads are read.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Files larger than this are rejected before decoding.
    pub max_file_size: u64,
    /// Separator for `.csv` files.
    pub csv_delimiter: u8,
    /// Whether to show a spinner while decoding.
    pub show_progress: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            csv_delimiter: b',',
            show_progress: false,
        }
    }
}

impl UploadOptions {
    pub fn from_config(config: &crate::config::SourceConfig, show_progress: bool) -> Self {
        Self {
            max_file_size: config.max_file_size,
            csv_delimiter: config.delimiter_byte(),
            show_progress,
        }
    }
}

/// Holds the currently active sample source.
pub struct Session {
    active: Active,
    options: UploadOptions,
}

impl Session {
    /// Create a session on the built-in sample set.
    pub fn new(options: UploadOptions) -> Self {
        Self {
            active: Active::Default,
            options,
        }
    }

    /// The source currently in effect.
    pub fn active(&self) -> &Active {
        &self.active
    }

    /// Aggregate the active source.
    pub fn summary(&self) -> DistributionSummary {
        aggregate(self.active.samples())
    }

    /// Load `path` and make it the active source.
    ///
    /// Takes `&mut self`, so uploads on one session never overlap. On error
    /// the previous source stays active.
    pub async fn upload(&mut self, path: &Path) -> Result<&Active, UploadError> {
        match load_samples(path, &self.options).await {
            Ok(uploaded) => {
                info!(
                    "Active source is now {} ({} ages)",
                    uploaded.file_name,
                    uploaded.samples.len()
                );
                self.active = Active::Uploaded(uploaded);
                Ok(&self.active)
            }
            Err(e) => {
                warn!("Upload of {} rejected: {}", path.display(), e);
                Err(e)
            }
        }
    }
}

/// Read, decode and validate a spreadsheet without touching any session.
pub async fn load_samples(
    path: &Path,
    options: &UploadOptions,
) -> Result<UploadedSamples, UploadError> {
    let file_name = display_name(path);

    let metadata = tokio::fs::metadata(path).await?;
    // Devices and FIFOs report a length of 0, so only regular files get in.
    if !metadata.is_file() {
        return Err(UploadError::Decode(format!(
            "{} is not a regular file",
            file_name
        )));
    }
    if metadata.len() > options.max_file_size {
        return Err(UploadError::Decode(format!(
            "{} is {} bytes, larger than the {} byte limit",
            file_name,
            metadata.len(),
            options.max_file_size
        )));
    }

    let file = tokio::fs::File::open(path).await?;
    let bytes = read_bounded(file, options.max_file_size).await?;
    let format = InputFormat::from_path(path, options.csv_delimiter);
    debug!("Read {} bytes from {} as {:?}", bytes.len(), file_name, format);

    let spinner = decode_spinner(&file_name, options.show_progress);
    let decoded = tokio::task::spawn_blocking(move || decoder::decode(bytes, format)).await;
    spinner.finish_and_clear();

    let rows = decoded.map_err(|e| UploadError::Decode(format!("decoder task failed: {}", e)))??;
    let samples = extract_ages(&rows, AGE_COLUMN)?;

    Ok(UploadedSamples {
        samples,
        file_name,
        loaded_at: Local::now(),
    })
}

/// Read at most `limit` bytes from `reader`. Anything longer is rejected,
/// even if the file grew after its size was checked.
pub async fn read_bounded<R>(reader: R, limit: u64) -> Result<Vec<u8>, UploadError>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes).await?;

    if bytes.len() as u64 > limit {
        return Err(UploadError::Decode(format!(
            "input exceeds the {} byte limit",
            limit
        )));
    }
    Ok(bytes)
}

/// The file name shown to users: the last path component.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn decode_spinner(file_name: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Reading {}...", file_name));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
