use crate::utils::validation::{ValidationError, validate_file_size};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileSelectError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a regular file")]
    NotAFile { path: PathBuf },

    #[error("{}", .0.message)]
    Rejected(ValidationError),
}

/// A dataset chosen for upload. Only constructed through [`DatasetFile::select`],
/// so every instance has passed the size check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFile {
    name: String,
    content_type: String,
    size: u64,
    path: PathBuf,
}

impl DatasetFile {
    /// Inspects `path` and accepts it if it is no larger than `max_size`.
    pub async fn select(path: impl AsRef<Path>, max_size: u64) -> Result<Self, FileSelectError> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| FileSelectError::Io {
                path: path.clone(),
                source,
            })?;

        if !metadata.is_file() {
            return Err(FileSelectError::NotAFile { path });
        }

        validate_file_size(metadata.len(), max_size).map_err(FileSelectError::Rejected)?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset")
            .to_string();
        let content_type = detect_content_type(&path).await;

        Ok(Self {
            name,
            content_type,
            size: metadata.len(),
            path,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn formatted_size(&self) -> String {
        format_file_size(self.size)
    }

    pub fn estimated_training_time(&self) -> &'static str {
        estimate_training_time(self.size)
    }
}

/// Magic bytes first, then the extension, then a generic binary type.
async fn detect_content_type(path: &Path) -> String {
    let mut header = [0u8; 8192];
    let sniffed = match tokio::fs::File::open(path).await {
        Ok(mut file) => {
            use tokio::io::AsyncReadExt;
            match file.read(&mut header).await {
                Ok(n) => infer::get(&header[..n]).map(|kind| kind.mime_type().to_string()),
                Err(_) => None,
            }
        }
        Err(_) => None,
    };

    sniffed
        .or_else(|| content_type_from_extension(path).map(|m| m.to_string()))
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}

fn content_type_from_extension(path: &Path) -> Option<mime::Mime> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "pdf" => mime::APPLICATION_PDF,
        "csv" => mime::TEXT_CSV,
        "txt" | "md" => mime::TEXT_PLAIN,
        "json" => mime::APPLICATION_JSON,
        "jsonl" | "ndjson" => "application/x-ndjson".parse().ok()?,
        "parquet" => "application/vnd.apache.parquet".parse().ok()?,
        _ => return None,
    };
    Some(mime)
}

/// Human readable size, e.g. `1.5 KB`. Uses 1024 steps and at most two
/// decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Rough training duration shown next to the selected file.
pub fn estimate_training_time(bytes: u64) -> &'static str {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    if mb < 100.0 {
        "30 - 60 Minutes"
    } else if mb < 500.0 {
        "1 - 3 Hours"
    } else if mb < 2048.0 {
        "4 - 8 Hours"
    } else {
        "8 - 12+ Hours"
    }
}
