use crate::error::{LotError, ValidationError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Upper bound on `-N` suffixes tried for one second's worth of uploads.
const MAX_SUFFIX: u32 = 1000;

/// An uploaded photo as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Flat directory of registration photos.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Use `dir`, creating it if missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LotError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!(path = %dir.display(), "image directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `upload` as `<client>_<unix seconds>.<ext>` and return the stored path.
    pub async fn store(&self, client_name: &str, upload: &ImageUpload) -> Result<String, LotError> {
        self.store_at(client_name, upload, chrono::Utc::now().timestamp()).await
    }

    /// Same as [`store`](Self::store) with an explicit timestamp.
    ///
    /// An existing file is never overwritten: a `-1`, `-2`, ... suffix is
    /// added until a free name is found.
    pub async fn store_at(
        &self,
        client_name: &str,
        upload: &ImageUpload,
        timestamp: i64,
    ) -> Result<String, LotError> {
        let ext = image_extension(&upload.file_name)?;
        let stem = format!("{}_{}", sanitize_client_name(client_name), timestamp);

        for n in 0..=MAX_SUFFIX {
            let file_name = match n {
                0 => format!("{stem}.{ext}"),
                _ => format!("{stem}-{n}.{ext}"),
            };
            let path = self.dir.join(&file_name);
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(file = %file_name, "image name taken, trying next suffix");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            file.write_all(&upload.bytes).await?;
            file.flush().await?;
            info!(path = %path.display(), bytes = upload.bytes.len(), "image stored");
            return Ok(path.to_string_lossy().into_owned());
        }

        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free image name for `{stem}`"),
        )
        .into())
    }
}

/// Extension of an accepted upload, as given by the client (case preserved).
pub fn image_extension(file_name: &str) -> Result<String, ValidationError> {
    Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .filter(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .map(str::to_owned)
        .ok_or_else(|| ValidationError::UnsupportedImageType(file_name.to_string()))
}

/// Spaces become `_`; anything that could escape the directory is dropped.
pub fn sanitize_client_name(client_name: &str) -> String {
    let cleaned: String = client_name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect();
    if cleaned.is_empty() {
        "client".to_string()
    } else {
        cleaned
    }
}
