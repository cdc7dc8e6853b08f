use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use futures::StreamExt;
use mongodb::bson::oid::ObjectId;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::utils::{text, AppError};

const GITHUB_URL_FIELD: &str = "githubUrl";
const MAX_TEXT_FIELD_BYTES: usize = 2048;
const FALLBACK_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// A document the analysis scripts read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocumentKind {
    Resume,
    Transcript,
    Certificate,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Resume,
        DocumentKind::Transcript,
        DocumentKind::Certificate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume",
            DocumentKind::Transcript => "transcript",
            DocumentKind::Certificate => "certificate",
        }
    }

    pub fn from_field(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Documents and GitHub URL supplied to one analysis run.
#[derive(Debug, Default)]
pub struct AnalysisInput {
    pub documents: BTreeMap<DocumentKind, PathBuf>,
    pub github_url: Option<String>,
}

/// Upload folder of a user: `<safe-label>-<id hex>`, so two users with the
/// same display name never share documents.
pub fn user_dir(uploads_root: &Path, label: &str, user_id: &ObjectId) -> PathBuf {
    uploads_root.join(format!("{}-{}", text::safe_name(label), user_id.to_hex()))
}

// Mantém a extensão do cliente só quando é um token curto e simples
fn extension_for(filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "png".to_string())
}

fn multipart_error(err: impl fmt::Display) -> AppError {
    AppError::Validation(format!("Upload failed: {}", err))
}

/// Streams a multipart upload into `dir`.
///
/// Each document lands at `<dir>/<field>.<ext>`; a file that already exists is
/// never overwritten. When the request is rejected, every file created by this
/// call is removed again.
pub async fn receive(
    payload: Multipart,
    dir: &Path,
    max_file_bytes: usize,
) -> Result<AnalysisInput, AppError> {
    let mut created = Vec::new();
    let result = receive_fields(payload, dir, max_file_bytes, &mut created).await;
    if result.is_err() {
        discard(&created).await;
    }
    result
}

async fn discard(paths: &[PathBuf]) {
    for path in paths {
        match fs::remove_file(path).await {
            Ok(()) => log::info!("🧹 Discarded partial upload {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("⚠️  Could not remove {}: {}", path.display(), e),
        }
    }
}

async fn receive_fields(
    mut payload: Multipart,
    dir: &Path,
    max_file_bytes: usize,
    created: &mut Vec<PathBuf>,
) -> Result<AnalysisInput, AppError> {
    let mut input = AnalysisInput::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(multipart_error)?;
        let name = field.name().unwrap_or_default().to_string();

        if name == GITHUB_URL_FIELD {
            let mut raw = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(multipart_error)?;
                if raw.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                    return Err(AppError::Validation("githubUrl is too long".into()));
                }
                raw.extend_from_slice(&chunk);
            }
            let url = String::from_utf8(raw)
                .map_err(|_| AppError::Validation("githubUrl must be valid UTF-8".into()))?;
            input.github_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
            continue;
        }

        let kind = DocumentKind::from_field(&name)
            .ok_or_else(|| AppError::Validation(format!("Unexpected field: {}", name)))?;
        if input.documents.contains_key(&kind) {
            return Err(AppError::Validation(format!("Only one {} file is allowed", kind)));
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let target = dir.join(format!("{}.{}", kind, extension_for(filename.as_deref())));

        fs::create_dir_all(dir).await?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&target).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AppError::Validation(format!(
                    "{} already uploaded. Delete before re-uploading.",
                    kind
                )));
            }
            Err(e) => return Err(e.into()),
        };
        created.push(target.clone());

        let mut written = 0usize;
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(multipart_error)?;
            written += chunk.len();
            if written > max_file_bytes {
                return Err(AppError::Validation(format!(
                    "{} exceeds the maximum upload size of {} bytes",
                    kind, max_file_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        log::info!("📄 Stored {} ({} bytes) at {}", kind, written, target.display());
        input.documents.insert(kind, target);
    }

    Ok(input)
}

/// Previously uploaded image for `kind`, tried as `.png`, `.jpg`, `.jpeg`, `.webp`.
pub async fn pick_existing(dir: &Path, kind: DocumentKind) -> Option<PathBuf> {
    for ext in FALLBACK_EXTENSIONS {
        let candidate = dir.join(format!("{}.{}", kind, ext));
        if fs::metadata(&candidate).await.map(|m| m.is_file()).unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

/// Fills every document missing from `input` with an existing file on disk.
pub async fn fill_from_disk(dir: &Path, input: &mut AnalysisInput) {
    for kind in DocumentKind::ALL {
        if input.documents.contains_key(&kind) {
            continue;
        }
        if let Some(path) = pick_existing(dir, kind).await {
            input.documents.insert(kind, path);
        }
    }
}

/// Removes every stored file for `field` (whatever its extension).
pub async fn delete_document(dir: &Path, field: &str) -> Result<usize, AppError> {
    let kind = DocumentKind::from_field(field)
        .ok_or_else(|| AppError::Validation(format!("Unknown document field: {}", field)))?;

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("No {} upload found", kind)));
        }
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path.file_stem().and_then(|s| s.to_str()) == Some(kind.as_str());
        if matches && entry.file_type().await?.is_file() {
            fs::remove_file(&path).await?;
            log::info!("🗑️  Removed {}", path.display());
            removed += 1;
        }
    }

    if removed == 0 {
        return Err(AppError::NotFound(format!("No {} upload found", kind)));
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extension_defaults_to_png() {
        assert_eq!(extension_for(Some("cv.PDF")), "pdf");
        assert_eq!(extension_for(Some("scan")), "png");
        assert_eq!(extension_for(None), "png");
        assert_eq!(extension_for(Some("x.p/../df")), "png");
    }

    #[test]
    fn test_user_dir_is_sanitized_and_unique_per_user() {
        let first = ObjectId::parse_str("65a1f0c2b4d3e2a1f0c9b8a7").unwrap();
        let second = ObjectId::new();

        let dir = user_dir(Path::new("/srv/uploads"), "Ada Lovelace", &first);
        assert_eq!(dir, PathBuf::from("/srv/uploads/ada-lovelace-65a1f0c2b4d3e2a1f0c9b8a7"));
        assert_ne!(dir, user_dir(Path::new("/srv/uploads"), "Ada Lovelace", &second));
    }

    #[tokio::test]
    async fn test_pick_existing_follows_extension_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resume.webp"), b"w").unwrap();
        std::fs::write(dir.path().join("resume.jpg"), b"j").unwrap();

        let picked = pick_existing(dir.path(), DocumentKind::Resume).await.unwrap();
        assert!(picked.ends_with("resume.jpg"));
        assert!(pick_existing(dir.path(), DocumentKind::Transcript).await.is_none());
    }

    #[tokio::test]
    async fn test_fill_from_disk_keeps_fresh_uploads() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resume.png"), b"old").unwrap();
        std::fs::write(dir.path().join("certificate.png"), b"c").unwrap();

        let mut input = AnalysisInput::default();
        input.documents.insert(DocumentKind::Resume, dir.path().join("resume.pdf"));
        fill_from_disk(dir.path(), &mut input).await;

        assert!(input.documents[&DocumentKind::Resume].ends_with("resume.pdf"));
        assert!(input.documents[&DocumentKind::Certificate].ends_with("certificate.png"));
        assert!(!input.documents.contains_key(&DocumentKind::Transcript));
    }

    #[tokio::test]
    async fn test_delete_document() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resume.pdf"), b"r").unwrap();
        std::fs::write(dir.path().join("transcript.png"), b"t").unwrap();

        assert_eq!(delete_document(dir.path(), "resume").await.unwrap(), 1);
        assert!(!dir.path().join("resume.pdf").exists());
        assert!(dir.path().join("transcript.png").exists());

        assert!(matches!(
            delete_document(dir.path(), "resume").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_document(dir.path(), "passport").await,
            Err(AppError::Validation(_))
        ));
    }
}
