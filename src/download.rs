//! Saving highlight clips to disk under their card filenames.

use crate::render::ResultCard;
use crate::service::HighlightService;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// User's download directory, falling back to the current directory.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Fetch one clip and write it as `dir/<download_filename>`. Returns the written path.
pub async fn save_clip<S>(service: &S, card: &ResultCard, dir: &Path) -> Result<PathBuf>
where
    S: HighlightService + ?Sized,
{
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create download directory {}", dir.display()))?;

    let bytes = service
        .fetch_clip(&card.download_href)
        .await
        .with_context(|| format!("download {}", card.download_href))?;

    let path = dir.join(&card.download_filename);
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved clip");
    Ok(path)
}

/// Outcome of saving a result set: what was written before any failure.
#[derive(Debug, Default)]
pub struct SavedClips {
    pub paths: Vec<PathBuf>,
    pub error: Option<anyhow::Error>,
}

/// Save every card in order. Stops at the first failure, keeping the clips already written.
pub async fn save_all<S>(service: &S, cards: &[ResultCard], dir: &Path) -> SavedClips
where
    S: HighlightService + ?Sized,
{
    let mut saved = SavedClips {
        paths: Vec::with_capacity(cards.len()),
        error: None,
    };
    for card in cards {
        match save_clip(service, card, dir).await {
            Ok(path) => saved.paths.push(path),
            Err(e) => {
                tracing::warn!(
                    file = %card.download_filename,
                    error = %format!("{e:#}"),
                    "clip download failed"
                );
                saved.error = Some(e);
                break;
            }
        }
    }
    saved
}
