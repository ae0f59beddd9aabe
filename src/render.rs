//! Result card contract shared by all presentation surfaces.

use crate::model::HighlightResult;
use serde::Serialize;

const DEFAULT_CLIP_EXT: &str = "mp4";

/// One rendered highlight: a preview, its caption, and a download action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultCard {
    /// 1-based position in the result set.
    pub index: usize,
    pub preview_src: String,
    pub caption: String,
    pub download_href: String,
    pub download_filename: String,
}

/// Build cards for a result set, preserving server order.
pub fn cards(results: &[HighlightResult]) -> Vec<ResultCard> {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| ResultCard {
            index: i + 1,
            preview_src: r.clip_url.clone(),
            caption: r.caption.clone(),
            download_href: r.clip_url.clone(),
            download_filename: download_filename(i + 1, &r.clip_url),
        })
        .collect()
}

/// `highlight_<n>.<ext>`, with the extension taken from the clip locator.
pub fn download_filename(index: usize, clip_url: &str) -> String {
    format!("highlight_{index}.{}", clip_extension(clip_url))
}

fn clip_extension(clip_url: &str) -> String {
    let path = clip_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_CLIP_EXT.to_string(),
    }
}
