use super::state::Notice;
use crate::render::ResultCard;
use crate::service::HttpHighlightService;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

// Clipboard worker channel, started on first copy.
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Absolute URL for a card, so a copied link works outside the client.
pub fn clip_link(service: &HttpHighlightService, card: &ResultCard) -> String {
    service
        .resolve(&card.download_href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| card.download_href.clone())
}

/// Download a clip on the runtime and report the outcome as an info line.
pub fn spawn_download(
    rt: &tokio::runtime::Handle,
    service: HttpHighlightService,
    card: ResultCard,
    dir: PathBuf,
    notice_tx: UnboundedSender<Notice>,
) {
    rt.spawn(async move {
        let msg = match crate::download::save_clip(&service, &card, &dir).await {
            Ok(path) => format!("Saved: {}", path.display()),
            Err(e) => format!("Download failed: {e:#}"),
        };
        let _ = notice_tx.send(Notice::Info(msg));
    });
}

/// Start the clipboard thread once. Each copy gets its own clipboard instance, kept alive
/// long enough for Linux clipboard managers to take ownership of the contents.
fn clipboard_sender() -> &'static std_mpsc::Sender<String> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            for text in rx {
                if let Ok(mut clipboard) = arboard::Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });
        tx
    })
}

/// Queue text for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    clipboard_sender()
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard worker stopped"))
}
