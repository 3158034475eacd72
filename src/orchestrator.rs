use crate::{
    artifact::JobDir,
    download::{DownloadRequest, MediaBackend},
    error::{Error, Result},
    formats::Selector,
    gateway::Gateway,
    store::{Selection, SelectionStore},
    utils::{MediaKind, detect_media_kind_async},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use teloxide::{
    types::{ChatId, MessageId},
    utils::html,
};
use tracing::{error, info, warn};

pub const STALE_TEXT: &str = "Sorry, something went wrong. Please send the link again.";
pub const DONE_TEXT: &str = "✅ Download complete!";
pub const DOWNLOAD_FAILED_TEXT: &str = "❌ An error occurred during download. Please try again.";
const UNTITLED: &str = "video";

/// A pressed choice button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPress {
    pub chat: ChatId,
    /// The prompt message the button belongs to.
    pub message: MessageId,
    pub payload: String,
}

/// Runs exactly one download and delivery per button press.
pub struct DownloadOrchestrator {
    backend: Arc<dyn MediaBackend>,
    store: Arc<SelectionStore>,
    download_dir: PathBuf,
}

impl DownloadOrchestrator {
    #[must_use]
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        store: Arc<SelectionStore>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            store,
            download_dir: download_dir.into(),
        }
    }

    /// Handle a button press. The press must already be acknowledged.
    ///
    /// Stale presses and download failures are reported to the user and
    /// logged, not returned.
    ///
    /// # Errors
    ///
    /// Only errors talking to the chat itself are propagated.
    pub async fn handle(&self, gateway: &dyn Gateway, press: &ButtonPress) -> Result<()> {
        let ButtonPress {
            chat,
            message,
            payload,
        } = press;
        let (chat, message) = (*chat, *message);

        let Some(selection) = self.current_selection(press) else {
            warn!(chat = chat.0, selector = %payload, "no selection for button press");
            return gateway.edit_text(chat, message, STALE_TEXT).await;
        };

        let title = selection.record.title.as_deref().unwrap_or(UNTITLED);
        gateway
            .edit_text(chat, message, &starting_text(title))
            .await?;

        match self.download_and_deliver(gateway, chat, &selection, payload).await {
            Ok(()) => {
                info!(chat = chat.0, selector = %payload, "delivered");
                gateway.edit_text(chat, message, DONE_TEXT).await
            }
            Err(err) => {
                error!(%err, chat = chat.0, selector = %payload, "download failed");
                gateway.edit_text(chat, message, DOWNLOAD_FAILED_TEXT).await
            }
        }
    }

    /// The stored selection, if the press belongs to its prompt.
    fn current_selection(&self, press: &ButtonPress) -> Option<Selection> {
        self.store
            .get(press.chat)
            .filter(|selection| selection.prompt == press.message)
    }

    async fn download_and_deliver(
        &self,
        gateway: &dyn Gateway,
        chat: ChatId,
        selection: &Selection,
        payload: &str,
    ) -> Result<()> {
        let selector = payload.parse::<Selector>()?;
        let record = Arc::clone(&selection.record);

        // removed on drop, whichever way this function returns
        let job = JobDir::create(&self.download_dir, &record.file_stem(chat)).await?;
        let request = DownloadRequest::new(record, selector, chat, job.path());

        info!(
            chat = chat.0,
            selector = %selector,
            url = request.record.page_url(),
            "starting download"
        );
        self.backend.download(&request).await?;

        let artifact = job.artifact(&request.expected_path).await?;
        deliver(gateway, chat, &request, &artifact).await?;

        if let Err(err) = job.close() {
            warn!(%err, chat = chat.0, "failed to remove job dir");
        }
        Ok(())
    }
}

async fn deliver(
    gateway: &dyn Gateway,
    chat: ChatId,
    request: &DownloadRequest,
    artifact: &Path,
) -> Result<()> {
    let kind = detect_media_kind_async(artifact).await;
    match (request.selector, kind) {
        (Selector::AudioOnly, MediaKind::Audio) => {
            let title = request.record.title.as_deref().unwrap_or(UNTITLED);
            gateway.send_audio(chat, artifact, title).await
        }
        (Selector::Height(_), MediaKind::Video) => gateway.send_video(chat, artifact).await,
        _ => Err(Error::UnknownMediaKind),
    }
}

fn starting_text(title: &str) -> String {
    format!(
        "⬇️ Starting download for <b>{}</b>...\n\nThis may take a moment.",
        html::escape(title)
    )
}
