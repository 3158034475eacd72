use crate::{
    download::{MediaBackend, MediaRecord},
    error::{Error, Result},
    formats::rank_formats,
    gateway::Gateway,
    store::{Selection, SelectionStore},
};
use std::sync::Arc;
use teloxide::{types::ChatId, utils::html};
use tracing::{error, info};
use url::Url;

pub const ANALYZING_TEXT: &str = "🔎 Analyzing link...";
pub const RESOLVE_FAILED_TEXT: &str = "❌ Sorry, I couldn't process that link. It might be private, invalid, or from an unsupported site.";
const UNTITLED: &str = "this video";

/// Turns a link into a choice prompt and remembers what was resolved.
pub struct LinkResolver {
    backend: Arc<dyn MediaBackend>,
    store: Arc<SelectionStore>,
}

impl LinkResolver {
    #[must_use]
    pub fn new(backend: Arc<dyn MediaBackend>, store: Arc<SelectionStore>) -> Self {
        Self { backend, store }
    }

    /// Resolve `url` for `chat` and present the available formats.
    ///
    /// Extraction failures are reported to the user and logged, not returned.
    ///
    /// # Errors
    ///
    /// Only errors talking to the chat itself are propagated.
    pub async fn handle(&self, gateway: &dyn Gateway, chat: ChatId, url: &Url) -> Result<()> {
        info!(chat = chat.0, url = %url, "resolving link");
        let placeholder = gateway.send_text(chat, ANALYZING_TEXT).await?;

        let record = match self.resolve(url).await {
            Ok(record) => record,
            Err(err) => {
                error!(%err, chat = chat.0, url = %url, "failed to resolve link");
                return gateway
                    .edit_text(chat, placeholder, RESOLVE_FAILED_TEXT)
                    .await;
            }
        };

        let choices = rank_formats(&record.formats);
        let text = prompt_text(&record);
        info!(
            chat = chat.0,
            id = record.id.as_deref().unwrap_or_default(),
            choices = choices.len(),
            "presenting choices"
        );

        self.store.put(chat, Selection::new(record, placeholder));
        gateway
            .edit_choices(chat, placeholder, &text, &choices)
            .await
    }

    async fn resolve(&self, url: &Url) -> Result<MediaRecord> {
        self.backend
            .resolve(url)
            .await?
            .ok_or(Error::EmptyExtraction)
    }
}

fn prompt_text(record: &MediaRecord) -> String {
    let title = record.title.as_deref().unwrap_or(UNTITLED);
    format!(
        "<b>{}</b>\n\nPlease choose a format to download:",
        html::escape(title)
    )
}
