use crate::{
    commands::{self, Command},
    config::Config,
    download::{MediaBackend, YtDlp},
    error::{Error, Result},
    gateway::Gateway,
    orchestrator::{ButtonPress, DownloadOrchestrator},
    resolver::LinkResolver,
    store::SelectionStore,
    validate::extract_url,
};
use std::{path::PathBuf, sync::Arc};
use teloxide::{
    dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler},
    error_handlers::LoggingErrorHandler,
    prelude::*,
};
use tracing::{debug, info, warn};

/// Shared state injected into every update handler.
pub struct App {
    resolver: LinkResolver,
    orchestrator: DownloadOrchestrator,
}

impl App {
    #[must_use]
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        store: Arc<SelectionStore>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver: LinkResolver::new(Arc::clone(&backend), Arc::clone(&store)),
            orchestrator: DownloadOrchestrator::new(backend, store, download_dir),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let backend = Arc::new(YtDlp::new(config.ytdlp.clone(), config.max_concurrent_jobs));
        let store = Arc::new(SelectionStore::new(config.selection_ttl));
        Self::new(backend, store, config.download_dir.clone())
    }
}

/// Update routing: commands, then links in text, then choice buttons.
#[must_use]
pub fn schema() -> UpdateHandler<Error> {
    let commands = dptree::entry()
        .filter_command::<Command>()
        .endpoint(commands::answer);

    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(commands)
                .branch(dptree::endpoint(on_message)),
        )
        .branch(Update::filter_callback_query().endpoint(on_button))
}

async fn on_message(gateway: Arc<dyn Gateway>, msg: Message, app: Arc<App>) -> Result<()> {
    let Some(url) = msg.text().or_else(|| msg.caption()).and_then(extract_url) else {
        debug!(chat = msg.chat.id.0, "message without a link");
        return Ok(());
    };
    app.resolver.handle(gateway.as_ref(), msg.chat.id, &url).await
}

async fn on_button(gateway: Arc<dyn Gateway>, query: CallbackQuery, app: Arc<App>) -> Result<()> {
    // acknowledge before any long-running work; an expired query still gets handled
    if let Err(err) = gateway.acknowledge(query.id.clone()).await {
        warn!(%err, "failed to answer callback query");
    }

    let (Some(payload), Some(message)) = (query.data, query.message) else {
        debug!("callback query without data or message");
        return Ok(());
    };

    let press = ButtonPress {
        chat: message.chat().id,
        message: message.id(),
        payload,
    };
    app.orchestrator.handle(gateway.as_ref(), &press).await
}

/// Run the bot until interrupted.
///
/// The dispatcher handles updates of one chat in order and different chats
/// concurrently, so a download only ever blocks its own chat.
pub async fn run(bot: Bot, app: App) {
    info!("bot starting");
    let gateway: Arc<dyn Gateway> = Arc::new(bot.clone());
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![gateway, Arc::new(app)])
        .default_handler(|upd| async move {
            debug!(?upd, "unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "error in update handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    info!("bot stopped");
}
