use crate::{
    error::{Error, Result},
    formats::Choice,
};
use std::path::Path;
use teloxide::{
    Bot,
    payloads::{EditMessageTextSetters, SendAudioSetters, SendMessageSetters, SendVideoSetters},
    prelude::Requester,
    types::{
        CallbackQueryId, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId,
        ParseMode,
    },
};

/// Outbound side of the chat transport. Text is sent as HTML, so callers
/// escape anything user-provided.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Send a new message and return its id for later in-place edits.
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId>;

    /// Replace the text of an existing message, dropping its buttons.
    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()>;

    /// Replace the text of an existing message and attach one button per choice.
    async fn edit_choices(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        choices: &[Choice],
    ) -> Result<()>;

    async fn send_audio(&self, chat: ChatId, path: &Path, title: &str) -> Result<()>;

    async fn send_video(&self, chat: ChatId, path: &Path) -> Result<()>;

    /// Answer a button press so the client stops its loading indicator.
    async fn acknowledge(&self, query: CallbackQueryId) -> Result<()>;
}

/// One button per row, payload is the selector verbatim.
#[must_use]
pub fn choice_keyboard(choices: &[Choice]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(choices.iter().map(|choice| {
        [InlineKeyboardButton::callback(
            choice.label.clone(),
            choice.selector.payload(),
        )]
    }))
}

#[async_trait::async_trait]
impl Gateway for Bot {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId> {
        let msg = self
            .send_message(chat, text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(Error::from)?;
        Ok(msg.id)
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()> {
        self.edit_message_text(chat, message, text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn edit_choices(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        choices: &[Choice],
    ) -> Result<()> {
        self.edit_message_text(chat, message, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(choice_keyboard(choices))
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn send_audio(&self, chat: ChatId, path: &Path, title: &str) -> Result<()> {
        Requester::send_audio(self, chat, InputFile::file(path))
            .title(title)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn send_video(&self, chat: ChatId, path: &Path) -> Result<()> {
        Requester::send_video(self, chat, InputFile::file(path))
            .supports_streaming(true)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn acknowledge(&self, query: CallbackQueryId) -> Result<()> {
        self.answer_callback_query(query)
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}
