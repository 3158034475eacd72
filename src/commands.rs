use crate::{error::Result, gateway::Gateway};
use std::sync::Arc;
use teloxide::{
    types::Message,
    utils::{command::BotCommands, html},
};

const WELCOME_TEXT: &str = "👋 <b>Welcome!</b>\n\n\
    Send me a link to a video from a site like YouTube, Twitter, etc., \
    and I'll help you download it.";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Show the welcome message.
    Start,
    /// Display this text.
    #[command(aliases = ["h", "?"])]
    Help,
}

/// Handle a command from the user.
///
/// # Errors
///
/// Returns a Teloxide error if the message fails to send.
pub async fn answer(gateway: Arc<dyn Gateway>, msg: Message, cmd: Command) -> Result<()> {
    let text = match cmd {
        Command::Start => WELCOME_TEXT.to_owned(),
        Command::Help => html::escape(&Command::descriptions().to_string()),
    };
    gateway.send_text(msg.chat.id, &text).await?;

    Ok(())
}
