//! Telegram bot handlers.

use crate::config::{ChatThread, ThreadsConfig};
use async_trait::async_trait;
use balance_engine::BalanceService;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ThreadId};
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Low balance report for this chat's network")]
    Stat,
    #[command(description = "Current partner balances")]
    Balance,
    #[command(description = "Show help")]
    Help,
}

/// Whether a report text is worth sending.
pub fn has_content(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Destination for rendered reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Send `text` to the thread. Returns `false` if the text was empty and
    /// nothing was sent.
    async fn send_report(&self, thread: &ChatThread, text: &str) -> Result<bool, TelegramError>;
}

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    threads: ThreadsConfig,
    service: Arc<BalanceService>,
}

impl TelegramBot {
    pub fn new(token: &str, threads: ThreadsConfig, service: Arc<BalanceService>) -> Self {
        Self {
            bot: Bot::new(token),
            threads,
            service,
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn threads(&self) -> &ThreadsConfig {
        &self.threads
    }

    /// Run the bot command handler.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(msg, cmd).await }
            },
        );

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_command(&self, msg: Message, cmd: Command) -> Result<(), TelegramError> {
        let chat_id = msg.chat.id.0;
        let Some(thread) = self.threads.find_by_chat(chat_id) else {
            info!(chat_id, "Ignoring command from unknown chat");
            return Ok(());
        };
        info!(chat_id, network = %thread.network, command = ?cmd, "Received command");

        let result = match cmd {
            Command::Stat => self.service.stat(&thread.network).await,
            Command::Balance => self.service.balances(&thread.network).await,
            Command::Help => Ok(Command::descriptions().to_string()),
        };

        match result {
            Ok(text) => {
                self.send_report(thread, &text).await?;
            }
            Err(e) => error!(network = %thread.network, error = %e, "Failed to build report"),
        }
        Ok(())
    }
}

#[async_trait]
impl ReportSink for TelegramBot {
    async fn send_report(&self, thread: &ChatThread, text: &str) -> Result<bool, TelegramError> {
        if !has_content(text) {
            info!(network = %thread.network, "Empty report, nothing sent");
            return Ok(false);
        }

        let mut request = self
            .bot
            .send_message(ChatId(thread.chat_id), text)
            .parse_mode(ParseMode::Html);
        if thread.thread_id != 0 {
            request = request.message_thread_id(ThreadId(MessageId(thread.thread_id)));
        }

        if let Err(e) = request.await {
            warn!(chat_id = thread.chat_id, thread_id = thread.thread_id, error = %e, "Send failed");
            return Err(e.into());
        }
        Ok(true)
    }
}
