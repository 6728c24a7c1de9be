use std::sync::Arc;

use teloxide::dispatching::DefaultKey;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;

use crate::bot::handlers::{owner_command_handler, public_command_handler};
use crate::bot::Bot;
use crate::config::Config;
use crate::status::Status;

pub fn build_dispatcher(
    bot: Bot,
    config: Config,
    status: Arc<Status>,
) -> Dispatcher<Bot, anyhow::Error, DefaultKey> {
    let handler = Update::filter_message()
        .branch(owner_command_handler())
        .branch(public_command_handler());

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![config, status])
        .default_handler(|_| async {})
        .error_handler(LoggingErrorHandler::with_custom_text("处理消息时出错"))
        .build()
}
