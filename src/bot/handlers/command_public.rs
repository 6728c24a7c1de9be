use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::DpHandlerDescription;
use teloxide::dptree::case;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html::escape;
use tracing::info;

use crate::bot::command::{OwnerCommand, PublicCommand};
use crate::bot::filter::is_owner;
use crate::bot::utils::sender;
use crate::bot::Bot;
use crate::config::Config;
use crate::reply_to;
use crate::status::Status;

pub fn public_command_handler() -> Handler<'static, DependencyMap, Result<()>, DpHandlerDescription>
{
    teloxide::filter_command::<PublicCommand, _>()
        .branch(case![PublicCommand::Start].endpoint(cmd_start))
        .branch(case![PublicCommand::Help].endpoint(cmd_help))
        .branch(case![PublicCommand::Ping].endpoint(cmd_ping))
}

async fn cmd_start(bot: Bot, msg: Message, status: Arc<Status>) -> Result<()> {
    info!("{}: /start", sender(&msg));
    let name = msg.from().map(|u| u.first_name.as_str()).unwrap_or("there");
    reply_to!(bot, msg, welcome_text(name, &status.username)).await?;
    Ok(())
}

async fn cmd_help(bot: Bot, msg: Message, cfg: Config, status: Arc<Status>) -> Result<()> {
    info!("{}: /help", sender(&msg));
    let owner = is_owner(msg.from().map(|u| u.id), cfg.telegram.owner_id);
    reply_to!(bot, msg, help_text(&status.username, owner)).await?;
    Ok(())
}

async fn cmd_ping(bot: Bot, msg: Message) -> Result<()> {
    info!("{}: /ping", sender(&msg));
    reply_to!(bot, msg, "pong~").await?;
    Ok(())
}

fn welcome_text(name: &str, username: &str) -> String {
    format!(
        "Hello <b>{}</b>!\n\nThis is @{}, a links sharing bot.\nSend /help to see what I can do.",
        escape(name),
        escape(username)
    )
}

fn help_text(username: &str, owner: bool) -> String {
    let public_help = PublicCommand::descriptions().username(username).to_string();
    if owner {
        let owner_help = OwnerCommand::descriptions().username(username).to_string();
        escape(&format!("{}\n\n{}", owner_help, public_help))
    } else {
        escape(&public_help)
    }
}
