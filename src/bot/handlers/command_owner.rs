use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::DpHandlerDescription;
use teloxide::dptree::case;
use teloxide::prelude::*;
use tracing::info;

use crate::bot::command::OwnerCommand;
use crate::bot::filter::filter_owner_msg;
use crate::bot::utils::sender;
use crate::bot::Bot;
use crate::reply_to;
use crate::status::{format_uptime, Status};

pub fn owner_command_handler() -> Handler<'static, DependencyMap, Result<()>, DpHandlerDescription>
{
    teloxide::filter_command::<OwnerCommand, _>()
        .chain(filter_owner_msg())
        .branch(case![OwnerCommand::Uptime].endpoint(cmd_uptime))
}

async fn cmd_uptime(bot: Bot, msg: Message, status: Arc<Status>) -> Result<()> {
    info!("{}: /uptime", sender(&msg));
    reply_to!(bot, msg, uptime_text(&status)).await?;
    Ok(())
}

fn uptime_text(status: &Status) -> String {
    format!(
        "<b>Uptime:</b> {}\n<b>Started at:</b> {}",
        format_uptime(status.uptime()),
        status.started_at.format("%Y-%m-%d %H:%M:%S")
    )
}
