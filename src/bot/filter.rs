use anyhow::Result;
use teloxide::dispatching::DpHandlerDescription;
use teloxide::prelude::*;
use teloxide::types::UserId;

use crate::config::Config;

/// 只放行所有者发送的消息
pub fn filter_owner_msg() -> Handler<'static, DependencyMap, Result<()>, DpHandlerDescription> {
    dptree::filter(|msg: Message, cfg: Config| {
        is_owner(msg.from().map(|u| u.id), cfg.telegram.owner_id)
    })
}

pub fn is_owner(user: Option<UserId>, owner: ChatId) -> bool {
    user.map(ChatId::from) == Some(owner)
}
