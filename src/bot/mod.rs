mod client;
mod command;
mod dispatcher;
mod filter;
mod handlers;
mod utils;

pub use client::{LinkBot, Running, RESTART_NOTICE};
pub use command::{OwnerCommand, PublicCommand};
pub use dispatcher::build_dispatcher;
use teloxide::adaptors::{CacheMe, DefaultParseMode, Throttle};

pub type Bot = CacheMe<DefaultParseMode<Throttle<teloxide::Bot>>>;
