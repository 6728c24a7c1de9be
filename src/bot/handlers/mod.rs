mod command_owner;
mod command_public;

pub use command_owner::owner_command_handler;
pub use command_public::public_command_handler;
