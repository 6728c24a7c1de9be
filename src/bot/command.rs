use teloxide::macros::BotCommands;

#[derive(BotCommands, Debug, Clone, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Public commands:")]
pub enum PublicCommand {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "check that the bot is alive")]
    Ping,
}

#[derive(BotCommands, Debug, Clone, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Owner commands:")]
pub enum OwnerCommand {
    #[command(description = "show how long the bot has been running")]
    Uptime,
}
