use teloxide::types::Message;

#[macro_export]
macro_rules! reply_to {
    ($bot:expr, $msg:expr, $text:expr) => {
        $bot.send_message($msg.chat.id, $text).reply_to_message_id($msg.id)
    };
}

/// 日志中用来标识发送者
pub fn sender(msg: &Message) -> String {
    match msg.from() {
        Some(user) => user.id.to_string(),
        None => format!("chat {}", msg.chat.id),
    }
}
