use super::*;

pub struct Ping;

#[async_trait]
impl Command for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["pong"]
    }

    fn description(&self) -> &'static str {
        "Checks that the bot is listening"
    }

    async fn handle(
        &self,
        _manager: &Manager,
        _message: &IncomingMessage,
        _args: &str,
    ) -> Result<Reply> {
        Ok(Reply::Text("Pong! 🏓".to_string()))
    }
}
