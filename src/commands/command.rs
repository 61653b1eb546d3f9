use super::*;

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    fn usage(&self) -> &'static str {
        ""
    }

    fn can_handle(&self, name: &str) -> bool {
        self.name() == name || self.aliases().contains(&name)
    }

    async fn handle(
        &self,
        manager: &Manager,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<Reply>;
}
