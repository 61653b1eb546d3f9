use super::*;

pub struct Lockdown;

#[async_trait]
impl Command for Lockdown {
    fn name(&self) -> &'static str {
        "lockdown"
    }

    fn description(&self) -> &'static str {
        "Toggles a lockdown that keeps non-moderators from using commands in this channel"
    }

    async fn handle(
        &self,
        manager: &Manager,
        message: &IncomingMessage,
        _args: &str,
    ) -> Result<Reply> {
        require_guild(message)?;
        if !manager.is_owner(message.author_id) && !message.permissions.manage_messages {
            return Err(Error::Forbidden);
        }

        manager.lockdown().toggle(message.channel_id).await;

        Ok(Reply::React)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lockdown::LockdownStatus,
        manager::tests::{manager, message, run, CHANNEL, MEMBER},
    };

    #[tokio::test]
    async fn moderators_toggle_lockdown() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;

        assert!(matches!(
            run(&manager, &message(MEMBER, "-lockdown")).await,
            Some(Err(Error::Forbidden))
        ));

        let mut moderator = message(MEMBER, "-lockdown");
        moderator.permissions.manage_messages = true;
        assert!(matches!(run(&manager, &moderator).await, Some(Ok(Reply::React))));
        assert!(matches!(
            manager.lockdown().check(CHANNEL).await,
            LockdownStatus::Locked { .. }
        ));

        run(&manager, &moderator).await.unwrap().unwrap();
        assert_eq!(manager.lockdown().check(CHANNEL).await, LockdownStatus::Open);
    }
}
