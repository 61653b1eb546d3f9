use super::*;
use crate::session::{Evaluator, Session};
use tracing::error;

pub struct Shell;

#[async_trait]
impl Command for Shell {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["repl"]
    }

    fn description(&self) -> &'static str {
        "Opens a shell in this channel that runs commands without a prefix"
    }

    fn usage(&self) -> &'static str {
        "shell [title]\nWrap each command in backticks. `exit()` or `quit` to exit."
    }

    async fn handle(
        &self,
        manager: &Manager,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<Reply> {
        require_owner(manager, message)?;

        let channel_id = message.channel_id;
        let (session_id, inputs) = manager
            .sessions()
            .open(channel_id, message.author_id)
            .await
            .ok_or_else(|| Error::Validation("There already is a shell in this channel.".into()))?;

        let session = Session::new(
            channel_id,
            inputs,
            manager.outbound(),
            manager.config().shell_timeout,
            CommandEvaluator {
                manager: manager.clone(),
                message: message.clone(),
            },
        );
        let manager = manager.clone();
        tokio::spawn(async move {
            session.run().await;
            manager.sessions().close(channel_id, session_id).await;
        });

        let title = args.trim();
        let heading = if title.is_empty() {
            String::new()
        } else {
            format!("**{}**\n", title)
        };

        Ok(Reply::Text(format!(
            "{}_Enter commands to run, wrapped in backticks. `exit()` or `quit` to exit._",
            heading
        )))
    }
}

/// Runs shell input as a prefix-less command on behalf of the session owner.
pub struct CommandEvaluator {
    manager: Manager,
    message: IncomingMessage,
}

#[async_trait]
impl Evaluator for CommandEvaluator {
    async fn evaluate(&self, code: &str) -> String {
        match self.manager.dispatch(&self.message, code).await {
            None => format!("No command called `{}`.", split_word(code).0),
            Some(Ok(reply)) => reply.into_text(),
            Some(Err(e)) => {
                if !e.is_user_facing() {
                    error!(error = %e, "shell command failed");
                }
                e.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::tests::{manager, message, run, CHANNEL, MEMBER, OWNER};

    #[tokio::test]
    async fn owner_shell_runs_commands_until_exit() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut posted) = manager(&dir).await;

        assert!(matches!(
            run(&manager, &message(OWNER, "-shell scratch")).await,
            Some(Ok(Reply::Text(text))) if text.starts_with("**scratch**")
        ));
        assert!(manager.sessions().is_open(CHANNEL).await);
        assert!(matches!(
            run(&manager, &message(OWNER, "-shell")).await,
            Some(Err(Error::Validation(_)))
        ));

        // Not backticked, so it goes through normal resolution.
        assert!(!manager.forward_to_session(&message(OWNER, "-ping")).await);
        assert!(!manager.forward_to_session(&message(MEMBER, "`ping`")).await);

        assert!(manager.forward_to_session(&message(OWNER, "`ping`")).await);
        assert_eq!(posted.recv().await.unwrap().content, "Pong! 🏓");

        assert!(manager.forward_to_session(&message(OWNER, "`nothing`")).await);
        assert_eq!(
            posted.recv().await.unwrap().content,
            "No command called `nothing`."
        );

        assert!(manager.forward_to_session(&message(OWNER, "`exit()`")).await);
        assert_eq!(posted.recv().await.unwrap().content, "Exiting shell.");

        // The session unregisters itself right after its closing notice.
        tokio::task::yield_now().await;
        while manager.sessions().is_open(CHANNEL).await {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn members_cannot_open_a_shell() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;

        assert!(matches!(
            run(&manager, &message(MEMBER, "-shell")).await,
            Some(Err(Error::Forbidden))
        ));
        assert!(!manager.sessions().is_open(CHANNEL).await);
    }
}
