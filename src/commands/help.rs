use super::*;

pub struct Help;

#[async_trait]
impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "Helps you out a bit"
    }

    fn usage(&self) -> &'static str {
        "help [command]"
    }

    async fn handle(
        &self,
        manager: &Manager,
        _message: &IncomingMessage,
        args: &str,
    ) -> Result<Reply> {
        let registry = manager.commands();
        let (name, _) = split_word(args);

        if name.is_empty() {
            let mut lines = registry
                .builtins()
                .iter()
                .map(|c| format!("`{}` - {}", c.name(), c.description()))
                .collect::<Vec<_>>();
            lines.push("Custom commands are listed with `custom list`.".to_string());

            return Ok(Reply::Text(lines.join("\n")));
        }

        if let Some(command) = registry.builtin(name) {
            let mut text = format!("`{}` - {}", command.name(), command.description());
            if !command.aliases().is_empty() {
                text.push_str(&format!("\nAliases: {}", command.aliases().join(", ")));
            }
            if !command.usage().is_empty() {
                text.push_str(&format!("\nUsage: {}", command.usage()));
            }

            return Ok(Reply::Text(text));
        }

        if registry.static_text(name).await.is_some() {
            return Ok(Reply::Text(format!("`{}` is a custom command.", name)));
        }

        Err(Error::NotFound(format!(
            "Command \"{}\" not found.",
            name.replace('@', "@\u{200b}")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::tests::{manager, message, run, MEMBER};

    #[tokio::test]
    async fn lists_and_describes_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;

        let listing = run(&manager, &message(MEMBER, "-help")).await.unwrap().unwrap();
        let listing = listing.into_text();
        for command in manager.commands().builtins() {
            assert!(listing.contains(&format!("`{}`", command.name())));
        }

        let ping = run(&manager, &message(MEMBER, "-help ping")).await.unwrap().unwrap();
        assert_eq!(
            ping,
            Reply::Text("`ping` - Checks that the bot is listening\nAliases: pong".into())
        );

        manager.commands().add_static("wave", "o/").await.unwrap();
        assert_eq!(
            run(&manager, &message(MEMBER, "-help wave")).await.unwrap().unwrap(),
            Reply::Text("`wave` is a custom command.".into())
        );

        assert!(matches!(
            run(&manager, &message(MEMBER, "-help @everyone")).await,
            Some(Err(Error::NotFound(text))) if !text.contains("@everyone")
        ));
    }
}
