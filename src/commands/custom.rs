use super::*;

/// Words `custom` treats as subcommands, so they cannot name a custom command.
pub const SUBCOMMANDS: &[&str] = &[
    "add", "a", "edit", "e", "delete", "rm", "del", "list", "ls", "all", "l",
];

pub struct Custom;

#[async_trait]
impl Command for Custom {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["c"]
    }

    fn description(&self) -> &'static str {
        "Shows a custom command, or manages them"
    }

    fn usage(&self) -> &'static str {
        "custom <name> | custom add <name> <text> | custom edit <name> <text> | \
         custom delete <name> | custom list [query]"
    }

    async fn handle(
        &self,
        manager: &Manager,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<Reply> {
        let registry = manager.commands();
        let (subcommand, rest) = split_word(args);

        match subcommand {
            "" => Err(Error::Validation(
                "Tell me which custom command to show.".into(),
            )),
            "add" | "a" => {
                require_owner(manager, message)?;
                let (name, text) = name_and_text(rest)?;
                registry.add_static(name, text).await?;

                Ok(Reply::React)
            }
            "edit" | "e" => {
                require_owner(manager, message)?;
                let (name, text) = name_and_text(rest)?;
                registry.edit_static(name, text).await?;

                Ok(Reply::React)
            }
            "delete" | "rm" | "del" => {
                require_owner(manager, message)?;
                registry.remove_static(rest.trim()).await?;

                Ok(Reply::React)
            }
            "list" | "ls" | "all" | "l" => {
                let names = registry.statics(rest.trim()).await;
                if names.is_empty() {
                    return Ok(Reply::Text("No results found.".into()));
                }

                Ok(Reply::Text(
                    names
                        .iter()
                        .enumerate()
                        .map(|(i, name)| format!("{}. {}", i + 1, name))
                        .collect::<Vec<_>>()
                        .join("\n"),
                ))
            }
            _ => registry
                .static_text(args.trim())
                .await
                .map(Reply::Text)
                .ok_or_else(|| Error::NotFound("That custom command doesn't exist.".into())),
        }
    }
}

fn name_and_text(rest: &str) -> Result<(&str, &str)> {
    match split_word(rest) {
        (name, text) if !name.is_empty() && !text.is_empty() => Ok((name, text)),
        _ => Err(Error::Validation(
            "I need both a name and the text to reply with.".into(),
        )),
    }
}
