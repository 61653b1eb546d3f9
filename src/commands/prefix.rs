use super::*;
use crate::prefix::PrefixEntry;

pub struct Prefix;

#[async_trait]
impl Command for Prefix {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn description(&self) -> &'static str {
        "Lists or customizes the prefixes for this server"
    }

    fn usage(&self) -> &'static str {
        "prefix [add <prefix> | regex <pattern> | remove <prefix> | clear | reset]\n\
         Quote word prefixes to keep their trailing space, e.g. `prefix add \"hello \"`. \
         Changing prefixes needs the Manage Server permission."
    }

    async fn handle(
        &self,
        manager: &Manager,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<Reply> {
        let (subcommand, rest) = split_word(args);

        if subcommand.is_empty() {
            return list(manager, message).await;
        }

        let guild_id = require_guild(message)?;
        if !manager.is_owner(message.author_id) && !message.permissions.manage_guild {
            return Err(Error::Forbidden);
        }
        let prefixes = manager.prefixes();

        match subcommand {
            "add" => {
                let entry = PrefixEntry::literal(single_argument(rest)?);
                reject_reserved(manager, &entry)?;
                prefixes.add_prefix(guild_id, entry).await?;
            }
            "regex" => {
                let entry = PrefixEntry::regex(unquote(rest))?;
                reject_reserved(manager, &entry)?;
                prefixes.add_prefix(guild_id, entry).await?;
            }
            "remove" | "delete" | "del" | "rm" => {
                prefixes
                    .remove_prefix(guild_id, &single_argument(rest)?)
                    .await?;
            }
            "clear" => prefixes.clear_prefixes(guild_id).await?,
            "reset" => prefixes.reset_prefixes(guild_id).await?,
            other => {
                return Err(Error::Validation(format!(
                    "I don't know how to `prefix {}`.",
                    other
                )))
            }
        }

        Ok(Reply::React)
    }
}

async fn list(manager: &Manager, message: &IncomingMessage) -> Result<Reply> {
    let bot_id = manager
        .bot_id()
        .ok_or_else(|| Error::Validation("I'm not ready yet.".into()))?;

    let guild_prefixes = match message.guild_id {
        Some(guild_id) => Some(manager.prefixes().prefixes(guild_id).await),
        None => None,
    };
    let mut candidates = manager
        .resolver()
        .candidates(bot_id, guild_prefixes.as_deref());
    // Both mention forms render the same way.
    candidates.remove(1);

    let lines = candidates
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("#{}: {}", i + 1, entry))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Reply::Text(format!(
        "**Prefixes**\n{}\nI have {} prefixes",
        lines,
        candidates.len()
    )))
}

fn reject_reserved(manager: &Manager, entry: &PrefixEntry) -> Result<()> {
    match manager.bot_id() {
        Some(bot_id) => entry.reject_reserved(bot_id),
        None => Ok(()),
    }
}

/// Exactly one prefix, optionally quoted to keep surrounding spaces.
fn single_argument(rest: &str) -> Result<String> {
    let rest = rest.trim();

    if rest.is_empty() {
        return Err(Error::Validation("You need to tell me the prefix.".into()));
    }

    let (argument, extra) = match rest.strip_prefix('"') {
        Some(quoted) => match quoted.find('"') {
            Some(end) => (&quoted[..end], quoted[end + 1..].trim()),
            None => return Err(Error::Validation("You're missing a closing quote.".into())),
        },
        None => split_word(rest),
    };

    if !extra.is_empty() {
        return Err(Error::Validation(
            "You can only add one prefix at a time. If you are trying to use a multi-word \
             prefix, put it in quotes."
                .into(),
        ));
    }

    Ok(argument.to_string())
}

fn unquote(rest: &str) -> &str {
    let rest = rest.trim();

    rest.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(rest)
}
