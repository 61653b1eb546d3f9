use crate::{
    command_handler::{IncomingMessage, Reply},
    error::{Error, Result},
    manager::Manager,
    prefix::split_word,
};
use serenity::async_trait;
use std::sync::Arc;

mod command;
mod custom;
mod help;
mod lockdown;
mod ping;
mod prefix;
mod shell;
mod uptime;

pub use command::Command;
pub use custom::{Custom, SUBCOMMANDS as CUSTOM_SUBCOMMANDS};
pub use help::Help;
pub use lockdown::Lockdown;
pub use ping::Ping;
pub use prefix::Prefix;
pub use shell::{CommandEvaluator, Shell};
pub use uptime::Uptime;

pub fn builtins() -> Vec<Arc<dyn Command>> {
    vec![
        Arc::new(Prefix) as Arc<dyn Command>,
        Arc::new(Custom),
        Arc::new(Lockdown),
        Arc::new(Shell),
        Arc::new(Ping),
        Arc::new(Uptime),
        Arc::new(Help),
    ]
}

fn require_owner(manager: &Manager, message: &IncomingMessage) -> Result<()> {
    if manager.is_owner(message.author_id) {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

fn require_guild(message: &IncomingMessage) -> Result<serenity::model::id::GuildId> {
    message.guild_id.ok_or_else(|| {
        Error::Validation("This command cannot be used in private messages.".into())
    })
}
