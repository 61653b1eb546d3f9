use crate::{
    commands::{self, Command},
    db::FlatStore,
    error::{Error, Result},
    prefix::split_word,
};
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tracing::info;

/// What the bot needs to know about a message, independent of the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub content: String,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub channel_id: ChannelId,
    /// `None` for direct messages.
    pub guild_id: Option<GuildId>,
    pub permissions: AuthorPermissions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorPermissions {
    pub manage_messages: bool,
    pub manage_guild: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Acknowledge with a reaction on the invoking message.
    React,
    /// Sent privately to the author.
    Direct(String),
    Silent,
}

impl Reply {
    pub fn into_text(self) -> String {
        match self {
            Reply::Text(text) | Reply::Direct(text) => text,
            Reply::React => "👌".to_string(),
            Reply::Silent => String::new(),
        }
    }
}

#[derive(Clone)]
pub enum CommandKind {
    /// A custom command that replies with fixed text.
    Static(String),
    Builtin(Arc<dyn Command>),
}

/// Built-in commands plus the custom commands kept in a [`FlatStore`].
pub struct CommandRegistry {
    builtins: Vec<Arc<dyn Command>>,
    statics: Arc<FlatStore>,
}

impl CommandRegistry {
    pub fn new(statics: Arc<FlatStore>) -> Self {
        Self::with_builtins(commands::builtins(), statics)
    }

    pub fn with_builtins(builtins: Vec<Arc<dyn Command>>, statics: Arc<FlatStore>) -> Self {
        Self { builtins, statics }
    }

    pub fn builtins(&self) -> &[Arc<dyn Command>] {
        &self.builtins
    }

    pub fn builtin(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.builtins.iter().find(|c| c.can_handle(name))
    }

    /// Built-ins shadow custom commands of the same name.
    pub async fn lookup(&self, name: &str) -> Option<CommandKind> {
        if let Some(command) = self.builtin(name) {
            return Some(CommandKind::Builtin(Arc::clone(command)));
        }

        self.static_text(name).await.map(CommandKind::Static)
    }

    pub async fn static_text(&self, name: &str) -> Option<String> {
        self.statics.get(name).await
    }

    pub async fn add_static(&self, name: &str, text: &str) -> Result<()> {
        validate_name(name)?;

        if self.builtin(name).is_some() {
            return Err(Error::Validation(format!(
                "`{}` is already a built-in command.",
                name
            )));
        }
        if self.statics.contains(name).await {
            return Err(Error::Validation(format!(
                "There already is a custom command called {}.",
                name
            )));
        }

        info!(name, "adding custom command");
        self.statics.put(name, text).await
    }

    pub async fn edit_static(&self, name: &str, text: &str) -> Result<()> {
        if !self.statics.contains(name).await {
            return Err(not_found());
        }

        info!(name, "editing custom command");
        self.statics.put(name, text).await
    }

    pub async fn remove_static(&self, name: &str) -> Result<()> {
        info!(name, "removing custom command");

        self.statics.delete(name).await.map_err(|e| match e {
            Error::KeyNotFound(_) => not_found(),
            e => e,
        })
    }

    /// Sorted names of custom commands containing `query`.
    pub async fn statics(&self, query: &str) -> Vec<String> {
        let mut names = self
            .statics
            .keys()
            .await
            .into_iter()
            .filter(|name| name.contains(query))
            .collect::<Vec<_>>();
        names.sort();

        names
    }
}

fn validate_name(name: &str) -> Result<()> {
    let (word, rest) = split_word(name);

    if word.is_empty() || !rest.is_empty() || word != name {
        return Err(Error::Validation(
            "Custom command names are a single word.".into(),
        ));
    }
    if commands::CUSTOM_SUBCOMMANDS.contains(&name) {
        return Err(Error::Validation(format!(
            "`{}` is already a subcommand of `custom`.",
            name
        )));
    }

    Ok(())
}

fn not_found() -> Error {
    Error::NotFound("That custom command doesn't exist.".into())
}
