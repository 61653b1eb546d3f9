use crate::{
    command_handler::{CommandKind, CommandRegistry, IncomingMessage, Reply},
    config::Config,
    db::FlatStore,
    error::Result,
    lockdown::{Lockdown, LockdownStatus},
    prefix::{split_word, Invocation, PrefixResolver},
    prefix_config::GuildPrefixes,
    session::{Outgoing, Sessions},
};
use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, warn};

/// Shared bot state handed to every command.
#[derive(Clone)]
pub struct Manager {
    config: Arc<Config>,
    resolver: Arc<PrefixResolver>,
    prefixes: Arc<GuildPrefixes>,
    commands: Arc<CommandRegistry>,
    lockdown: Arc<Lockdown>,
    sessions: Arc<Sessions>,
    outbound: mpsc::UnboundedSender<Outgoing>,
    bot_id: Arc<OnceCell<UserId>>,
    started_at: DateTime<Utc>,
}

impl Manager {
    pub async fn with_config(
        config: Config,
        outbound: mpsc::UnboundedSender<Outgoing>,
    ) -> Result<Self> {
        let prefix_store = FlatStore::open(&config.prefix_file).await?;
        let custom_store = FlatStore::open(&config.custom_commands_file).await?;

        let resolver = PrefixResolver::new(
            config.owner_id,
            config.owner_bypass,
            config.direct_message_prefixes(),
        );
        if config.owner_bypass {
            warn!("owner bypass is enabled, every owner message is treated as a command");
        }

        Ok(Self {
            resolver: Arc::new(resolver),
            prefixes: Arc::new(GuildPrefixes::new(
                Arc::new(prefix_store),
                config.default_prefix.clone(),
                config.max_prefixes,
            )),
            commands: Arc::new(CommandRegistry::new(Arc::new(custom_store))),
            lockdown: Arc::new(Lockdown::new(config.lockdown_duration)),
            sessions: Arc::new(Sessions::default()),
            outbound,
            bot_id: Arc::new(OnceCell::new()),
            started_at: Utc::now(),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &PrefixResolver {
        &self.resolver
    }

    pub fn prefixes(&self) -> &GuildPrefixes {
        &self.prefixes
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn lockdown(&self) -> &Lockdown {
        &self.lockdown
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub fn outbound(&self) -> mpsc::UnboundedSender<Outgoing> {
        self.outbound.clone()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Only the first call has an effect; the bot's ID does not change.
    pub fn set_bot_id(&self, bot_id: UserId) {
        let _ = self.bot_id.set(bot_id);
    }

    pub fn bot_id(&self) -> Option<UserId> {
        self.bot_id.get().copied()
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.config.owner_id == Some(user_id)
    }

    /// Passes the message to an open shell session if it is meant for one.
    pub async fn forward_to_session(&self, message: &IncomingMessage) -> bool {
        self.sessions
            .forward(message.channel_id, message.author_id, &message.content)
            .await
    }

    /// Works out whether the message invokes a command at all.
    pub async fn resolve(&self, message: &IncomingMessage) -> Option<Invocation> {
        if message.author_is_bot {
            return None;
        }
        let bot_id = self.bot_id()?;

        let guild_prefixes = match message.guild_id {
            Some(guild_id) => Some(self.prefixes.prefixes(guild_id).await),
            None => None,
        };

        self.resolver.resolve(
            bot_id,
            message.author_id,
            &message.content,
            guild_prefixes.as_deref(),
        )
    }

    /// Whether the first word of `body` names a known command.
    pub async fn invokes_command(&self, body: &str) -> bool {
        let (name, _) = split_word(body);

        !name.is_empty() && self.commands.lookup(name).await.is_some()
    }

    /// Runs the command named by the first word of `body`. Unknown commands
    /// give `None`.
    pub async fn dispatch(&self, message: &IncomingMessage, body: &str) -> Option<Result<Reply>> {
        let (name, args) = split_word(body);
        if name.is_empty() {
            return None;
        }
        let command = self.commands.lookup(name).await?;

        if !self.is_owner(message.author_id) && !message.permissions.manage_messages {
            if let LockdownStatus::Locked { remaining } =
                self.lockdown.check(message.channel_id).await
            {
                debug!(channel = message.channel_id.0, name, "command blocked by lockdown");
                return Some(Ok(Reply::Direct(format!(
                    "Sorry, but the bot is on lockdown because some people were spamming it. \
                     Please wait {} seconds.",
                    remaining.as_secs().max(1)
                ))));
            }
        }

        debug!(author = message.author_id.0, name, "invoking command");
        let reply = match command {
            CommandKind::Static(text) => Ok(Reply::Text(text)),
            CommandKind::Builtin(command) => command.handle(self, message, args).await,
        };

        Some(reply)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        command_handler::AuthorPermissions,
        error::Error,
        prefix::{MatchedPrefix, PrefixEntry},
    };
    use serenity::model::id::{ChannelId, GuildId};
    use std::time::Duration;

    pub const BOT: UserId = UserId(1000);
    pub const OWNER: UserId = UserId(1);
    pub const MEMBER: UserId = UserId(2);
    pub const GUILD: GuildId = GuildId(42);
    pub const CHANNEL: ChannelId = ChannelId(10);

    pub async fn manager(
        dir: &tempfile::TempDir,
    ) -> (Manager, mpsc::UnboundedReceiver<Outgoing>) {
        let config = Config::from_lookup(|name| match name {
            "DISCORD_TOKEN" => Some("token".into()),
            "OWNER_ID" => Some(OWNER.0.to_string()),
            "SHELL_TIMEOUT_SECONDS" => Some("5".into()),
            _ => None,
        })
        .unwrap();
        let config = Config {
            prefix_file: dir.path().join("prefixes.json"),
            custom_commands_file: dir.path().join("custom_commands.json"),
            ..config
        };

        let (outbound, posted) = mpsc::unbounded_channel();
        let manager = Manager::with_config(config, outbound).await.unwrap();
        manager.set_bot_id(BOT);

        (manager, posted)
    }

    pub fn message(author_id: UserId, content: &str) -> IncomingMessage {
        IncomingMessage {
            content: content.to_string(),
            author_id,
            author_is_bot: false,
            channel_id: CHANNEL,
            guild_id: Some(GUILD),
            permissions: AuthorPermissions::default(),
        }
    }

    pub async fn run(manager: &Manager, message: &IncomingMessage) -> Option<Result<Reply>> {
        let invocation = manager.resolve(message).await?;
        manager.dispatch(message, invocation.body()).await
    }

    #[tokio::test]
    async fn only_known_names_count_as_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;

        let emoticon = manager.resolve(&message(MEMBER, "-_-")).await.unwrap();
        assert!(!manager.invokes_command(emoticon.body()).await);
        assert!(!manager.invokes_command("").await);

        assert!(manager.invokes_command("ping").await);
        assert!(manager.invokes_command("pong now").await);
        manager.commands().add_static("wave", "o/").await.unwrap();
        assert!(manager.invokes_command("wave").await);
    }

    #[tokio::test]
    async fn resolves_against_the_guilds_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;

        let hit = manager.resolve(&message(MEMBER, "-ping")).await.unwrap();
        assert_eq!(hit.prefix, MatchedPrefix::Entry(PrefixEntry::literal("-")));

        manager
            .prefixes()
            .add_prefix(GUILD, PrefixEntry::literal("bot "))
            .await
            .unwrap();
        let hit = manager.resolve(&message(MEMBER, "bot ping")).await.unwrap();
        assert_eq!(hit.body(), "ping");
    }

    #[tokio::test]
    async fn nothing_resolves_before_ready_or_for_bots() {
        let dir = tempfile::tempdir().unwrap();
        let (outbound, _posted) = mpsc::unbounded_channel();
        let config = Config {
            prefix_file: dir.path().join("prefixes.json"),
            custom_commands_file: dir.path().join("custom_commands.json"),
            ..Config::from_lookup(|name| (name == "DISCORD_TOKEN").then(|| "t".to_string()))
                .unwrap()
        };
        let manager = Manager::with_config(config, outbound).await.unwrap();
        assert_eq!(manager.resolve(&message(MEMBER, "-ping")).await, None);

        manager.set_bot_id(BOT);
        let mut from_bot = message(MEMBER, "-ping");
        from_bot.author_is_bot = true;
        assert_eq!(manager.resolve(&from_bot).await, None);
    }

    #[tokio::test]
    async fn direct_messages_use_fallback_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;
        let mut dm = message(MEMBER, "ping");
        dm.guild_id = None;

        assert_eq!(
            run(&manager, &dm).await.unwrap().unwrap(),
            Reply::Text("Pong! 🏓".into())
        );
    }

    #[tokio::test]
    async fn unknown_commands_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;

        assert!(run(&manager, &message(MEMBER, "-nope")).await.is_none());
        assert!(run(&manager, &message(MEMBER, "-")).await.is_none());
    }

    #[tokio::test]
    async fn static_commands_reply_with_their_text() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;
        manager.commands().add_static("wave", "o/").await.unwrap();

        assert_eq!(
            run(&manager, &message(MEMBER, "-wave")).await.unwrap().unwrap(),
            Reply::Text("o/".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn lockdown_blocks_members_but_not_moderators() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;
        manager.lockdown().toggle(CHANNEL).await;

        let blocked = run(&manager, &message(MEMBER, "-ping")).await.unwrap().unwrap();
        assert!(matches!(blocked, Reply::Direct(text) if text.contains("lockdown")));

        let mut moderator = message(MEMBER, "-ping");
        moderator.permissions.manage_messages = true;
        assert!(matches!(
            run(&manager, &moderator).await,
            Some(Ok(Reply::Text(_)))
        ));
        assert!(matches!(
            run(&manager, &message(OWNER, "-ping")).await,
            Some(Ok(Reply::Text(_)))
        ));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(matches!(
            run(&manager, &message(MEMBER, "-ping")).await,
            Some(Ok(Reply::Text(_)))
        ));
    }

    #[tokio::test]
    async fn user_errors_surface_from_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir).await;

        assert!(matches!(
            run(&manager, &message(MEMBER, "-prefix clear")).await,
            Some(Err(Error::Forbidden))
        ));
    }
}
