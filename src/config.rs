use anyhow::{anyhow, Context as _};
use serenity::model::id::UserId;
use std::{path::PathBuf, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub owner_id: Option<UserId>,
    /// Lets the owner skip prefix matching entirely. Off unless asked for.
    pub owner_bypass: bool,
    pub default_prefix: String,
    pub max_prefixes: usize,
    pub prefix_file: PathBuf,
    pub custom_commands_file: PathBuf,
    pub lockdown_duration: Duration,
    pub shell_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let discord_token = lookup("DISCORD_TOKEN")
            .ok_or_else(|| anyhow!("Expected a token in the environment (DISCORD_TOKEN)"))?;

        Ok(Self {
            discord_token,
            owner_id: parse(&lookup, "OWNER_ID")?.map(UserId),
            owner_bypass: parse(&lookup, "OWNER_BYPASS")?.unwrap_or(false),
            default_prefix: lookup("DEFAULT_PREFIX").unwrap_or_else(|| "-".to_string()),
            max_prefixes: parse(&lookup, "MAX_PREFIXES")?.unwrap_or(40),
            prefix_file: lookup("PREFIX_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("prefixes.json")),
            custom_commands_file: lookup("CUSTOM_COMMANDS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("custom_commands.json")),
            lockdown_duration: Duration::from_secs(
                parse(&lookup, "LOCKDOWN_SECONDS")?.unwrap_or(60),
            ),
            shell_timeout: Duration::from_secs(
                parse(&lookup, "SHELL_TIMEOUT_SECONDS")?.unwrap_or(600),
            ),
        })
    }

    /// Prefixes accepted in direct messages, after the mention forms.
    pub fn direct_message_prefixes(&self) -> Vec<String> {
        vec![
            self.default_prefix.clone(),
            ";".to_string(),
            "tor ".to_string(),
            String::new(),
        ]
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("{} is not valid: {:?}", name, value))
        })
        .transpose()
}
