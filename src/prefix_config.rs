use crate::{
    db::FlatStore,
    error::{Error, Result},
    prefix::PrefixEntry,
};
use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Per-guild prefix lists, persisted in a [`FlatStore`] keyed by guild ID.
pub struct GuildPrefixes {
    store: Arc<FlatStore>,
    default_prefix: String,
    max_prefixes: usize,
    edit: Mutex<()>,
}

impl GuildPrefixes {
    pub fn new(store: Arc<FlatStore>, default_prefix: String, max_prefixes: usize) -> Self {
        Self {
            store,
            default_prefix,
            max_prefixes,
            edit: Mutex::new(()),
        }
    }

    pub fn default_entries(&self) -> Vec<PrefixEntry> {
        vec![PrefixEntry::literal(self.default_prefix.as_str())]
    }

    pub fn max_prefixes(&self) -> usize {
        self.max_prefixes
    }

    pub async fn prefixes(&self, guild_id: GuildId) -> Vec<PrefixEntry> {
        self.store
            .get(&key(guild_id))
            .await
            .unwrap_or_else(|| self.default_entries())
    }

    pub async fn add_prefix(&self, guild_id: GuildId, entry: PrefixEntry) -> Result<()> {
        entry.validate()?;

        let _guard = self.edit.lock().await;
        let mut entries = self.prefixes(guild_id).await;

        if entries.len() >= self.max_prefixes {
            return Err(Error::Configuration(format!(
                "A server can't have more than {} custom prefixes.",
                self.max_prefixes
            )));
        }

        // Keeps "ab" ahead of "a" without reshuffling what is already there.
        // A repeated pattern lands ahead of its twin, so removing it again
        // takes out the new copy.
        let position = entries
            .iter()
            .position(|e| e.pattern <= entry.pattern)
            .unwrap_or(entries.len());
        info!(guild = guild_id.0, prefix = %entry.pattern, regex = entry.is_regex, "adding prefix");
        entries.insert(position, entry);

        self.store.put(key(guild_id), &entries).await
    }

    /// Removes the first entry with this text, whether or not it is a regex.
    pub async fn remove_prefix(&self, guild_id: GuildId, pattern: &str) -> Result<()> {
        let _guard = self.edit.lock().await;
        let mut entries = self.prefixes(guild_id).await;

        let position = entries
            .iter()
            .position(|e| e.pattern == pattern)
            .ok_or_else(|| Error::NotFound("That's not one of my prefixes, sorry!".into()))?;
        info!(guild = guild_id.0, prefix = pattern, "removing prefix");
        entries.remove(position);

        self.store.put(key(guild_id), &entries).await
    }

    pub async fn clear_prefixes(&self, guild_id: GuildId) -> Result<()> {
        let _guard = self.edit.lock().await;
        info!(guild = guild_id.0, "clearing prefixes");

        self.store.put(key(guild_id), &Vec::<PrefixEntry>::new()).await
    }

    pub async fn reset_prefixes(&self, guild_id: GuildId) -> Result<()> {
        let _guard = self.edit.lock().await;
        info!(guild = guild_id.0, "resetting prefixes");

        self.store.put(key(guild_id), &self.default_entries()).await
    }
}

fn key(guild_id: GuildId) -> String {
    guild_id.0.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(42);

    async fn prefixes(dir: &tempfile::TempDir, max: usize) -> GuildPrefixes {
        let store = FlatStore::open(dir.path().join("prefixes.json"))
            .await
            .unwrap();
        GuildPrefixes::new(Arc::new(store), "-".into(), max)
    }

    #[tokio::test]
    async fn unconfigured_guild_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = prefixes(&dir, 40).await;

        assert_eq!(config.prefixes(GUILD).await, vec![PrefixEntry::literal("-")]);
    }

    #[tokio::test]
    async fn add_then_remove_restores_previous_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = prefixes(&dir, 40).await;
        config.add_prefix(GUILD, PrefixEntry::literal("!")).await.unwrap();
        let before = config.prefixes(GUILD).await;

        config.add_prefix(GUILD, PrefixEntry::literal("bot ")).await.unwrap();
        assert_ne!(config.prefixes(GUILD).await, before);

        config.remove_prefix(GUILD, "bot ").await.unwrap();
        assert_eq!(config.prefixes(GUILD).await, before);
    }

    #[tokio::test]
    async fn longer_overlapping_prefixes_go_first() {
        let dir = tempfile::tempdir().unwrap();
        let config = prefixes(&dir, 40).await;
        config.clear_prefixes(GUILD).await.unwrap();

        config.add_prefix(GUILD, PrefixEntry::literal("a")).await.unwrap();
        config.add_prefix(GUILD, PrefixEntry::literal("ab")).await.unwrap();

        let patterns = config
            .prefixes(GUILD)
            .await
            .into_iter()
            .map(|e| e.pattern)
            .collect::<Vec<_>>();
        assert_eq!(patterns, vec!["ab", "a"]);
    }

    #[tokio::test]
    async fn add_beyond_limit_leaves_list_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config = prefixes(&dir, 2).await;
        config.add_prefix(GUILD, PrefixEntry::literal("!")).await.unwrap();
        let before = config.prefixes(GUILD).await;
        assert_eq!(before.len(), 2);

        let result = config.add_prefix(GUILD, PrefixEntry::literal("?")).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert_eq!(config.prefixes(GUILD).await, before);
    }

    #[tokio::test]
    async fn adding_an_existing_prefix_then_removing_it_restores_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = prefixes(&dir, 40).await;
        let before = config.prefixes(GUILD).await;

        config.add_prefix(GUILD, PrefixEntry::literal("-")).await.unwrap();
        assert_eq!(
            config.prefixes(GUILD).await,
            vec![PrefixEntry::literal("-"), PrefixEntry::literal("-")]
        );
        config.remove_prefix(GUILD, "-").await.unwrap();
        assert_eq!(config.prefixes(GUILD).await, before);

        // Same text, different kind.
        config
            .add_prefix(GUILD, PrefixEntry::regex("-(.+)").unwrap())
            .await
            .unwrap();
        config.add_prefix(GUILD, PrefixEntry::literal("-(.+)")).await.unwrap();
        let before = config.prefixes(GUILD).await;
        config
            .add_prefix(GUILD, PrefixEntry::regex("-(.+)").unwrap())
            .await
            .unwrap();
        config.remove_prefix(GUILD, "-(.+)").await.unwrap();
        assert_eq!(config.prefixes(GUILD).await, before);
    }

    #[tokio::test]
    async fn concurrent_adds_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(prefixes(&dir, 40).await);

        let tasks = (0..16)
            .map(|i| {
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    config
                        .add_prefix(GUILD, PrefixEntry::literal(format!("p{:02}", i)))
                        .await
                })
            })
            .collect::<Vec<_>>();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut expected = (0..16).map(|i| format!("p{:02}", i)).collect::<Vec<_>>();
        expected.push("-".to_string());
        expected.sort();

        let patterns = |entries: Vec<PrefixEntry>| {
            let mut patterns = entries.into_iter().map(|e| e.pattern).collect::<Vec<_>>();
            patterns.sort();
            patterns
        };
        assert_eq!(patterns(config.prefixes(GUILD).await), expected);

        let reloaded = prefixes(&dir, 40).await;
        assert_eq!(patterns(reloaded.prefixes(GUILD).await), expected);
    }

    #[tokio::test]
    async fn invalid_entries_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = prefixes(&dir, 40).await;

        let no_group = PrefixEntry {
            pattern: "hello".into(),
            is_regex: true,
        };
        assert!(matches!(
            config.add_prefix(GUILD, no_group).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            config.add_prefix(GUILD, PrefixEntry::literal("")).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(config.prefixes(GUILD).await, vec![PrefixEntry::literal("-")]);
    }

    #[tokio::test]
    async fn remove_ignores_regex_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = prefixes(&dir, 40).await;
        config
            .add_prefix(GUILD, PrefixEntry::regex(r"yo (.+)").unwrap())
            .await
            .unwrap();

        config.remove_prefix(GUILD, r"yo (.+)").await.unwrap();
        assert_eq!(config.prefixes(GUILD).await, vec![PrefixEntry::literal("-")]);

        assert!(matches!(
            config.remove_prefix(GUILD, "nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn clear_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let config = prefixes(&dir, 40).await;

        config.clear_prefixes(GUILD).await.unwrap();
        assert!(config.prefixes(GUILD).await.is_empty());

        config.reset_prefixes(GUILD).await.unwrap();
        assert_eq!(config.prefixes(GUILD).await, vec![PrefixEntry::literal("-")]);
    }

    #[tokio::test]
    async fn changes_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        prefixes(&dir, 40)
            .await
            .add_prefix(GUILD, PrefixEntry::literal("!"))
            .await
            .unwrap();

        let reloaded = prefixes(&dir, 40).await;
        assert_eq!(
            reloaded.prefixes(GUILD).await,
            vec![PrefixEntry::literal("-"), PrefixEntry::literal("!")]
        );
    }
}
