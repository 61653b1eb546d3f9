//! Prefix matching for incoming messages.
//!
//! A guild configures an ordered list of [`PrefixEntry`]s. Literal entries
//! match when the message starts with their text; regex entries match from
//! the first character of the message and hand their first capture group
//! over as the command body.

use crate::error::{Error, Result};
use ahash::AHashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serenity::model::id::UserId;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredEntry", into = "StoredEntry")]
pub struct PrefixEntry {
    pub pattern: String,
    pub is_regex: bool,
}

// Prefix files hold `[pattern, is_regex]` pairs, older ones plain strings.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Tagged(String, bool),
    Plain(String),
}

impl From<StoredEntry> for PrefixEntry {
    fn from(stored: StoredEntry) -> Self {
        match stored {
            StoredEntry::Tagged(pattern, is_regex) => Self { pattern, is_regex },
            StoredEntry::Plain(pattern) => Self::literal(pattern),
        }
    }
}

impl From<PrefixEntry> for StoredEntry {
    fn from(entry: PrefixEntry) -> Self {
        StoredEntry::Tagged(entry.pattern, entry.is_regex)
    }
}

impl PrefixEntry {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: false,
        }
    }

    /// Builds a regex entry, checking that the pattern compiles and has a
    /// capture group for the command body.
    pub fn regex(pattern: impl Into<String>) -> Result<Self> {
        let entry = Self {
            pattern: pattern.into(),
            is_regex: true,
        };
        entry.validate()?;

        Ok(entry)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(Error::Validation("A prefix can't be empty.".into()));
        }

        if self.is_regex {
            let regex = Regex::new(&self.pattern)
                .map_err(|e| Error::Validation(format!("That isn't a valid regex: {}", e)))?;

            if regex.captures_len() < 2 {
                return Err(Error::Validation(
                    "A regex prefix needs a capture group for the command.".into(),
                ));
            }
        }

        Ok(())
    }

    /// Rejects prefixes that start with one of the bot's mention forms.
    pub fn reject_reserved(&self, bot_id: UserId) -> Result<()> {
        let reserved = mention_forms(bot_id);

        if reserved
            .iter()
            .any(|m| self.pattern.starts_with(m.trim_end()))
        {
            return Err(Error::Validation(
                "That is a reserved prefix already in use.".into(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for PrefixEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pattern.is_empty() {
            write!(f, "nothing (bare commands)")
        } else if self.is_regex {
            write!(f, "`{}` (regex)", self.pattern)
        } else {
            write!(f, "`{}`", self.pattern)
        }
    }
}

/// The two ways a user mention of the bot can be rendered, with the space
/// that follows them.
pub fn mention_forms(bot_id: UserId) -> [String; 2] {
    [format!("<@{}> ", bot_id.0), format!("<@!{}> ", bot_id.0)]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedPrefix {
    Entry(PrefixEntry),
    OwnerBypass,
}

/// A message that resolved to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub prefix: MatchedPrefix,
    body: String,
}

impl Invocation {
    fn new(prefix: MatchedPrefix, body: &str) -> Self {
        Self {
            prefix,
            body: body.trim_start().to_string(),
        }
    }

    /// Everything after the prefix.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn command_name(&self) -> Option<&str> {
        let (name, _) = split_word(&self.body);
        (!name.is_empty()).then(|| name)
    }

    pub fn args(&self) -> &str {
        split_word(&self.body).1
    }
}

/// Splits off the first whitespace-delimited word; the remainder has its
/// leading whitespace removed.
pub fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();

    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim_start()),
        None => (text, ""),
    }
}

pub struct PrefixResolver {
    owner_id: Option<UserId>,
    owner_bypass: bool,
    direct_message_prefixes: Vec<String>,
    // Compiled once per pattern; `None` marks patterns that are unusable.
    regexes: RwLock<AHashMap<String, Option<Regex>>>,
}

impl PrefixResolver {
    pub fn new(
        owner_id: Option<UserId>,
        owner_bypass: bool,
        direct_message_prefixes: Vec<String>,
    ) -> Self {
        Self {
            owner_id,
            owner_bypass,
            direct_message_prefixes,
            regexes: RwLock::default(),
        }
    }

    /// Candidate prefixes in the order they are tried. `guild_prefixes` is
    /// `None` for direct messages.
    pub fn candidates(
        &self,
        bot_id: UserId,
        guild_prefixes: Option<&[PrefixEntry]>,
    ) -> Vec<PrefixEntry> {
        let mut candidates = mention_forms(bot_id)
            .into_iter()
            .map(PrefixEntry::literal)
            .collect::<Vec<_>>();

        match guild_prefixes {
            Some(entries) => candidates.extend_from_slice(entries),
            None => candidates.extend(
                self.direct_message_prefixes
                    .iter()
                    .map(|p| PrefixEntry::literal(p.as_str())),
            ),
        }

        candidates
    }

    pub fn resolve(
        &self,
        bot_id: UserId,
        author_id: UserId,
        content: &str,
        guild_prefixes: Option<&[PrefixEntry]>,
    ) -> Option<Invocation> {
        if self.owner_bypass && self.owner_id == Some(author_id) {
            debug!(author = author_id.0, "owner bypassed prefix matching");
            return Some(Invocation::new(MatchedPrefix::OwnerBypass, content));
        }

        let candidates = self.candidates(bot_id, guild_prefixes);

        candidates
            .iter()
            .filter(|c| c.is_regex)
            .find_map(|c| {
                let regex = self.compiled(&c.pattern)?;
                match_regex(c, &regex, content)
            })
            .or_else(|| {
                candidates
                    .iter()
                    .filter(|c| !c.is_regex)
                    .find(|c| content.starts_with(c.pattern.as_str()))
                    .map(|c| {
                        Invocation::new(
                            MatchedPrefix::Entry(c.clone()),
                            &content[c.pattern.len()..],
                        )
                    })
            })
    }

    fn compiled(&self, pattern: &str) -> Option<Regex> {
        if let Some(regex) = self
            .regexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pattern)
        {
            return regex.clone();
        }

        let regex = match Regex::new(pattern) {
            Ok(regex) if regex.captures_len() >= 2 => Some(regex),
            Ok(_) => {
                warn!(pattern, "skipping regex prefix without a capture group");
                None
            }
            Err(e) => {
                warn!(pattern, error = %e, "skipping invalid regex prefix");
                None
            }
        };
        self.regexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern.to_string(), regex.clone());

        regex
    }
}

fn match_regex(entry: &PrefixEntry, regex: &Regex, content: &str) -> Option<Invocation> {
    let captures = regex.captures(content)?;
    // Only matches starting at the first character count.
    if captures.get(0)?.start() != 0 {
        return None;
    }
    let body = captures.get(1)?.as_str();
    // A capture of the whole message would make the message its own prefix.
    if body == content {
        return None;
    }

    Some(Invocation::new(MatchedPrefix::Entry(entry.clone()), body))
}
