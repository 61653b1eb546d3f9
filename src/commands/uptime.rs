use super::*;
use chrono::{Duration, Utc};

pub struct Uptime;

#[async_trait]
impl Command for Uptime {
    fn name(&self) -> &'static str {
        "uptime"
    }

    fn description(&self) -> &'static str {
        "How long the bot has been running"
    }

    async fn handle(
        &self,
        manager: &Manager,
        _message: &IncomingMessage,
        _args: &str,
    ) -> Result<Reply> {
        let elapsed = Utc::now() - manager.started_at();

        Ok(Reply::Text(format!("I've been up for {}.", humanize(elapsed))))
    }
}

fn humanize(elapsed: Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);
    let units = [
        ("day", seconds / 86_400),
        ("hour", seconds / 3_600 % 24),
        ("minute", seconds / 60 % 60),
        ("second", seconds % 60),
    ];

    let parts = units
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(unit, n)| format!("{} {}{}", n, unit, if *n == 1 { "" } else { "s" }))
        .collect::<Vec<_>>();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanized_durations() {
        assert_eq!(humanize(Duration::seconds(0)), "0 seconds");
        assert_eq!(humanize(Duration::seconds(61)), "1 minute, 1 second");
        assert_eq!(
            humanize(Duration::seconds(2 * 86_400 + 3 * 3_600 + 5)),
            "2 days, 3 hours, 5 seconds"
        );
    }
}
