use crate::{
    command_handler::{AuthorPermissions, IncomingMessage, Reply},
    manager::Manager,
    session::Outgoing,
};
use serenity::{
    async_trait,
    http::Http,
    model::{channel::Message, gateway::Ready},
    prelude::*,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const MESSAGE_LIMIT: usize = 2000;

pub struct Handler {
    manager: Manager,
}

impl Handler {
    pub fn new(manager: Manager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        let mut incoming = IncomingMessage {
            content: msg.content.clone(),
            author_id: msg.author.id,
            author_is_bot: msg.author.bot,
            channel_id: msg.channel_id,
            guild_id: msg.guild_id,
            permissions: AuthorPermissions::default(),
        };

        if self.manager.forward_to_session(&incoming).await {
            return;
        }

        let invocation = match self.manager.resolve(&incoming).await {
            Some(invocation) => invocation,
            None => return,
        };
        if !self.manager.invokes_command(invocation.body()).await {
            return;
        }
        // Only looked up once we know a command is being run.
        incoming.permissions = author_permissions(&ctx, &msg).await;

        let outcome = match self.manager.dispatch(&incoming, invocation.body()).await {
            Some(outcome) => outcome,
            None => return,
        };

        let sent = match outcome {
            Ok(Reply::Text(text)) => msg.channel_id.say(&ctx.http, fit_message(text)).await,
            Ok(Reply::React) => match msg.react(&ctx, '👌').await {
                Ok(_) => return,
                // Probably no permission to react.
                Err(_) => msg.channel_id.say(&ctx.http, "👌").await,
            },
            Ok(Reply::Direct(text)) => {
                msg.author
                    .direct_message(&ctx, |m| m.content(fit_message(text)))
                    .await
            }
            Ok(Reply::Silent) => return,
            Err(e) if e.is_user_facing() => {
                let _ = msg.react(&ctx, '🚫').await;
                msg.channel_id.say(&ctx.http, e.to_string()).await
            }
            Err(e) => {
                error!(error = %e, body = invocation.body(), "command failed");
                msg.channel_id
                    .say(
                        &ctx.http,
                        "Something went wrong, and that change might not have been saved.",
                    )
                    .await
            }
        };

        if let Err(why) = sent {
            warn!(error = %why, "cannot respond to command");
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, id = ready.user.id.0, "connected");

        self.manager.set_bot_id(ready.user.id);
    }
}

async fn author_permissions(ctx: &Context, msg: &Message) -> AuthorPermissions {
    if msg.guild_id.is_none() {
        return AuthorPermissions::default();
    }

    let member = match msg.member(ctx).await {
        Ok(member) => member,
        Err(why) => {
            warn!(error = %why, author = msg.author.id.0, "cannot fetch member");
            return AuthorPermissions::default();
        }
    };

    match member.permissions(ctx).await {
        Ok(permissions) => AuthorPermissions {
            manage_messages: permissions.manage_messages(),
            manage_guild: permissions.manage_guild(),
        },
        Err(why) => {
            warn!(error = %why, author = msg.author.id.0, "cannot compute permissions");
            AuthorPermissions::default()
        }
    }
}

/// Posts messages produced outside of a command reply, e.g. shell output.
pub async fn posting_thread(http: Arc<Http>, mut outbound: mpsc::UnboundedReceiver<Outgoing>) {
    while let Some(Outgoing {
        channel_id,
        content,
    }) = outbound.recv().await
    {
        if let Err(why) = channel_id.say(&http, fit_message(content)).await {
            warn!(error = %why, channel = channel_id.0, "cannot post message");
        }
    }
}

fn fit_message(mut text: String) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text;
    }

    let cut = text
        .char_indices()
        .nth(MESSAGE_LIMIT - 1)
        .map_or(text.len(), |(i, _)| i);
    text.truncate(cut);
    text.push('…');

    text
}
