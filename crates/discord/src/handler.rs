//! Discord event handler for serenity.
//!
//! Translates gateway events into relay-core calls.

use std::sync::Arc;

use {
    serenity::{
        all::{
            Command as ApplicationCommand, CommandInteraction, Context, CreateInteractionResponse,
            CreateInteractionResponseMessage, EventHandler, GatewayIntents, Interaction, Message,
            Ready,
        },
        async_trait,
    },
    tracing::{debug, error, info, warn},
};

use crosspost_relay::{
    CommandReply, CommandRouter, RelayPipeline,
    ids::{ChannelId, GuildId, MessageId, UserId},
    platform::{Attachment, Author, InboundMessage},
};

use crate::{commands, outbound::DiscordPlatform};

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    pub router: Arc<CommandRouter>,
    pub pipeline: Arc<RelayPipeline>,
    pub register_commands: bool,
}

impl DiscordHandler {
    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_MEMBERS
    }

    async fn run_command(&self, ctx: &Context, interaction: &CommandInteraction) -> CommandReply {
        let Some(command) = commands::parse(&interaction.data) else {
            warn!(command = %interaction.data.name, "unrecognised slash command");
            return CommandReply::ephemeral("Unknown command.");
        };
        let platform = DiscordPlatform::from_context(ctx);
        let actor = UserId::new(interaction.user.id.to_string());
        match self.router.dispatch(&platform, &actor, command).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    command = %interaction.data.name,
                    user = %actor,
                    error = %e,
                    "slash command failed"
                );
                CommandReply::ephemeral("Something went wrong while running that command.")
            },
        }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        if !self.register_commands {
            return;
        }
        match ApplicationCommand::set_global_commands(&ctx.http, commands::definitions()).await {
            Ok(registered) => info!(count = registered.len(), "registered slash commands"),
            Err(e) => error!(error = %e, "failed to register slash commands"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        debug!(command = %command.data.name, user = %command.user.id, "slash command");

        let reply = self.run_command(&ctx, &command).await;
        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(reply.content)
                .ephemeral(reply.ephemeral),
        );
        if let Err(e) = command.create_response(&ctx.http, response).await {
            warn!(command = %command.data.name, error = %e, "failed to answer interaction");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(inbound) = inbound_message(&ctx, &msg) else {
            return;
        };
        let platform = DiscordPlatform::from_context(&ctx);
        match self.pipeline.handle(&platform, &inbound).await {
            Ok(outcome) => debug!(message = %inbound.id, ?outcome, "message handled"),
            Err(e) => warn!(
                message = %inbound.id,
                channel = %inbound.channel_id,
                error = %e,
                "failed to relay message"
            ),
        }
    }
}

fn inbound_message(ctx: &Context, msg: &Message) -> Option<InboundMessage> {
    let guild_id = msg.guild_id?;
    let guild_name = ctx
        .cache
        .guild(guild_id)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| guild_id.to_string());
    to_inbound(msg, guild_name)
}

/// Direct messages carry no guild and never take part in the relay.
fn to_inbound(msg: &Message, guild_name: String) -> Option<InboundMessage> {
    let guild_id = msg.guild_id?;
    Some(InboundMessage {
        id: MessageId::new(msg.id.to_string()),
        channel_id: ChannelId::new(msg.channel_id.to_string()),
        guild_id: GuildId::new(guild_id.to_string()),
        guild_name,
        author: Author {
            id: UserId::new(msg.author.id.to_string()),
            username: msg.author.name.clone(),
            avatar_url: Some(msg.author.face()),
            bot: msg.author.bot,
        },
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                url: a.url.clone(),
                content_type: a.content_type.clone(),
            })
            .collect(),
        reply_to: msg
            .message_reference
            .as_ref()
            .and_then(|r| r.message_id)
            .map(|id| MessageId::new(id.to_string())),
        created_at: msg.timestamp.unix_timestamp(),
    })
}
