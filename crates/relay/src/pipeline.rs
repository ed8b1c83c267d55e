//! Per-message relay decisions.
//!
//! Messages posted in the host channel are copied into the recipient channel
//! as author-attributed embeds. Replies in the recipient channel to one of
//! those copies are threaded back onto the original post.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::{
    Result,
    attachments::{self, AttachmentPlan},
    correlator::RelayCorrelator,
    ids::{ChannelId, MessageId},
    platform::{InboundMessage, RelayEmbed, RelayPlatform},
    settings::Settings,
};

/// Why a message produced no relay or reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    BotAuthor,
    Blacklisted,
    NotConfigured,
    UnrelatedChannel,
    NotAReply,
    /// The replied-to message was not posted by the relay.
    UnknownReply,
    /// The original post could not be fetched any more.
    OriginalUnavailable,
    /// No text and no image; videos may still have been sent.
    NothingToRelay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Relayed { destination_message_id: MessageId },
    Replied { original_message_id: MessageId },
    Skipped(Skip),
}

pub struct RelayPipeline {
    settings: Arc<Settings>,
    correlator: Mutex<RelayCorrelator>,
}

impl RelayPipeline {
    pub fn new(settings: Arc<Settings>, correlation_capacity: usize) -> Self {
        Self {
            settings,
            correlator: Mutex::new(RelayCorrelator::with_capacity(correlation_capacity)),
        }
    }

    /// Number of relayed messages currently remembered.
    pub fn correlated(&self) -> usize {
        self.correlator().len()
    }

    fn correlator(&self) -> std::sync::MutexGuard<'_, RelayCorrelator> {
        self.correlator.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle one message-create event.
    ///
    /// Lookup failures on the reply path count as "nothing to reply to";
    /// failures while sending the relay or reply embed are returned.
    pub async fn handle(
        &self,
        platform: &dyn RelayPlatform,
        message: &InboundMessage,
    ) -> Result<Outcome> {
        if message.author.bot {
            return Ok(Outcome::Skipped(Skip::BotAuthor));
        }
        if self.settings.is_blacklisted(&message.author.id) {
            debug!(user_id = %message.author.id, "ignoring blacklisted author");
            return Ok(Outcome::Skipped(Skip::Blacklisted));
        }
        let channels = self.settings.channels();
        let Some((source, destination)) = channels.complete() else {
            return Ok(Outcome::Skipped(Skip::NotConfigured));
        };

        if &message.channel_id == source {
            return self.relay(platform, message, destination).await;
        }
        if &message.channel_id == destination {
            return self.thread_reply(platform, message).await;
        }
        Ok(Outcome::Skipped(Skip::UnrelatedChannel))
    }

    async fn relay(
        &self,
        platform: &dyn RelayPlatform,
        message: &InboundMessage,
        destination: &ChannelId,
    ) -> Result<Outcome> {
        let member = platform
            .fetch_member(&message.guild_id, &message.author.id)
            .await?;
        let (author_name, author_icon_url) = match member {
            Some(member) => (member.display_name, member.avatar_url),
            None => (
                message.author.username.clone(),
                message.author.avatar_url.clone(),
            ),
        };
        let embed = RelayEmbed {
            author_name,
            author_icon_url,
            footer: format!("Posted in {}", message.guild_name),
            timestamp: message.created_at,
            ..Default::default()
        };
        let Some(embed) = prepare(platform, message, embed, destination).await else {
            return Ok(Outcome::Skipped(Skip::NothingToRelay));
        };

        let sent = platform.send_embed(destination, &embed).await?;
        self.correlator().record(
            sent.clone(),
            message.id.clone(),
            message.channel_id.clone(),
        );
        info!(
            original_message_id = %message.id,
            destination_message_id = %sent,
            channel_id = %destination,
            "message relayed"
        );
        Ok(Outcome::Relayed {
            destination_message_id: sent,
        })
    }

    async fn thread_reply(
        &self,
        platform: &dyn RelayPlatform,
        message: &InboundMessage,
    ) -> Result<Outcome> {
        let Some(replied_to) = &message.reply_to else {
            return Ok(Outcome::Skipped(Skip::NotAReply));
        };
        let Some(record) = self.correlator().resolve(replied_to).cloned() else {
            debug!(message_id = %replied_to, "reply target was not relayed");
            return Ok(Outcome::Skipped(Skip::UnknownReply));
        };

        match platform
            .message_exists(&record.original_channel_id, &record.original_message_id)
            .await
        {
            Ok(true) => {},
            Ok(false) => {
                debug!(message_id = %record.original_message_id, "original post is gone");
                return Ok(Outcome::Skipped(Skip::OriginalUnavailable));
            },
            Err(e) => {
                debug!(
                    message_id = %record.original_message_id,
                    error = %e,
                    "original post lookup failed"
                );
                return Ok(Outcome::Skipped(Skip::OriginalUnavailable));
            },
        }

        let embed = RelayEmbed {
            author_name: message.author.username.clone(),
            author_icon_url: message.author.avatar_url.clone(),
            footer: format!("Reply to your post in {}", message.guild_name),
            timestamp: message.created_at,
            ..Default::default()
        };
        let Some(embed) =
            prepare(platform, message, embed, &record.original_channel_id).await
        else {
            return Ok(Outcome::Skipped(Skip::NothingToRelay));
        };

        platform
            .reply_embed(
                &record.original_channel_id,
                &record.original_message_id,
                &embed,
            )
            .await?;
        info!(
            reply_message_id = %message.id,
            original_message_id = %record.original_message_id,
            channel_id = %record.original_channel_id,
            "reply threaded to original post"
        );
        Ok(Outcome::Replied {
            original_message_id: record.original_message_id,
        })
    }
}

/// Fill in text and image, post videos to `video_channel`, and return the
/// embed if it is worth sending.
async fn prepare(
    platform: &dyn RelayPlatform,
    message: &InboundMessage,
    mut embed: RelayEmbed,
    video_channel: &ChannelId,
) -> Option<RelayEmbed> {
    if message.has_text() {
        embed.description = Some(message.content.clone());
    }
    let AttachmentPlan {
        embed_image_url,
        direct_sends,
    } = attachments::classify(&message.attachments);
    embed.image_url = embed_image_url;

    for url in &direct_sends {
        if let Err(e) = platform.send_text(video_channel, url).await {
            warn!(channel_id = %video_channel, url, error = %e, "failed to forward video");
        }
    }

    if embed.description.is_none() && embed.image_url.is_none() {
        debug!(message_id = %message.id, "no text or image to relay");
        return None;
    }
    Some(embed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            ids::{GuildId, UserId},
            platform::{Attachment, Author},
            settings::ChannelSide,
            store::{self, ChannelPair, MemoryStore},
            test_support::{FakePlatform, Sent},
        },
    };

    const SOURCE: &str = "src";
    const DESTINATION: &str = "dst";

    fn settings(source: Option<&str>, destination: Option<&str>) -> Arc<Settings> {
        let settings = Arc::new(Settings::load(Arc::new(MemoryStore::new())));
        if let Some(id) = source {
            settings
                .set_channel(ChannelSide::Source, ChannelId::new(id))
                .unwrap();
        }
        if let Some(id) = destination {
            settings
                .set_channel(ChannelSide::Destination, ChannelId::new(id))
                .unwrap();
        }
        settings
    }

    fn pipeline() -> (Arc<Settings>, RelayPipeline) {
        let settings = settings(Some(SOURCE), Some(DESTINATION));
        let pipeline = RelayPipeline::new(Arc::clone(&settings), 100);
        (settings, pipeline)
    }

    fn message(id: &str, channel: &str, author: &str, content: &str) -> InboundMessage {
        let guild = if channel == SOURCE {
            "Host Guild"
        } else {
            "Recipient Guild"
        };
        InboundMessage {
            id: MessageId::new(id),
            channel_id: ChannelId::new(channel),
            guild_id: GuildId::new(if channel == SOURCE {
                "g-host"
            } else {
                "g-recipient"
            }),
            guild_name: guild.into(),
            author: Author {
                id: UserId::new(author),
                username: author.into(),
                avatar_url: Some(format!("https://cdn/user/{author}.png")),
                bot: false,
            },
            content: content.into(),
            attachments: Vec::new(),
            reply_to: None,
            created_at: 1_700_000_000,
        }
    }

    fn attach(mut msg: InboundMessage, url: &str, content_type: &str) -> InboundMessage {
        msg.attachments.push(Attachment {
            url: url.into(),
            content_type: Some(content_type.into()),
        });
        msg
    }

    fn reply(mut msg: InboundMessage, to: &MessageId) -> InboundMessage {
        msg.reply_to = Some(to.clone());
        msg
    }

    fn relayed_id(outcome: Outcome) -> MessageId {
        match outcome {
            Outcome::Relayed {
                destination_message_id,
            } => destination_message_id,
            other => panic!("expected relay, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_message_is_relayed_and_recorded_once() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new().with_member("g-host", "alice", &[]);

        let outcome = pipeline
            .handle(&platform, &message("m1", SOURCE, "alice", "hello"))
            .await
            .unwrap();
        let sent_id = relayed_id(outcome);

        assert_eq!(pipeline.correlated(), 1);
        let record = pipeline.correlator().resolve(&sent_id).cloned().unwrap();
        assert_eq!(record.original_message_id, MessageId::new("m1"));
        assert_eq!(record.original_channel_id, ChannelId::new(SOURCE));

        assert_eq!(platform.sent(), vec![Sent::Embed {
            channel: ChannelId::new(DESTINATION),
            embed: RelayEmbed {
                author_name: "alice-nick".into(),
                author_icon_url: Some("https://cdn/avatars/alice.png".into()),
                description: Some("hello".into()),
                image_url: None,
                footer: "Posted in Host Guild".into(),
                timestamp: 1_700_000_000,
            },
            id: sent_id,
        }]);
    }

    #[tokio::test]
    async fn non_member_author_falls_back_to_user_profile() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new();
        pipeline
            .handle(&platform, &message("m1", SOURCE, "bob", "hi"))
            .await
            .unwrap();
        let Sent::Embed { embed, .. } = &platform.sent()[0] else {
            panic!("expected an embed");
        };
        assert_eq!(embed.author_name, "bob");
        assert_eq!(
            embed.author_icon_url.as_deref(),
            Some("https://cdn/user/bob.png")
        );
    }

    #[tokio::test]
    async fn blacklisted_author_is_ignored() {
        let (settings, pipeline) = pipeline();
        settings.add_to_blacklist(UserId::new("u1")).unwrap();
        let platform = FakePlatform::new();

        let outcome = pipeline
            .handle(&platform, &message("m1", SOURCE, "u1", "hello"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped(Skip::Blacklisted));
        assert!(platform.sent().is_empty());
        assert_eq!(pipeline.correlated(), 0);
    }

    #[tokio::test]
    async fn bot_author_is_ignored() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new();
        let mut msg = message("m1", SOURCE, "bot", "beep");
        msg.author.bot = true;
        assert_eq!(
            pipeline.handle(&platform, &msg).await.unwrap(),
            Outcome::Skipped(Skip::BotAuthor)
        );
        assert!(platform.sent().is_empty());
    }

    #[tokio::test]
    async fn incomplete_channel_pair_does_nothing() {
        let pipeline = RelayPipeline::new(settings(None, Some(DESTINATION)), 100);
        let platform = FakePlatform::new();
        for channel in [SOURCE, DESTINATION, "elsewhere"] {
            let outcome = pipeline
                .handle(&platform, &message("m1", channel, "alice", "hello"))
                .await
                .unwrap();
            assert_eq!(outcome, Outcome::Skipped(Skip::NotConfigured));
        }
        assert!(platform.sent().is_empty());
    }

    #[tokio::test]
    async fn unrelated_channel_is_ignored() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new();
        let outcome = pipeline
            .handle(&platform, &message("m1", "elsewhere", "alice", "hello"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped(Skip::UnrelatedChannel));
    }

    #[tokio::test]
    async fn image_only_message_is_relayed_with_last_image() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new();
        let msg = message("m1", SOURCE, "alice", "   ");
        let msg = attach(msg, "https://cdn/a.png", "image/png");
        let msg = attach(msg, "https://cdn/b.png", "image/png");

        relayed_id(pipeline.handle(&platform, &msg).await.unwrap());
        let Sent::Embed { embed, .. } = &platform.sent()[0] else {
            panic!("expected an embed");
        };
        assert_eq!(embed.description, None);
        assert_eq!(embed.image_url.as_deref(), Some("https://cdn/b.png"));
    }

    #[tokio::test]
    async fn video_only_message_forwards_video_without_embed() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new();
        let msg = attach(
            message("m1", SOURCE, "alice", ""),
            "https://cdn/clip.mp4",
            "video/mp4",
        );

        let outcome = pipeline.handle(&platform, &msg).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped(Skip::NothingToRelay));
        assert_eq!(platform.sent(), vec![Sent::Text {
            channel: ChannelId::new(DESTINATION),
            content: "https://cdn/clip.mp4".into(),
        }]);
        assert_eq!(pipeline.correlated(), 0);
    }

    #[tokio::test]
    async fn unsupported_attachment_only_is_dropped() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new();
        let msg = attach(
            message("m1", SOURCE, "alice", ""),
            "https://cdn/doc.pdf",
            "application/pdf",
        );
        assert_eq!(
            pipeline.handle(&platform, &msg).await.unwrap(),
            Outcome::Skipped(Skip::NothingToRelay)
        );
        assert!(platform.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_relay_send_is_returned_and_not_recorded() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new().with_failing_sends();
        let result = pipeline
            .handle(&platform, &message("m1", SOURCE, "alice", "hello"))
            .await;
        assert!(result.is_err());
        assert_eq!(pipeline.correlated(), 0);
    }

    #[tokio::test]
    async fn reply_to_relayed_message_threads_back() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new().with_message(SOURCE, "m1");

        let relayed = relayed_id(
            pipeline
                .handle(&platform, &message("m1", SOURCE, "alice", "question?"))
                .await
                .unwrap(),
        );

        let answer = attach(
            reply(message("r1", DESTINATION, "bob", "answer"), &relayed),
            "https://cdn/proof.mp4",
            "video/mp4",
        );
        let outcome = pipeline.handle(&platform, &answer).await.unwrap();
        assert_eq!(outcome, Outcome::Replied {
            original_message_id: MessageId::new("m1"),
        });

        let sent = platform.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1], Sent::Text {
            channel: ChannelId::new(SOURCE),
            content: "https://cdn/proof.mp4".into(),
        });
        assert_eq!(sent[2], Sent::Reply {
            channel: ChannelId::new(SOURCE),
            message: MessageId::new("m1"),
            embed: RelayEmbed {
                author_name: "bob".into(),
                author_icon_url: Some("https://cdn/user/bob.png".into()),
                description: Some("answer".into()),
                image_url: None,
                footer: "Reply to your post in Recipient Guild".into(),
                timestamp: 1_700_000_000,
            },
        });
    }

    /// Pipeline that already relayed `m1` from the host channel as `d1`.
    fn pipeline_with_relayed_m1() -> RelayPipeline {
        let (_settings, pipeline) = pipeline();
        pipeline.correlator().record(
            MessageId::new("d1"),
            MessageId::new("m1"),
            ChannelId::new(SOURCE),
        );
        pipeline
    }

    #[tokio::test]
    async fn image_only_reply_is_threaded_without_description() {
        let pipeline = pipeline_with_relayed_m1();
        let platform = FakePlatform::new().with_message(SOURCE, "m1");
        let answer = attach(
            reply(message("r1", DESTINATION, "bob", ""), &MessageId::new("d1")),
            "https://cdn/screenshot.png",
            "image/png",
        );

        let outcome = pipeline.handle(&platform, &answer).await.unwrap();
        assert_eq!(outcome, Outcome::Replied {
            original_message_id: MessageId::new("m1"),
        });
        let sent = platform.sent();
        assert_eq!(sent.len(), 1);
        let Sent::Reply { embed, message, .. } = &sent[0] else {
            panic!("expected a threaded reply, got {:?}", sent[0]);
        };
        assert_eq!(message, &MessageId::new("m1"));
        assert_eq!(embed.description, None);
        assert_eq!(
            embed.image_url.as_deref(),
            Some("https://cdn/screenshot.png")
        );
    }

    #[tokio::test]
    async fn empty_reply_sends_nothing() {
        let pipeline = pipeline_with_relayed_m1();
        let platform = FakePlatform::new().with_message(SOURCE, "m1");
        let answer = reply(message("r1", DESTINATION, "bob", "  "), &MessageId::new("d1"));

        let outcome = pipeline.handle(&platform, &answer).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped(Skip::NothingToRelay));
        assert!(platform.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_reply_send_is_returned() {
        let pipeline = pipeline_with_relayed_m1();
        let platform = FakePlatform::new()
            .with_message(SOURCE, "m1")
            .with_failing_sends();
        let answer = reply(
            message("r1", DESTINATION, "bob", "answer"),
            &MessageId::new("d1"),
        );

        assert!(pipeline.handle(&platform, &answer).await.is_err());
        assert!(platform.sent().is_empty());
        // The record stays resolvable for a later reply.
        assert_eq!(pipeline.correlated(), 1);
    }

    #[tokio::test]
    async fn reply_to_unrelayed_message_does_nothing() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new();
        let msg = reply(
            message("r1", DESTINATION, "bob", "answer"),
            &MessageId::new("someone-elses"),
        );
        let outcome = pipeline.handle(&platform, &msg).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped(Skip::UnknownReply));
        assert!(platform.sent().is_empty());
    }

    #[tokio::test]
    async fn plain_message_in_destination_is_not_a_reply() {
        let (_settings, pipeline) = pipeline();
        let platform = FakePlatform::new();
        let outcome = pipeline
            .handle(&platform, &message("r1", DESTINATION, "bob", "chatter"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped(Skip::NotAReply));
    }

    #[tokio::test]
    async fn missing_or_unreadable_original_is_skipped() {
        let (_settings, pipeline) = pipeline();
        let relay_platform = FakePlatform::new();
        let relayed = relayed_id(
            pipeline
                .handle(&relay_platform, &message("m1", SOURCE, "alice", "hi"))
                .await
                .unwrap(),
        );
        let answer = reply(message("r1", DESTINATION, "bob", "yo"), &relayed);

        // Original deleted.
        let gone = FakePlatform::new();
        assert_eq!(
            pipeline.handle(&gone, &answer).await.unwrap(),
            Outcome::Skipped(Skip::OriginalUnavailable)
        );
        assert!(gone.sent().is_empty());

        // Lookup itself fails.
        let broken = FakePlatform::new().with_failing_message_lookups();
        assert_eq!(
            pipeline.handle(&broken, &answer).await.unwrap(),
            Outcome::Skipped(Skip::OriginalUnavailable)
        );
        assert!(broken.sent().is_empty());
    }

    #[tokio::test]
    async fn same_channel_configuration_only_relays() {
        // A pair like this can only come from a hand-edited file.
        let memory = MemoryStore::new();
        store::save(&memory, &ChannelPair {
            source_channel: Some(ChannelId::new(SOURCE)),
            destination_channel: Some(ChannelId::new(SOURCE)),
        })
        .unwrap();
        let settings = Arc::new(Settings::load(Arc::new(memory)));
        let pipeline = RelayPipeline::new(settings, 100);
        let platform = FakePlatform::new();
        let msg = reply(
            message("m2", SOURCE, "alice", "hello"),
            &MessageId::new("whatever"),
        );
        relayed_id(pipeline.handle(&platform, &msg).await.unwrap());
        assert_eq!(platform.sent().len(), 1);
    }
}
