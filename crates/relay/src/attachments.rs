use crate::platform::Attachment;

/// What to do with a message's attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentPlan {
    /// Image shown inside the embed. With several images the last one wins.
    pub embed_image_url: Option<String>,
    /// Videos posted as separate plain messages, in attachment order.
    pub direct_sends: Vec<String>,
}

impl AttachmentPlan {
    pub fn has_image(&self) -> bool {
        self.embed_image_url.is_some()
    }
}

/// Split attachments into the embed image and direct video sends.
///
/// Attachments without a content type, or of any other type, are ignored.
pub fn classify(attachments: &[Attachment]) -> AttachmentPlan {
    let mut plan = AttachmentPlan::default();
    for attachment in attachments {
        let Some(content_type) = attachment.content_type.as_deref() else {
            continue;
        };
        if content_type.starts_with("image") {
            plan.embed_image_url = Some(attachment.url.clone());
        } else if content_type.starts_with("video") {
            plan.direct_sends.push(attachment.url.clone());
        }
    }
    plan
}
