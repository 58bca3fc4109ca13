use shared::{
    domain::ThreadId,
    error::{BridgeError, ErrorCode},
    protocol::{OutgoingKind, OutgoingMedia, OutgoingMessage, ReplyTarget},
};
use voyager_client::routing::{
    payload::{
        File, MediaUploadType, MessageBody, RenderContent, RepliedMessageContent,
        SendMessageData, SendMessagePayload,
    },
    response::MediaMetadata,
};

use crate::error::BridgeResult;

pub fn upload_type(kind: OutgoingKind) -> Option<MediaUploadType> {
    match kind {
        OutgoingKind::Text => None,
        OutgoingKind::Image => Some(MediaUploadType::MessagingPhotoAttachment),
        OutgoingKind::Video | OutgoingKind::Audio | OutgoingKind::File => {
            Some(MediaUploadType::MessagingFileAttachment)
        }
    }
}

pub fn pending_upload(
    message: &OutgoingMessage,
) -> BridgeResult<Option<(MediaUploadType, &OutgoingMedia)>> {
    let Some(upload_type) = upload_type(message.kind) else {
        return Ok(None);
    };
    match &message.media {
        Some(media) => Ok(Some((upload_type, media))),
        None => Err(BridgeError::new(
            ErrorCode::Unsupported,
            format!("{:?} message without media", message.kind),
        )),
    }
}

pub fn reply_render_content(reply: &ReplyTarget) -> RenderContent {
    RenderContent {
        replied_message_content: Some(RepliedMessageContent {
            original_sender_urn: reply.sender_id.to_string(),
            original_send_at: reply.timestamp.timestamp_millis(),
            original_message_urn: reply.message_id.to_string(),
            message_body: MessageBody::plain(reply.body.clone().unwrap_or_default()),
        }),
        ..RenderContent::default()
    }
}

pub fn attachment_render_content(media: &OutgoingMedia, uploaded: &MediaMetadata) -> RenderContent {
    RenderContent {
        file: Some(File {
            asset_urn: uploaded.urn.clone(),
            byte_size: media.data.len() as u64,
            media_type: media.mime_type.clone(),
            name: media.file_name.clone(),
            url: String::new(),
        }),
        ..RenderContent::default()
    }
}

/// Builds the send call for `message`. A media body that only repeats the
/// file name is dropped rather than sent as a caption.
pub fn send_payload(
    message: &OutgoingMessage,
    attachment: Option<RenderContent>,
) -> SendMessagePayload {
    let mut render_content_unions = Vec::new();
    if let Some(reply) = &message.reply_to {
        render_content_unions.push(reply_render_content(reply));
    }
    let body = match (&message.media, &attachment) {
        (Some(media), Some(_)) if message.body == media.file_name => String::new(),
        _ => message.body.clone(),
    };
    render_content_unions.extend(attachment);

    SendMessagePayload {
        message: SendMessageData {
            body: MessageBody::plain(body),
            render_content_unions,
            conversation_urn: message.thread_id.to_string(),
            origin_token: String::new(),
        },
        dedupe_by_client_generated_token: false,
        ..SendMessagePayload::default()
    }
}

pub fn edit_body(text: &str) -> MessageBody {
    MessageBody::plain(text)
}

pub fn thread_urns(threads: &[ThreadId]) -> Vec<String> {
    threads.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
#[path = "tests/outbound_tests.rs"]
mod tests;
