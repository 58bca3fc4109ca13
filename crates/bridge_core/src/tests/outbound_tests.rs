use super::*;

use chrono::{TimeZone, Utc};
use shared::domain::{MessageId, UserId};

const THREAD: &str = "urn:li:msg_conversation:(urn:li:fsd_profile:ACoAAme,2-abc)";

fn outgoing(kind: OutgoingKind, body: &str) -> OutgoingMessage {
    OutgoingMessage {
        thread_id: ThreadId::new(THREAD),
        kind,
        body: body.to_string(),
        media: None,
        reply_to: None,
    }
}

fn png() -> OutgoingMedia {
    OutgoingMedia {
        file_name: "cat.png".into(),
        mime_type: "image/png".into(),
        data: vec![0_u8; 64],
    }
}

fn uploaded() -> MediaMetadata {
    MediaMetadata {
        urn: "urn:li:digitalmediaAsset:cat".into(),
        ..MediaMetadata::default()
    }
}

#[test]
fn upload_class_follows_declared_kind() {
    assert_eq!(upload_type(OutgoingKind::Text), None);
    assert_eq!(
        upload_type(OutgoingKind::Image),
        Some(MediaUploadType::MessagingPhotoAttachment)
    );
    for kind in [OutgoingKind::Video, OutgoingKind::Audio, OutgoingKind::File] {
        assert_eq!(
            upload_type(kind),
            Some(MediaUploadType::MessagingFileAttachment)
        );
    }
}

#[test]
fn media_kinds_require_media() {
    let err = pending_upload(&outgoing(OutgoingKind::Image, "cat.png")).expect_err("no media");
    assert_eq!(err.code, ErrorCode::Unsupported);

    assert!(pending_upload(&outgoing(OutgoingKind::Text, "hi"))
        .expect("text")
        .is_none());

    let mut with_media = outgoing(OutgoingKind::File, "");
    with_media.media = Some(png());
    let (class, media) = pending_upload(&with_media)
        .expect("file")
        .expect("upload");
    assert_eq!(class, MediaUploadType::MessagingFileAttachment);
    assert_eq!(media.file_name, "cat.png");
}

#[test]
fn reply_adds_exactly_one_reference() {
    let mut message = outgoing(OutgoingKind::Text, "agreed");
    message.reply_to = Some(ReplyTarget {
        message_id: MessageId::new("urn:li:msg_message:1"),
        sender_id: UserId::new("urn:li:fsd_profile:ACoAAalice"),
        timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        body: Some("lunch?".into()),
    });

    let payload = send_payload(&message, None);

    assert_eq!(payload.message.body.text, "agreed");
    assert_eq!(payload.message.conversation_urn, THREAD);
    assert_eq!(payload.message.render_content_unions.len(), 1);
    let reply = payload.message.render_content_unions[0]
        .replied_message_content
        .as_ref()
        .expect("reply entry");
    assert_eq!(reply.original_message_urn, "urn:li:msg_message:1");
    assert_eq!(reply.original_sender_urn, "urn:li:fsd_profile:ACoAAalice");
    assert_eq!(reply.original_send_at, 1_700_000_000_000);
    assert_eq!(reply.message_body.text, "lunch?");
}

#[test]
fn attachment_drops_filename_body() {
    let mut message = outgoing(OutgoingKind::Image, "cat.png");
    message.media = Some(png());
    let media = png();

    let payload = send_payload(&message, Some(attachment_render_content(&media, &uploaded())));

    assert_eq!(payload.message.body.text, "");
    let file = payload.message.render_content_unions[0]
        .file
        .as_ref()
        .expect("file entry");
    assert_eq!(file.asset_urn, "urn:li:digitalmediaAsset:cat");
    assert_eq!(file.byte_size, 64);
    assert_eq!(file.media_type, "image/png");
    assert_eq!(file.name, "cat.png");
}

#[test]
fn attachment_keeps_a_real_caption() {
    let mut message = outgoing(OutgoingKind::Image, "look at my cat");
    message.media = Some(png());

    let payload = send_payload(&message, Some(attachment_render_content(&png(), &uploaded())));

    assert_eq!(payload.message.body.text, "look at my cat");
    let json = serde_json::to_value(&payload).expect("payload json");
    assert!(json["message"]["renderContentUnions"][0]["file"].is_object());
}

#[test]
fn thread_urns_preserve_order() {
    let threads = [ThreadId::new("urn:a"), ThreadId::new("urn:b")];
    assert_eq!(thread_urns(&threads), ["urn:a", "urn:b"]);
    assert_eq!(edit_body("new").text, "new");
}
