use super::*;

use serde_json::json;

use crate::test_support::{spawn_mock, test_client, MockResponse};

#[tokio::test]
async fn oversized_upload_is_rejected_before_any_request() {
    let server = spawn_mock(|_, _| MockResponse::status(200)).await;
    let client = test_client(&server.url);

    let err = client
        .upload_media(
            MediaUploadType::MessagingFileAttachment,
            "big.bin",
            vec![0; MAX_UPLOAD_BYTES + 1],
            "application/octet-stream",
        )
        .await
        .expect_err("too large");

    assert!(matches!(
        err,
        VoyagerError::MediaTooLarge { size, limit } if size == MAX_UPLOAD_BYTES + 1 && limit == MAX_UPLOAD_BYTES
    ));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn upload_requests_a_slot_then_puts_the_bytes() {
    let server = spawn_mock(|request, index| match index {
        0 => {
            let host = request.header("host").unwrap_or_default();
            MockResponse::json(json!({
                "data": {
                    "value": {
                        "urn": "urn:li:digitalmediaAsset:D4E",
                        "singleUploadUrl": format!("http://{host}/dms-uploads/D4E"),
                    }
                }
            }))
        }
        _ => MockResponse::status(201),
    })
    .await;
    let client = test_client(&server.url);

    let metadata = client
        .upload_media(
            MediaUploadType::MessagingPhotoAttachment,
            "cat.png",
            b"png-bytes".to_vec(),
            "image/png",
        )
        .await
        .expect("upload");

    assert_eq!(metadata.urn, "urn:li:digitalmediaAsset:D4E");
    let requests = server.requests();
    assert_eq!(requests.len(), 2);

    let slot = &requests[0];
    assert_eq!(slot.path, "/voyager/api/voyagerVideoDashMediaUploadMetadata");
    assert_eq!(slot.query.as_deref(), Some("action=upload"));
    assert_eq!(
        slot.json(),
        json!({
            "mediaUploadType": "MESSAGING_PHOTO_ATTACHMENT",
            "fileSize": 9,
            "filename": "cat.png"
        })
    );

    let put = &requests[1];
    assert_eq!(put.method, reqwest::Method::PUT);
    assert_eq!(put.path, "/dms-uploads/D4E");
    assert_eq!(put.header("content-type"), Some("image/png"));
    assert_eq!(put.header("csrf-token"), Some("ajax:csrf123"));
    assert_eq!(put.body, b"png-bytes");
}

#[tokio::test]
async fn rejected_upload_put_is_an_action_failure() {
    let server = spawn_mock(|request, index| match index {
        0 => {
            let host = request.header("host").unwrap_or_default();
            MockResponse::json(json!({
                "data": {"value": {"urn": "urn:li:digitalmediaAsset:X", "singleUploadUrl": format!("http://{host}/up")}}
            }))
        }
        _ => MockResponse::status(400).with_body("bad upload"),
    })
    .await;
    let client = test_client(&server.url);

    let err = client
        .upload_media(
            MediaUploadType::MessagingFileAttachment,
            "notes.txt",
            b"notes".to_vec(),
            "text/plain",
        )
        .await
        .expect_err("put rejected");

    assert!(matches!(
        err,
        VoyagerError::ActionFailed { action: "upload media", status: 400, .. }
    ));
}

#[tokio::test]
async fn download_sends_cookies_without_csrf() {
    let server = spawn_mock(|_, _| MockResponse::status(200).with_body("file-bytes")).await;
    let client = test_client(&server.url);

    let bytes = client
        .download_media(&format!("{}/dms/image/abc", server.url))
        .await
        .expect("download");

    assert_eq!(bytes, b"file-bytes");
    let request = &server.requests()[0];
    assert!(request
        .header("cookie")
        .is_some_and(|cookie| cookie.contains("li_at=session-token")));
    assert!(request.header("csrf-token").is_none());
}
