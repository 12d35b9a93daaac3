use crm_core::models::AttachmentLocation;
use crm_mail::MailParser;
use crm_storage::{AttachmentStore, LocalAttachmentStore};
use tempfile::TempDir;

const MESSAGE: &str = "From: customer@example.com\r\n\
Subject: contract\r\n\
Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
Signed copy attached.\r\n\
--sep\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"contract.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAEC/f7/SGVsbG8sIHdvcmxkIQ==\r\n\
--sep\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"copy-of-contract.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAEC/f7/SGVsbG8sIHdvcmxkIQ==\r\n\
--sep--\r\n";

#[tokio::test]
async fn test_parsed_attachment_round_trips_through_store() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("static/uploads/attachments");
    let store = LocalAttachmentStore::new(&dir).await.unwrap();
    let parser = MailParser::new(AttachmentLocation::new(&dir, "/static"));

    let parsed = parser.parse_email_body(MESSAGE).unwrap();
    assert!(parsed.body.starts_with("Signed copy attached."));
    assert_eq!(parsed.attachments.len(), 2);

    let expected: Vec<u8> = [&[0u8, 1, 2, 253, 254, 255][..], b"Hello, world!"].concat();
    let first = &parsed.attachments[0];
    assert_eq!(first.binary_content, expected);
    assert_eq!(first.hashed_filepath, dir.join(&first.hashed_filename));

    assert!(store.persist(first).await.unwrap());
    // Same bytes under a different original name map to the same file.
    assert!(!store.persist(&parsed.attachments[1]).await.unwrap());

    let stored = store.read(&first.hashed_filename).await.unwrap();
    assert_eq!(stored, expected);
    assert_eq!(std::fs::read(&first.hashed_filepath).unwrap(), expected);
}
