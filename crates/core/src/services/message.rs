//! Message rules: validation and attachment classification.

use std::io::Cursor;

use image::ImageReader;
use mentorconnect_common::{AppError, AppResult, StorageBackend};
use mentorconnect_db::entities::group_message;

/// Maximum length of a message body, in characters.
pub const MAX_BODY_CHARS: usize = 300;

/// Maximum size of an attached file (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Check that a message is well formed before it is stored.
///
/// A message needs a non-blank body or a file. The body is limited to
/// [`MAX_BODY_CHARS`] characters and the file to [`MAX_FILE_SIZE`] bytes.
pub fn validate_message(body: Option<&str>, file_size: Option<u64>) -> AppResult<()> {
    let body = body.filter(|b| !b.trim().is_empty());

    if body.is_none() && file_size.is_none() {
        return Err(AppError::Validation(
            "Message must have a body or a file".to_string(),
        ));
    }

    if let Some(body) = body {
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(AppError::Validation(format!(
                "Message body must be at most {MAX_BODY_CHARS} characters"
            )));
        }
    }

    if let Some(size) = file_size {
        if size > MAX_FILE_SIZE {
            return Err(AppError::Validation(
                "Please keep filesize under 10 MB".to_string(),
            ));
        }
    }

    Ok(())
}

/// Whether `data` fully decodes as an image of a supported format.
#[must_use]
pub fn is_image(data: &[u8]) -> bool {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.decode().ok())
        .is_some()
}

/// [`is_image`] on a blocking thread.
pub async fn decode_image(data: Vec<u8>) -> bool {
    tokio::task::spawn_blocking(move || is_image(&data))
        .await
        .unwrap_or(false)
}

/// Whether the message's attachment is an image.
///
/// Uses the flag recorded when the message was posted. Only rows without it
/// read the stored file back and decode it. Never fails: a message without a
/// file, a missing object or undecodable data all count as "not an image".
pub async fn classify_attachment(
    storage: &dyn StorageBackend,
    message: &group_message::Model,
) -> bool {
    let Some(key) = message.file_key.as_deref() else {
        return false;
    };
    if let Some(flag) = message.is_image {
        return flag;
    }

    let data = match storage.read(key).await {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(message_id = %message.id, error = %e, "Attachment not readable");
            return false;
        }
    };

    decode_image(data).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use image::{ImageFormat, RgbImage};
    use mentorconnect_common::LocalStorage;

    pub(crate) fn png_bytes() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(4, 4)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn message_with_file(file_key: Option<&str>) -> group_message::Model {
        group_message::Model {
            id: "msg1".to_string(),
            group_id: "grp1".to_string(),
            author_id: "user1".to_string(),
            body: Some("hi".to_string()),
            file_key: file_key.map(ToString::to_string),
            file_name: file_key.map(|_| "photo.png".to_string()),
            file_size: None,
            is_image: None,
            created_at: Utc::now().into(),
        }
    }

    fn temp_storage() -> LocalStorage {
        let dir = std::env::temp_dir().join(format!("mentorconnect-{}", uuid::Uuid::new_v4()));
        LocalStorage::new(dir, "/media".to_string())
    }

    #[test]
    fn test_validate_requires_body_or_file() {
        assert!(validate_message(None, None).is_err());
        assert!(validate_message(Some("   \n"), None).is_err());
        assert!(validate_message(Some("hello"), None).is_ok());
        assert!(validate_message(None, Some(12)).is_ok());
        assert!(validate_message(Some(""), Some(0)).is_ok());
    }

    #[test]
    fn test_validate_body_length() {
        let max = "é".repeat(MAX_BODY_CHARS);
        assert!(validate_message(Some(&max), None).is_ok());

        let too_long = "a".repeat(MAX_BODY_CHARS + 1);
        assert!(matches!(
            validate_message(Some(&too_long), None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_file_size_boundary() {
        assert!(validate_message(None, Some(MAX_FILE_SIZE)).is_ok());
        assert!(validate_message(None, Some(MAX_FILE_SIZE + 1)).is_err());
        assert!(validate_message(Some("caption"), Some(MAX_FILE_SIZE + 1)).is_err());
    }

    #[test]
    fn test_is_image() {
        let png = png_bytes();
        assert!(is_image(&png));
        assert!(!is_image(&png[..png.len() / 2]));
        assert!(!is_image(b"%PDF-1.4 not an image"));
        assert!(!is_image(&[]));
    }

    #[tokio::test]
    async fn test_classify_without_file() {
        let storage = temp_storage();
        assert!(!classify_attachment(&storage, &message_with_file(None)).await);
    }

    #[tokio::test]
    async fn test_classify_missing_object() {
        let storage = temp_storage();
        let message = message_with_file(Some("files/user1/gone.png"));
        assert!(!classify_attachment(&storage, &message).await);
    }

    #[tokio::test]
    async fn test_classify_uses_recorded_flag() {
        let storage = temp_storage();

        // Nothing is stored under the key, so a read would report "not an image".
        let mut message = message_with_file(Some("files/user1/never-read.png"));
        message.is_image = Some(true);
        assert!(classify_attachment(&storage, &message).await);

        message.is_image = Some(false);
        assert!(!classify_attachment(&storage, &message).await);
    }

    #[tokio::test]
    async fn test_decode_image() {
        assert!(decode_image(png_bytes()).await);
        assert!(!decode_image(b"plain text".to_vec()).await);
    }

    #[tokio::test]
    async fn test_classify_image_and_corrupt() {
        let storage = temp_storage();
        let png = png_bytes();

        storage
            .upload("files/user1/ok.png", &png, "image/png")
            .await
            .unwrap();
        storage
            .upload("files/user1/bad.png", &png[..png.len() / 2], "image/png")
            .await
            .unwrap();

        let ok = message_with_file(Some("files/user1/ok.png"));
        let bad = message_with_file(Some("files/user1/bad.png"));
        assert!(classify_attachment(&storage, &ok).await);
        assert!(!classify_attachment(&storage, &bad).await);
    }
}
