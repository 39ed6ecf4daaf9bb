//! Attachment normalization - one canonical image payload for every source
//!
//! Files, clipboard pastes and capture stills all funnel into [`Attachment`].
//! Decoding is asynchronous; callers must not assume an attachment is
//! available right after initiating one.

use anyhow::Context;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Maximum size accepted for any single selected file (100 MB).
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Encoded image format carried by an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentFormat {
    Png,
    Jpeg,
}

impl AttachmentFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            AttachmentFormat::Png => "image/png",
            AttachmentFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Canonical encoded image payload carried by a chat message.
///
/// Immutable once produced; the message that carries it owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub format: AttachmentFormat,
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes; base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
}

impl Attachment {
    /// Encode raw RGBA pixels as a PNG attachment.
    pub fn from_rgba(image: &image::RgbaImage) -> Result<Self, image::ImageError> {
        let mut buf = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)?;
        Ok(Self {
            format: AttachmentFormat::Png,
            width: image.width(),
            height: image.height(),
            data: Bytes::from(buf),
        })
    }

    /// Data-URL rendition used by the answer service wire format.
    pub fn to_data_url(&self) -> String {
        use base64::Engine as _;
        format!(
            "data:{};base64,{}",
            self.format.mime(),
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

/// Validation failures rejected before any request is issued.
///
/// Surfaced inline by the presentation layer; never appended to the session
/// log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Neither text (after trimming) nor an attachment was provided.
    EmptySubmission,
    /// One or more selected files exceed [`MAX_UPLOAD_BYTES`].
    ///
    /// The whole batch is rejected; the list names every offender.
    OversizedFiles(Vec<String>),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptySubmission => write!(f, "nothing to submit"),
            ValidationError::OversizedFiles(names) => {
                write!(f, "files exceed the 100 MB limit: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a submission before any request is issued.
///
/// A submission needs text (after trimming) or an attachment; the
/// presentation layer surfaces the failure inline, next to the compose box.
pub fn check_submission(
    text: &str,
    attachment: Option<&Attachment>,
) -> Result<(), ValidationError> {
    if text.trim().is_empty() && attachment.is_none() {
        return Err(ValidationError::EmptySubmission);
    }
    Ok(())
}

/// Enforce the per-file size limit over a whole selection batch.
///
/// Rejection is all-or-nothing: a single offender fails the batch, and the
/// error enumerates every offending name so the user can fix the selection
/// in one pass.
pub fn check_selection_batch(files: &[(String, u64)]) -> Result<(), ValidationError> {
    let oversized: Vec<String> = files
        .iter()
        .filter(|(_, len)| *len > MAX_UPLOAD_BYTES)
        .map(|(name, _)| name.clone())
        .collect();
    if oversized.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::OversizedFiles(oversized))
    }
}

/// A single clipboard entry as reported by the host.
#[derive(Debug, Clone)]
pub struct ClipboardEntry {
    pub mime: String,
    pub data: Bytes,
}

/// Outcome of scanning a clipboard paste.
#[derive(Debug)]
pub enum PasteOutcome {
    /// An image entry was consumed; the default text paste must be
    /// suppressed.
    Image(Attachment),
    /// No image entry found; the text paste proceeds normally.
    PassThrough,
}

/// Scan clipboard entries for the first image-typed one and decode it.
pub async fn from_clipboard(entries: Vec<ClipboardEntry>) -> anyhow::Result<PasteOutcome> {
    let Some(entry) = entries.into_iter().find(|e| e.mime.starts_with("image/")) else {
        return Ok(PasteOutcome::PassThrough);
    };
    let attachment = decode_bytes(entry.data).await?;
    Ok(PasteOutcome::Image(attachment))
}

/// Decode an image file into a canonical attachment.
pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Attachment> {
    let path = path.as_ref().to_path_buf();
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    decode_bytes(Bytes::from(bytes)).await
}

/// Decode encoded image bytes into a canonical attachment.
///
/// The decode runs off the async threads; image parsing is CPU-bound.
pub async fn decode_bytes(data: Bytes) -> anyhow::Result<Attachment> {
    tokio::task::spawn_blocking(move || {
        let decoded = image::load_from_memory(&data).context("failed to decode image data")?;
        Attachment::from_rgba(&decoded.to_rgba8()).context("failed to re-encode image")
    })
    .await
    .context("image decode worker join failed")?
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([9, 120, 240, 255]));
        Attachment::from_rgba(&image).unwrap().data
    }

    #[test]
    fn test_batch_rejection_names_every_offender() {
        let files = vec![
            ("fine.pdf".to_string(), 10 * 1024),
            ("big-one.docx".to_string(), MAX_UPLOAD_BYTES + 1),
            ("big-two.xlsx".to_string(), MAX_UPLOAD_BYTES * 2),
        ];
        match check_selection_batch(&files) {
            Err(ValidationError::OversizedFiles(names)) => {
                assert_eq!(names, vec!["big-one.docx", "big-two.xlsx"]);
            }
            other => panic!("expected OversizedFiles, got {:?}", other),
        }
    }

    #[test]
    fn test_submission_needs_text_or_attachment() {
        assert_eq!(
            check_submission("  \n ", None),
            Err(ValidationError::EmptySubmission)
        );
        assert!(check_submission("hello", None).is_ok());

        let image = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        let attachment = Attachment::from_rgba(&image).unwrap();
        assert!(check_submission("", Some(&attachment)).is_ok());
    }

    #[test]
    fn test_batch_at_limit_is_accepted() {
        let files = vec![("exact.pdf".to_string(), MAX_UPLOAD_BYTES)];
        assert!(check_selection_batch(&files).is_ok());
    }

    #[tokio::test]
    async fn test_clipboard_scan_consumes_first_image() {
        let entries = vec![
            ClipboardEntry {
                mime: "text/plain".to_string(),
                data: Bytes::from_static(b"pasted text"),
            },
            ClipboardEntry {
                mime: "image/png".to_string(),
                data: png_bytes(2, 3),
            },
            ClipboardEntry {
                mime: "image/jpeg".to_string(),
                data: png_bytes(9, 9),
            },
        ];
        match from_clipboard(entries).await.unwrap() {
            PasteOutcome::Image(attachment) => {
                assert_eq!(attachment.width, 2);
                assert_eq!(attachment.height, 3);
            }
            PasteOutcome::PassThrough => panic!("expected the image entry to be consumed"),
        }
    }

    #[tokio::test]
    async fn test_clipboard_without_image_passes_through() {
        let entries = vec![ClipboardEntry {
            mime: "text/plain".to_string(),
            data: Bytes::from_static(b"just text"),
        }];
        assert!(matches!(
            from_clipboard(entries).await.unwrap(),
            PasteOutcome::PassThrough
        ));
    }

    #[tokio::test]
    async fn test_file_decodes_to_canonical_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        tokio::fs::write(&path, png_bytes(3, 2)).await.unwrap();

        let attachment = from_file(&path).await.unwrap();
        assert_eq!(attachment.format, AttachmentFormat::Png);
        assert_eq!(attachment.width, 3);
        assert_eq!(attachment.height, 2);
        // PNG magic survives re-encoding.
        assert_eq!(&attachment.data[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_to_decode() {
        let result = decode_bytes(Bytes::from_static(b"not an image at all")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_data_url_rendition() {
        let image = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        let attachment = Attachment::from_rgba(&image).unwrap();
        let url = attachment.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
