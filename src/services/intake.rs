use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::storage::StorageError;

/// Hard cap on diagnostic photos per submission, enforced at capture time and
/// again at the final update boundary.
pub const MAX_DIAG_PHOTOS: usize = 3;

/// One photo accepted from the multipart stream, in capture order.
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub bytes: Vec<u8>,
    pub extension: String,
    pub content_type: String,
}

/// Ordered batch of captured photos. Pushes beyond the cap are silently
/// dropped rather than erroring, matching the capture UI contract.
#[derive(Debug, Default)]
pub struct PhotoBatch {
    photos: Vec<CapturedPhoto>,
}

impl PhotoBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a photo. Returns false when the batch is already full and the
    /// photo was dropped.
    pub fn push(&mut self, photo: CapturedPhoto) -> bool {
        if self.photos.len() >= MAX_DIAG_PHOTOS {
            return false;
        }
        self.photos.push(photo);
        true
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_full(&self) -> bool {
        self.photos.len() >= MAX_DIAG_PHOTOS
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn into_photos(self) -> Vec<CapturedPhoto> {
        self.photos
    }
}

/// A submitted part whose bytes are not a supported image format.
#[derive(Debug, thiserror::Error)]
#[error("unsupported image format")]
pub struct UnsupportedImage;

/// Decode one submitted part and add it to the batch. A part arriving once
/// the batch is full is dropped uninspected and returns false: format
/// validation only applies to captures that will actually be stored, so a
/// malformed extra capture can never fail the submission.
pub fn accept_part(batch: &mut PhotoBatch, data: &[u8]) -> Result<bool, UnsupportedImage> {
    if batch.is_full() {
        return Ok(false);
    }

    let format = image::guess_format(data).map_err(|_| UnsupportedImage)?;
    let extension = format.extensions_str().first().copied().unwrap_or("jpg");

    batch.push(CapturedPhoto {
        bytes: data.to_vec(),
        extension: extension.to_string(),
        content_type: format.to_mime_type().to_string(),
    });
    Ok(true)
}

/// Object key for a diagnostic photo: namespaced by token, disambiguated by
/// submission timestamp and capture index.
pub fn photo_key(token: Uuid, unix_millis: i64, index: usize, extension: &str) -> String {
    format!("{token}/{unix_millis}_{index}.{extension}")
}

/// Outcome of a diagnostic submission, surfaced to the client so a partial
/// upload reads as "2 of 3 photos sent" instead of false full success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionReport {
    /// Photos accepted from the capture flow.
    pub accepted: usize,
    /// Photos that actually reached object storage.
    pub uploaded: usize,
    /// Public URLs of the successes, in capture order.
    pub photo_urls: Vec<String>,
}

impl SubmissionReport {
    pub fn is_partial(&self) -> bool {
        self.uploaded < self.accepted
    }
}

/// Aggregate per-photo upload results into a report. A failed upload is
/// omitted from the stored list but still counted against `accepted`; order
/// of the successes follows capture order.
pub fn collect_report(results: Vec<Result<String, StorageError>>) -> SubmissionReport {
    let accepted = results.len();
    let photo_urls: Vec<String> = results.into_iter().filter_map(Result::ok).collect();

    SubmissionReport {
        accepted,
        uploaded: photo_urls.len(),
        photo_urls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(tag: u8) -> CapturedPhoto {
        CapturedPhoto {
            bytes: vec![tag; 8],
            extension: "jpg".to_string(),
            content_type: "image/jpeg".to_string(),
        }
    }

    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn malformed_part_beyond_cap_cannot_fail_submission() {
        let mut batch = PhotoBatch::new();
        for _ in 0..MAX_DIAG_PHOTOS {
            assert!(accept_part(&mut batch, JPEG_MAGIC).unwrap());
        }

        // The 4th part is garbage, but it is dropped before being decoded:
        // the three valid captures survive.
        let outcome = accept_part(&mut batch, b"definitely not an image");
        assert!(matches!(outcome, Ok(false)));
        assert_eq!(batch.len(), MAX_DIAG_PHOTOS);
    }

    #[test]
    fn malformed_part_within_cap_is_rejected() {
        let mut batch = PhotoBatch::new();
        assert!(accept_part(&mut batch, b"definitely not an image").is_err());
        assert!(batch.is_empty());
    }

    #[test]
    fn accept_part_derives_extension_from_magic_bytes() {
        let mut batch = PhotoBatch::new();
        assert!(accept_part(&mut batch, PNG_MAGIC).unwrap());

        let photos = batch.into_photos();
        assert_eq!(photos[0].extension, "png");
        assert_eq!(photos[0].content_type, "image/png");
    }

    #[test]
    fn batch_caps_at_three_photos() {
        let mut batch = PhotoBatch::new();
        assert!(batch.push(photo(1)));
        assert!(batch.push(photo(2)));
        assert!(batch.push(photo(3)));

        // Fourth capture is dropped, not an error.
        assert!(!batch.push(photo(4)));
        assert_eq!(batch.len(), 3);

        let photos = batch.into_photos();
        assert_eq!(photos[0].bytes[0], 1);
        assert_eq!(photos[2].bytes[0], 3);
    }

    #[test]
    fn photo_key_is_namespaced_by_token() {
        let token = Uuid::nil();
        let key = photo_key(token, 1_748_770_000_123, 2, "png");
        assert_eq!(
            key,
            "00000000-0000-0000-0000-000000000000/1748770000123_2.png"
        );
    }

    #[test]
    fn report_counts_all_successes() {
        let report = collect_report(vec![
            Ok("https://cdn.example/a.jpg".to_string()),
            Ok("https://cdn.example/b.jpg".to_string()),
        ]);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.uploaded, 2);
        assert!(!report.is_partial());
    }

    #[test]
    fn failed_upload_is_omitted_but_counted() {
        let report = collect_report(vec![
            Ok("https://cdn.example/1.jpg".to_string()),
            Err(StorageError::Config("connection reset".to_string())),
            Ok("https://cdn.example/3.jpg".to_string()),
        ]);

        assert_eq!(report.accepted, 3);
        assert_eq!(report.uploaded, 2);
        assert!(report.is_partial());
        // Successes keep capture order.
        assert_eq!(
            report.photo_urls,
            vec![
                "https://cdn.example/1.jpg".to_string(),
                "https://cdn.example/3.jpg".to_string()
            ]
        );
    }

    #[test]
    fn empty_submission_reports_nothing_uploaded() {
        let report = collect_report(vec![]);
        assert_eq!(report.accepted, 0);
        assert_eq!(report.uploaded, 0);
        assert!(report.photo_urls.is_empty());
    }
}
