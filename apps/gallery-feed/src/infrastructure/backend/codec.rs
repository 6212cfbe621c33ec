//! Delta Codec Module
//!
//! Decodes text frames from the gallery backend into [`GalleryDelta`]s.
//!
//! A frame is a JSON object with optional `added` (`[name, timestamp]`
//! pairs) and `removed` (names) arrays. Anything else is a decode error; the
//! connection manager drops such frames and keeps the connection.

use crate::domain::gallery::GalleryDelta;
use crate::infrastructure::backend::messages::ChangeMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid message format.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),

    /// A timestamp could not be represented as milliseconds.
    #[error("invalid timestamp for {0}")]
    InvalidTimestamp(String),
}

/// JSON codec for gallery change notifications.
#[derive(Debug, Default, Clone)]
pub struct DeltaCodec;

impl DeltaCodec {
    /// Create a new delta codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a JSON text frame into a delta.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object of the expected
    /// shape or carries a non-finite timestamp.
    pub fn decode(&self, text: &str) -> Result<GalleryDelta, CodecError> {
        let trimmed = text.trim();

        if !trimmed.starts_with('{') {
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {}...",
                truncate(trimmed, 50)
            )));
        }

        let message: ChangeMessage = serde_json::from_str(trimmed)?;

        let added = message
            .added
            .unwrap_or_default()
            .into_iter()
            .map(|(name, ts)| match ts.to_millis() {
                Some(millis) => Ok((name, millis)),
                None => Err(CodecError::InvalidTimestamp(name)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GalleryDelta {
            added,
            removed: message.removed.unwrap_or_default(),
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(index, _)| &text[..index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_added_and_removed() {
        let codec = DeltaCodec::new();
        let delta = codec
            .decode(r#"{"added":[["b.jpg",1],["a.jpg",3]],"removed":["x.jpg"]}"#)
            .unwrap();

        assert_eq!(
            delta.added,
            vec![("b.jpg".to_string(), 1), ("a.jpg".to_string(), 3)]
        );
        assert_eq!(delta.removed, vec!["x.jpg".to_string()]);
    }

    #[test]
    fn decode_missing_fields_as_empty() {
        let codec = DeltaCodec::new();

        let delta = codec.decode(r#"{"removed":["a.jpg"]}"#).unwrap();
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed.len(), 1);

        let delta = codec.decode("{}").unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let codec = DeltaCodec::new();
        let delta = codec
            .decode(r#"{"added":[["a.jpg",1]],"version":2}"#)
            .unwrap();
        assert_eq!(delta.added.len(), 1);
    }

    #[test]
    fn decode_rejects_non_object() {
        let codec = DeltaCodec::new();
        assert!(matches!(
            codec.decode("[1,2,3]"),
            Err(CodecError::InvalidFormat(_))
        ));
        assert!(matches!(
            codec.decode("hello"),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let codec = DeltaCodec::new();
        assert!(matches!(
            codec.decode(r#"{"added":[["a.jpg"]]}"#),
            Err(CodecError::Json(_))
        ));
        assert!(matches!(codec.decode("{"), Err(CodecError::Json(_))));
        assert!(matches!(
            codec.decode(r#"{"removed":"a.jpg"}"#),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn decode_accepts_fractional_timestamps() {
        let codec = DeltaCodec::new();
        let delta = codec.decode(r#"{"added":[["a.jpg",1.5]]}"#).unwrap();
        assert_eq!(delta.added, vec![("a.jpg".to_string(), 1)]);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("äöü", 2), "äö");
        assert_eq!(truncate("ab", 5), "ab");
    }
}
