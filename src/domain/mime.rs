//! Content type normalization and MIME-to-extension lookup

/// Content type recorded when the client sends none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Lowercase the essence of a `Content-Type` value and drop its parameters.
pub fn normalize(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or("").trim();
    if essence.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        essence.to_ascii_lowercase()
    }
}

/// File extension (without the dot) for a normalized content type.
///
/// Common media types map to a fixed preferred extension; everything else
/// falls back to the first entry `mime_guess` knows. Opaque binary has none.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let preferred = match content_type {
        DEFAULT_CONTENT_TYPE => return None,
        "image/jpeg" => "jpeg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/heic" => "heic",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "text/plain" => "txt",
        "application/pdf" => "pdf",
        "application/json" => "json",
        _ => {
            return mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first().copied());
        }
    };
    Some(preferred)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("image/JPEG"), "image/jpeg");
        assert_eq!(normalize("text/plain; charset=utf-8"), "text/plain");
        assert_eq!(normalize(""), DEFAULT_CONTENT_TYPE);
        assert_eq!(normalize("  ;foo=bar"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_preferred_extensions() {
        assert_eq!(extension_for("image/jpeg"), Some("jpeg"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("video/mp4"), Some("mp4"));
    }

    #[test]
    fn test_unknown_types_have_no_extension() {
        assert_eq!(extension_for(DEFAULT_CONTENT_TYPE), None);
        assert_eq!(extension_for("application/x-made-up-thing"), None);
    }

    #[test]
    fn test_falls_back_to_mime_table() {
        let ext = extension_for("text/css");
        assert_eq!(ext, Some("css"));
    }
}
