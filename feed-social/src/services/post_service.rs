use feed_shared::errors::{AppError, AppResult, ErrorCode};

pub const DESCRIPTION_MAX_LEN: usize = 255;
pub const COMMENT_MAX_LEN: usize = 200;

/// Maps an accepted image content type to the file extension used in storage.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Validates the post form. A post needs a description, an image, or both.
pub fn clean_description(raw: Option<&str>, has_image: bool) -> AppResult<String> {
    let description = raw.map(str::trim).unwrap_or_default().to_string();

    if description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(AppError::with_details(
            ErrorCode::ValidationError,
            format!("description must be at most {DESCRIPTION_MAX_LEN} characters"),
            serde_json::json!({ "field": "description" }),
        ));
    }
    if description.is_empty() && !has_image {
        return Err(AppError::new(ErrorCode::EmptyPost, "a post needs a description or an image"));
    }
    Ok(description)
}

pub fn clean_comment(raw: &str) -> AppResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "comment text is required"));
    }
    if text.chars().count() > COMMENT_MAX_LEN {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("comment must be at most {COMMENT_MAX_LEN} characters"),
        ));
    }
    Ok(text.to_string())
}

/// First characters of a comment, for event payloads.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_image_types() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(image_extension("image/svg+xml"), None);
    }

    #[test]
    fn description_is_trimmed() {
        assert_eq!(clean_description(Some("  hello  "), false).unwrap(), "hello");
    }

    #[test]
    fn image_only_post_is_allowed() {
        assert_eq!(clean_description(None, true).unwrap(), "");
        assert_eq!(clean_description(Some("   "), true).unwrap(), "");
    }

    #[test]
    fn empty_post_is_rejected() {
        let err = clean_description(Some("  "), false).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::EmptyPost);
    }

    #[test]
    fn description_length_counts_characters() {
        assert!(clean_description(Some(&"é".repeat(255)), false).is_ok());
        let err = clean_description(Some(&"é".repeat(256)), false).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ValidationError);
    }

    #[test]
    fn comment_rules() {
        assert_eq!(clean_comment("  nice shot ").unwrap(), "nice shot");
        assert!(clean_comment("   ").is_err());
        assert!(clean_comment(&"x".repeat(200)).is_ok());
        assert!(clean_comment(&"x".repeat(201)).is_err());
    }

    #[test]
    fn preview_truncates_long_text() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghijkl", 5), "abcde…");
    }
}
