//! Checks applied to a game submission before anything leaves the server.

use crate::error::{OgpError, Result};
use crate::types::{GameSubmission, ImageUpload};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Validate a submission and its images, reporting every problem at once.
pub fn validate_submission(
    submission: &GameSubmission,
    image: Option<&ImageUpload>,
    cover_image: Option<&ImageUpload>,
) -> Result<()> {
    let mut problems = Vec::new();

    for (value, field) in [
        (&submission.name, "name"),
        (&submission.description, "description"),
        (&submission.user_email, "userEmail"),
    ] {
        if value.trim().is_empty() {
            problems.push(format!("{} is required", field));
        }
    }

    if submission.points_per_jump == 0 {
        problems.push("pointsPerJump must be greater than 0".to_string());
    }
    if submission.lives == 0 {
        problems.push("lives must be greater than 0".to_string());
    }

    if !submission.user_email.trim().is_empty() && !is_valid_email(&submission.user_email) {
        problems.push(format!("userEmail '{}' is not a valid email", submission.user_email));
    }

    if let Some(twitter) = non_blank(&submission.twitter) {
        if !is_valid_twitter(twitter) {
            problems.push("twitter must be a valid Twitter username".to_string());
        }
    }
    if let Some(discord) = non_blank(&submission.discord) {
        if !is_valid_discord(discord) {
            problems.push("discord must be a valid Discord invite code".to_string());
        }
    }
    if let Some(telegram) = non_blank(&submission.telegram) {
        if !is_valid_telegram(telegram) {
            problems.push("telegram must be a valid Telegram handle".to_string());
        }
    }
    if let Some(jwks_url) = non_blank(&submission.jwks_url) {
        if let Err(e) = validate_url(jwks_url, "jwksUrl") {
            problems.push(e);
        }
    }

    for (limit, field) in [
        (submission.max_score_per_session, "maxScorePerSession"),
        (submission.max_sessions_per_day, "maxSessionsPerDay"),
        (
            submission.max_cumulative_points_per_day,
            "maxCumulativePointsPerDay",
        ),
    ] {
        if limit == Some(0) {
            problems.push(format!("{} must be greater than 0", field));
        }
    }

    match image {
        Some(image) => problems.extend(check_image(image, "image")),
        None => problems.push("image is required".to_string()),
    }
    if let Some(cover) = cover_image {
        problems.extend(check_image(cover, "coverImage"));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(OgpError::Validation(problems))
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_image(image: &ImageUpload, field: &str) -> Option<String> {
    if image.size() > MAX_IMAGE_BYTES {
        return Some(format!("{} must be less than 5MB", field));
    }
    if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.to_lowercase().as_str()) {
        return Some(format!(
            "{} must be a valid image file (JPG, PNG, GIF, WEBP)",
            field
        ));
    }
    None
}

pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.trim().split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// Accepts `name`, `@name` or a profile URL.
pub fn is_valid_twitter(handle: &str) -> bool {
    let handle = strip_prefixes(handle, &["twitter.com/", "x.com/"]);
    let handle = handle.trim_start_matches('@');
    matches_charset(handle, 1, 15, |c| c.is_ascii_alphanumeric() || c == '_')
}

/// Accepts an invite code or an invite URL.
pub fn is_valid_discord(invite: &str) -> bool {
    let code = strip_prefixes(invite, &["discord.gg/", "discord.com/invite/"]);
    matches_charset(code, 3, 25, |c| c.is_ascii_alphanumeric() || c == '-')
}

pub fn is_valid_telegram(handle: &str) -> bool {
    let handle = strip_prefixes(handle, &["t.me/"]);
    let handle = handle.trim_start_matches('@');
    matches_charset(handle, 5, 32, |c| c.is_ascii_alphanumeric() || c == '_')
}

fn strip_prefixes<'a>(value: &'a str, prefixes: &[&str]) -> &'a str {
    let value = strip_scheme(value.trim());
    let value = value.strip_prefix("www.").unwrap_or(value);
    prefixes
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .unwrap_or(value)
        .trim_end_matches('/')
}

fn matches_charset(value: &str, min: usize, max: usize, allowed: impl Fn(char) -> bool) -> bool {
    let len = value.chars().count();
    len >= min && len <= max && value.chars().all(allowed)
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

/// Replace any `http(s)://` scheme on `url` with `prefix`.
pub fn format_url(url: &str, prefix: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    format!("{}{}", prefix, strip_scheme(url))
}

/// Profile URL for a Twitter handle given as `name`, `@name` or a URL.
pub fn twitter_url(handle: &str) -> String {
    let handle = strip_prefixes(handle, &["twitter.com/", "x.com/"]).trim_start_matches('@');
    format_url(handle, "https://twitter.com/")
}

/// Invite URL for a Discord invite given as a code or a URL.
pub fn discord_url(invite: &str) -> String {
    let code = strip_prefixes(invite, &["discord.gg/", "discord.com/invite/"]);
    format_url(code, "https://discord.gg/")
}

/// Loose URL check: dotted host of alphanumeric/hyphen labels, optional path.
pub fn validate_url(url: &str, field: &str) -> std::result::Result<(), String> {
    let clean = strip_scheme(url.trim());
    let (host, _path) = match clean.find('/') {
        Some(idx) => clean.split_at(idx),
        None => (clean, ""),
    };
    let host = host.split(':').next().unwrap_or(host);

    let labels_ok = !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    if !labels_ok {
        return Err(format!(
            "{} must be a valid URL (e.g., example.com or subdomain.example.com/path)",
            field
        ));
    }
    if !host.contains('.') {
        return Err(format!("{} must be a URL with a domain (e.g., example.com)", field));
    }
    Ok(())
}
