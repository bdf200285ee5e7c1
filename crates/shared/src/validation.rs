use crate::constants::*;

/// Text messages need content; media messages may carry an empty caption.
pub fn validate_message_content(content: &str, has_media: bool) -> Result<(), String> {
    if content.trim().is_empty() && !has_media {
        return Err("Message content is required".into());
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!("Message must be at most {} characters", MAX_MESSAGE_LENGTH));
    }
    Ok(())
}

pub fn validate_emoji(emoji: &str) -> Result<(), String> {
    let trimmed = emoji.trim();
    if trimmed.is_empty() {
        return Err("Emoji is required".into());
    }
    if trimmed.len() > MAX_EMOJI_LENGTH || trimmed.chars().any(char::is_whitespace) {
        return Err("Invalid emoji".into());
    }
    Ok(())
}

pub fn validate_disappear_after(duration_ms: i64) -> Result<(), String> {
    if duration_ms < 0 {
        return Err("Disappearing duration cannot be negative".into());
    }
    if duration_ms > MAX_DISAPPEAR_AFTER_MS {
        return Err(format!(
            "Disappearing duration must be at most {} days",
            MAX_DISAPPEAR_AFTER_MS / (24 * HOUR_MS)
        ));
    }
    Ok(())
}

pub fn validate_status(content: Option<&str>, has_media: bool) -> Result<(), String> {
    let text = content.map(str::trim).unwrap_or("");
    if text.is_empty() && !has_media {
        return Err("Status needs text or media".into());
    }
    if text.chars().count() > MAX_STATUS_LENGTH {
        return Err(format!(
            "Status must be at most {} characters",
            MAX_STATUS_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_group_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Group name is required".into());
    }
    if trimmed.chars().count() > MAX_GROUP_NAME_LENGTH {
        return Err(format!(
            "Group name must be at most {} characters",
            MAX_GROUP_NAME_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_channel_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Channel name is required".into());
    }
    if trimmed.chars().count() > MAX_CHANNEL_NAME_LENGTH {
        return Err(format!(
            "Channel name must be at most {} characters",
            MAX_CHANNEL_NAME_LENGTH
        ));
    }
    Ok(())
}

/// Length only; the allowed characters are checked by the server.
pub fn validate_username_length(username: &str) -> Result<(), String> {
    let len = username.trim().chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(format!(
            "Username must be {}-{} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_bio(bio: &str) -> Result<(), String> {
    if bio.chars().count() > MAX_BIO_LENGTH {
        return Err(format!("Bio must be at most {} characters", MAX_BIO_LENGTH));
    }
    Ok(())
}

pub fn is_searchable(query: &str) -> bool {
    query.trim().chars().count() >= MIN_SEARCH_QUERY_LENGTH
}
