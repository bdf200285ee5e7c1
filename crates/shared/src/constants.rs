pub const APP_NAME: &str = "Ghost";

// Limits
pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const MAX_EMOJI_LENGTH: usize = 32;
pub const MAX_STATUS_LENGTH: usize = 700;
pub const MAX_GROUP_NAME_LENGTH: usize = 100;
pub const MAX_CHANNEL_NAME_LENGTH: usize = 100;
pub const MIN_SEARCH_QUERY_LENGTH: usize = 2;
pub const MIN_USERNAME_LENGTH: usize = 2;
pub const MAX_USERNAME_LENGTH: usize = 32;
pub const MAX_BIO_LENGTH: usize = 250;
pub const MAX_PUSH_TOKEN_LENGTH: usize = 4096;

pub const MESSAGE_PAGE_SIZE: i64 = 50;
pub const MAX_MESSAGE_PAGE_SIZE: i64 = 100;
pub const SEARCH_RESULT_LIMIT: i64 = 50;
pub const USER_SEARCH_LIMIT: i64 = 20;
pub const CALL_HISTORY_LIMIT: i64 = 50;

// Ghost mode
pub const HOUR_MS: i64 = 60 * 60 * 1000;
pub const STATUS_TTL_MS: i64 = 24 * HOUR_MS;
pub const DEFAULT_DISAPPEAR_AFTER_MS: i64 = 24 * HOUR_MS;
pub const MAX_DISAPPEAR_AFTER_MS: i64 = 30 * 24 * HOUR_MS;
