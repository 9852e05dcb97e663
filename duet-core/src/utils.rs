pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_3: &str = "stun:stun2.l.google.com:19302";

/// Prefix of the pub/sub topic carrying a room's document updates.
pub const SYNC_TOPIC_PREFIX: &str = "code-";

/// Register holding the editor language.
pub const LANGUAGE_REGISTER: &str = "language";

pub const DEFAULT_LANGUAGE: &str = "javascript";

pub fn default_stun_urls() -> Vec<String> {
    vec![
        DEFAULT_STUN_ADDR.to_owned(),
        DEFAULT_STUN_ADDR_2.to_owned(),
        DEFAULT_STUN_ADDR_3.to_owned(),
    ]
}
