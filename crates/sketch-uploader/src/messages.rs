/// A user-facing message with a stable key; the default text is used when no
/// translation is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedMessage {
    pub key: &'static str,
    pub default: &'static str,
}

pub const USER_FIELDS_NOT_FOUND: LocalizedMessage = LocalizedMessage {
    key: "sketch/userFieldsNotFoundError",
    default: "Can't find user fields for connected board",
};

pub trait MessageService: Send + Sync {
    fn error(&self, message: &LocalizedMessage);
}

#[derive(Debug, Default)]
pub struct ConsoleMessages;

impl MessageService for ConsoleMessages {
    fn error(&self, message: &LocalizedMessage) {
        tracing::error!(key = message.key, "{}", message.default);
        eprintln!("ERROR: {}", message.default);
    }
}
