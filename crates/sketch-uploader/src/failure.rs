use std::fmt;

/// Coarse stage a compile/upload failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Compile,
    Connection,
    Upload,
    Unknown,
}

impl FailureKind {
    /// Classify a bare message by its exact stage prefix. Used when a failure only
    /// carries text, e.g. one relayed from another tool.
    pub fn from_message(m: &str) -> Self {
        if m.starts_with("Upload error:") {
            FailureKind::Upload
        } else if m.starts_with("Compilation error:") {
            FailureKind::Compile
        } else if m.starts_with("Port error:") || m.starts_with("Connection error:") {
            FailureKind::Connection
        } else {
            FailureKind::Unknown
        }
    }

    /// Upload-stage failures may stem from bad field values; nothing else does.
    pub fn implicates_configuration(self) -> bool {
        matches!(self, FailureKind::Upload)
    }

    fn prefix(self) -> &'static str {
        match self {
            FailureKind::Compile => "Compilation error",
            FailureKind::Connection => "Connection error",
            FailureKind::Upload => "Upload error",
            FailureKind::Unknown => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl UploadFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: FailureKind::from_message(&message),
            message,
        }
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if FailureKind::from_message(&self.message) == self.kind {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.kind.prefix(), self.message)
        }
    }
}

impl std::error::Error for UploadFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_stage_prefix() {
        assert_eq!(FailureKind::from_message("Upload error: timeout"), FailureKind::Upload);
        assert_eq!(
            FailureKind::from_message("Compilation error: missing ;"),
            FailureKind::Compile
        );
        assert_eq!(
            FailureKind::from_message("Port error: /dev/ttyUSB0 busy"),
            FailureKind::Connection
        );
        assert_eq!(FailureKind::from_message("upload error: lower"), FailureKind::Unknown);
        assert_eq!(FailureKind::from_message(""), FailureKind::Unknown);
        assert_eq!(
            FailureKind::from_message("  Upload error: indented"),
            FailureKind::Unknown
        );
    }

    #[test]
    fn only_upload_stage_implicates_fields() {
        assert!(FailureKind::Upload.implicates_configuration());
        assert!(!FailureKind::Compile.implicates_configuration());
        assert!(!FailureKind::Connection.implicates_configuration());
        assert!(!FailureKind::Unknown.implicates_configuration());
    }

    #[test]
    fn display_adds_missing_prefix_once() {
        let f = UploadFailure::new(FailureKind::Upload, "exit status 1");
        assert_eq!(f.to_string(), "Upload error: exit status 1");
        let f = UploadFailure::from_message("Upload error: timeout");
        assert_eq!(f.to_string(), "Upload error: timeout");
    }
}
