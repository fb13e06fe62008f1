use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    pub address: String,
    pub protocol: Option<String>,
}

impl Port {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            protocol: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Board {
    pub name: String,
    pub fqbn: Option<String>,
    pub port: Option<Port>,
}

/// Snapshot of the current board/port selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardsConfig {
    pub selected_board: Option<Board>,
    pub selected_port: Option<Port>,
}

impl BoardsConfig {
    pub fn new(fqbn: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            selected_board: Some(Board {
                name: String::new(),
                fqbn: Some(fqbn.into()),
                port: None,
            }),
            selected_port: Some(Port::new(port)),
        }
    }

    pub fn fqbn(&self) -> Option<&str> {
        self.selected_board
            .as_ref()
            .and_then(|b| b.fqbn.as_deref())
            .filter(|f| !f.is_empty())
    }

    /// The board's own port address wins over the separately selected port.
    pub fn port_address(&self) -> Option<&str> {
        let board_addr = self
            .selected_board
            .as_ref()
            .and_then(|b| b.port.as_ref())
            .map(|p| p.address.as_str())
            .filter(|a| !a.is_empty());
        board_addr.or_else(|| {
            self.selected_port
                .as_ref()
                .map(|p| p.address.as_str())
                .filter(|a| !a.is_empty())
        })
    }
}

/// "This board on this port". Only constructible from a fully resolved selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BoardIdentity(String);

impl BoardIdentity {
    pub fn resolve(cfg: &BoardsConfig) -> Option<Self> {
        let fqbn = cfg.fqbn()?;
        let address = cfg.port_address()?;
        Some(Self(format!("{fqbn}|{address}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A board-declared configuration value. Definitions coming from a board
/// provider carry an empty `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserField {
    pub tool_id: String,
    pub name: String,
    pub label: String,
    pub secret: bool,
    pub value: String,
}

impl UserField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, secret: bool) -> Self {
        Self {
            tool_id: String::new(),
            name: name.into(),
            label: label.into(),
            secret,
            value: String::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// Short stable digest of a field set, safe to log in place of the values.
pub fn fields_fingerprint(fields: &[UserField]) -> String {
    let mut h = Sha256::new();
    for f in fields {
        h.update(f.tool_id.as_bytes());
        h.update([0]);
        h.update(f.name.as_bytes());
        h.update([0]);
        h.update(f.value.as_bytes());
        h.update([0xff]);
    }
    let digest = hex::encode(h.finalize());
    digest[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_board_port(fqbn: &str, board_port: &str, port: &str) -> BoardsConfig {
        BoardsConfig {
            selected_board: Some(Board {
                name: "Uno".into(),
                fqbn: Some(fqbn.into()),
                port: Some(Port::new(board_port)),
            }),
            selected_port: Some(Port::new(port)),
        }
    }

    #[test]
    fn identity_joins_fqbn_and_port() {
        let cfg = BoardsConfig::new("X:avr:uno", "/dev/ttyUSB0");
        let id = BoardIdentity::resolve(&cfg).unwrap();
        assert_eq!(id.as_str(), "X:avr:uno|/dev/ttyUSB0");
        assert_eq!(BoardIdentity::resolve(&cfg), Some(id));
    }

    #[test]
    fn board_port_takes_precedence() {
        let cfg = with_board_port("X:avr:uno", "/dev/ttyACM1", "/dev/ttyUSB0");
        assert_eq!(
            BoardIdentity::resolve(&cfg).unwrap().as_str(),
            "X:avr:uno|/dev/ttyACM1"
        );

        let cfg = with_board_port("X:avr:uno", "", "/dev/ttyUSB0");
        assert_eq!(
            BoardIdentity::resolve(&cfg).unwrap().as_str(),
            "X:avr:uno|/dev/ttyUSB0"
        );
    }

    #[test]
    fn identity_changes_with_fqbn_or_address() {
        let base = BoardIdentity::resolve(&BoardsConfig::new("X:avr:uno", "/dev/ttyUSB0"));
        let other_board = BoardIdentity::resolve(&BoardsConfig::new("X:avr:mega", "/dev/ttyUSB0"));
        let other_port = BoardIdentity::resolve(&BoardsConfig::new("X:avr:uno", "/dev/ttyUSB1"));
        assert_ne!(base, other_board);
        assert_ne!(base, other_port);
    }

    #[test]
    fn unresolved_without_fqbn_or_address() {
        assert_eq!(BoardIdentity::resolve(&BoardsConfig::default()), None);
        assert_eq!(BoardIdentity::resolve(&BoardsConfig::new("", "/dev/ttyUSB0")), None);
        assert_eq!(BoardIdentity::resolve(&BoardsConfig::new("X:avr:uno", "")), None);

        let no_port = BoardsConfig {
            selected_board: Some(Board {
                name: "Uno".into(),
                fqbn: Some("X:avr:uno".into()),
                port: None,
            }),
            selected_port: None,
        };
        assert_eq!(BoardIdentity::resolve(&no_port), None);
    }

    #[test]
    fn fingerprint_tracks_values() {
        let a = vec![UserField::new("password", "Password", true).with_value("secret")];
        let b = vec![UserField::new("password", "Password", true).with_value("other")];
        assert_eq!(fields_fingerprint(&a), fields_fingerprint(&a.clone()));
        assert_ne!(fields_fingerprint(&a), fields_fingerprint(&b));
        assert_eq!(fields_fingerprint(&a).len(), 12);
    }
}
