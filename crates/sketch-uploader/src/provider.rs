use std::sync::{Mutex, mpsc};

use serde::Deserialize;

use crate::board::{Board, BoardsConfig, Port, UserField};
use crate::config::ConfigDoc;
use crate::error::{Error, Result};

/// Source of the current board/port selection and of the fields a board needs.
pub trait BoardProvider: Send + Sync {
    fn boards_config(&self) -> BoardsConfig;

    /// Field definitions (empty values) the selected board declares.
    fn selected_board_user_fields(&self) -> Result<Vec<UserField>>;

    /// A receiver that gets a snapshot after every selection change.
    fn subscribe(&self) -> mpsc::Receiver<BoardsConfig>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// FQBN of the selected board.
    pub board: String,
    /// Port reported by the board itself; wins over `port` when set.
    pub board_port: String,
    pub port: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoardDefinition {
    pub fqbn: String,
    pub name: String,
    pub user_fields: Vec<UserField>,
}

/// Board provider backed by `[[boards]]` definitions and a mutable selection.
pub struct StaticBoardProvider {
    boards: Vec<BoardDefinition>,
    selection: Mutex<BoardsConfig>,
    subscribers: Mutex<Vec<mpsc::Sender<BoardsConfig>>>,
}

impl StaticBoardProvider {
    pub fn new(boards: Vec<BoardDefinition>, selection: BoardsConfig) -> Self {
        Self {
            boards,
            selection: Mutex::new(selection),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn from_doc(doc: &ConfigDoc) -> Result<Self> {
        let boards: Vec<BoardDefinition> = doc.deserialize_path("boards")?.unwrap_or_default();
        for b in &boards {
            if b.fqbn.trim().is_empty() {
                return Err(Error::msg("boards entry is missing 'fqbn'"));
            }
            for f in &b.user_fields {
                if f.name.trim().is_empty() {
                    return Err(Error::msg(format!(
                        "board '{}' declares a user field without a name",
                        b.fqbn
                    )));
                }
            }
        }
        let sel: SelectionConfig = doc.section("selection")?;
        let selection = selection_snapshot(&boards, &sel.board, &sel.board_port, &sel.port);
        Ok(Self::new(boards, selection))
    }

    pub fn boards(&self) -> &[BoardDefinition] {
        &self.boards
    }

    /// Replace the selection and notify subscribers.
    pub fn select(&self, fqbn: &str, port: &str) {
        let snapshot = selection_snapshot(&self.boards, fqbn, "", port);
        self.set_boards_config(snapshot);
    }

    pub fn set_boards_config(&self, cfg: BoardsConfig) {
        if let Ok(mut g) = self.selection.lock() {
            *g = cfg.clone();
        }
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(cfg.clone()).is_ok());
        }
    }
}

fn selection_snapshot(
    boards: &[BoardDefinition],
    fqbn: &str,
    board_port: &str,
    port: &str,
) -> BoardsConfig {
    let fqbn = fqbn.trim();
    let selected_board = (!fqbn.is_empty()).then(|| Board {
        name: boards
            .iter()
            .find(|b| b.fqbn == fqbn)
            .map(|b| b.name.clone())
            .unwrap_or_default(),
        fqbn: Some(fqbn.to_string()),
        port: (!board_port.trim().is_empty()).then(|| Port::new(board_port.trim())),
    });
    let selected_port = (!port.trim().is_empty()).then(|| Port::new(port.trim()));
    BoardsConfig {
        selected_board,
        selected_port,
    }
}

impl BoardProvider for StaticBoardProvider {
    fn boards_config(&self) -> BoardsConfig {
        self.selection
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    fn selected_board_user_fields(&self) -> Result<Vec<UserField>> {
        let cfg = self.boards_config();
        let Some(fqbn) = cfg.fqbn() else {
            return Ok(Vec::new());
        };
        let fields = self
            .boards
            .iter()
            .find(|b| b.fqbn == fqbn)
            .map(|b| {
                b.user_fields
                    .iter()
                    .map(|f| UserField {
                        value: String::new(),
                        ..f.clone()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(fields)
    }

    fn subscribe(&self) -> mpsc::Receiver<BoardsConfig> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }
}
