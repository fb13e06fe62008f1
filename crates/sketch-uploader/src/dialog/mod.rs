use std::collections::BTreeMap;

use serde::Deserialize;

use crate::board::UserField;
use crate::error::Result;

pub mod tui;

/// Modal entry of user field values.
///
/// `open` gets its own copy of the fields and returns the edited set, or `None`
/// when the user cancels.
pub trait FieldsDialog: Send {
    fn open(&mut self, fields: Vec<UserField>) -> Result<Option<Vec<UserField>>>;
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DialogMode {
    #[default]
    Tui,
    Preset,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    pub mode: DialogMode,
    /// Answers keyed by field name.
    pub values: BTreeMap<String, String>,
}

pub fn from_config(cfg: &DialogConfig) -> Box<dyn FieldsDialog> {
    match cfg.mode {
        DialogMode::Tui => Box::new(tui::TuiDialog::default()),
        DialogMode::Preset => Box::new(PresetDialog::new(cfg.values.clone())),
    }
}

/// Non-interactive dialog answering from a fixed map. A field that ends up
/// empty cancels the dialog.
#[derive(Debug, Clone, Default)]
pub struct PresetDialog {
    values: BTreeMap<String, String>,
}

impl PresetDialog {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl FieldsDialog for PresetDialog {
    fn open(&mut self, mut fields: Vec<UserField>) -> Result<Option<Vec<UserField>>> {
        for f in &mut fields {
            if let Some(v) = self.values.get(&f.name) {
                f.value = v.clone();
            }
        }
        if let Some(missing) = fields.iter().find(|f| f.value.is_empty()) {
            tracing::warn!(field = %missing.name, "no preset value for user field");
            return Ok(None);
        }
        Ok(Some(fields))
    }
}

/// Parse `name=value` pairs given on the command line.
pub fn parse_field_assignments(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for item in raw {
        let Some((name, value)) = item.split_once('=') else {
            return Err(crate::Error::msg(format!(
                "invalid field assignment '{item}' (expected name=value)"
            )));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(crate::Error::msg(format!(
                "invalid field assignment '{item}' (empty name)"
            )));
        }
        out.insert(name.to_string(), value.to_string());
    }
    Ok(out)
}
