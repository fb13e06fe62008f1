use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use toml::Value;

use crate::error::{Error, Result};

/// A resolved configuration document: `extends` and `imports` already inlined.
#[derive(Debug, Clone)]
pub struct ConfigDoc {
    pub path: PathBuf,
    pub value: Value,
}

impl ConfigDoc {
    pub fn in_memory(value: Value) -> Self {
        Self {
            path: PathBuf::from("<mem>"),
            value,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = toml::from_str(raw)?;
        Ok(Self::in_memory(value))
    }

    pub fn value_path(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if path.is_empty() {
            return Some(&self.value);
        }

        let mut cur = &self.value;
        for seg in path.split('.') {
            cur = cur.as_table()?.get(seg)?;
        }
        Some(cur)
    }

    pub fn deserialize_path<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let Some(v) = self.value_path(path) else {
            return Ok(None);
        };
        let parsed = v
            .clone()
            .try_into()
            .map_err(|e| Error::msg(format!("failed to deserialize config at '{path}': {e}")))?;
        Ok(Some(parsed))
    }

    /// Like `deserialize_path`, falling back to the section's defaults when absent.
    pub fn section<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T> {
        Ok(self.deserialize_path(path)?.unwrap_or_default())
    }
}

/// Overlay `top` onto `base`. Tables merge key by key; anything else replaces.
pub fn merge(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Table(base_tbl), Value::Table(top_tbl)) => {
            for (k, v) in top_tbl {
                match base_tbl.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        base_tbl.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

fn relative_to(file: &Path, reference: &str) -> PathBuf {
    let p = PathBuf::from(reference);
    if p.is_absolute() {
        return p;
    }
    file.parent().unwrap_or_else(|| Path::new(".")).join(p)
}

struct Loader {
    visiting: HashSet<PathBuf>,
}

impl Loader {
    fn load(&mut self, path: &Path) -> Result<Value> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !self.visiting.insert(key.clone()) {
            return Err(Error::msg(format!(
                "config import cycle detected at {}",
                key.display()
            )));
        }

        let raw = fs::read_to_string(path)
            .map_err(|e| Error::msg(format!("failed to read config {}: {e}", path.display())))?;
        let mut value: Value = toml::from_str(&raw)
            .map_err(|e| Error::msg(format!("TOML parse error in {}: {e}", path.display())))?;

        let mut out = Value::Table(Default::default());
        let parent = value
            .as_table_mut()
            .and_then(|t| t.remove("extends"))
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(Error::msg(format!(
                    "'extends' in {} must be a string",
                    path.display()
                ))),
            })
            .transpose()?;
        if let Some(parent) = parent {
            out = self.load(&relative_to(path, &parent))?;
        }

        self.inline_imports(path, &mut value)?;
        merge(&mut out, value);

        self.visiting.remove(&key);
        Ok(out)
    }

    // `imports = [...]` may appear at any table level; imported files are merged
    // first and the local keys win.
    fn inline_imports(&mut self, file: &Path, value: &mut Value) -> Result<()> {
        let Value::Table(tbl) = value else {
            return Ok(());
        };

        if let Some(imports) = tbl.remove("imports") {
            let Value::Array(entries) = imports else {
                return Err(Error::msg(format!(
                    "'imports' in {} must be an array of strings",
                    file.display()
                )));
            };
            let mut acc = Value::Table(Default::default());
            for entry in entries {
                let Some(rel) = entry.as_str() else {
                    return Err(Error::msg(format!(
                        "invalid imports entry in {} (expected string)",
                        file.display()
                    )));
                };
                if rel.trim().is_empty() {
                    continue;
                }
                let loaded = self.load(&relative_to(file, rel.trim()))?;
                merge(&mut acc, loaded);
            }
            merge(&mut acc, Value::Table(std::mem::take(tbl)));
            if let Value::Table(merged) = acc {
                *tbl = merged;
            }
        }

        for (_, v) in tbl.iter_mut() {
            self.inline_imports(file, v)?;
        }
        Ok(())
    }
}

pub fn load(path: &Path) -> Result<ConfigDoc> {
    let mut loader = Loader {
        visiting: HashSet::new(),
    };
    let value = loader.load(path)?;
    Ok(ConfigDoc {
        path: path.to_path_buf(),
        value,
    })
}
