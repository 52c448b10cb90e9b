//! Runtime configuration, read from an optional TOML file and `TABULA_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
  pub store_path:      PathBuf,
  /// Organization every command is scoped to, unless `--org` is given.
  pub organization_id: Option<Uuid>,
  /// Recorded as the creator of new activities.
  pub user_id:         Option<Uuid>,
}

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("store_path", "tabula.db")?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TABULA"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Settings = settings
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
