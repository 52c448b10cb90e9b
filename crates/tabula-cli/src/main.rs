//! `tabula` — administer activity schemas in a Tabula SQLite store.
//!
//! # Usage
//!
//! ```text
//! tabula --org <uuid> activity create Orders
//! tabula field add <activity> Customer --type key --code customer
//! tabula field set <activity> fields.0.details '{"activity_id": "...", "field_id": "..."}'
//! tabula check
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tabula_core::{
  Error as CoreError,
  activity::{Activity, FieldOptions, FieldType, NewActivity, NewField},
  details::FieldDetails,
  invariant::check_edges,
  mutation::FieldSet,
  path::{FieldLeaf, FieldPath},
  store::ActivityStore,
};
use tabula_store_sqlite::{Error as StoreError, SqliteStore};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::Settings;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Administer Tabula activity schemas")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tabula.toml")]
  config: PathBuf,

  /// Organization to operate on; overrides `organization_id` from config.
  #[arg(long, env = "TABULA_ORG")]
  org: Option<Uuid>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Manage activities.
  #[command(subcommand)]
  Activity(ActivityCommand),
  /// Manage the fields of an activity.
  #[command(subcommand)]
  Field(FieldCommand),
  /// Verify that every relationship edge has its counterpart.
  Check,
}

#[derive(Subcommand)]
enum ActivityCommand {
  Create {
    name:        String,
    #[arg(long)]
    description: Option<String>,
  },
  List,
  Show {
    activity: Uuid,
  },
  Rename {
    activity:    Uuid,
    name:        String,
    #[arg(long)]
    description: Option<String>,
  },
  Delete {
    activity: Uuid,
  },
}

#[derive(Subcommand)]
enum FieldCommand {
  Add(AddField),
  /// Set one path of a field, e.g. `fields.0.type`.
  Set {
    activity: Uuid,
    path:     String,
    /// JSON value; bare words are taken as strings.
    value:    String,
    /// Details payload (JSON) for the field's new type.
    #[arg(long)]
    details:  Option<String>,
  },
  Remove {
    activity: Uuid,
    position: usize,
    /// Name of the field at `position`, as a guard.
    name:     String,
  },
}

#[derive(Args)]
struct AddField {
  activity:    Uuid,
  name:        String,
  #[arg(long = "type", default_value = "text")]
  field_type:  String,
  #[arg(long, default_value = "")]
  code:        String,
  #[arg(long)]
  description: Option<String>,
  #[arg(long)]
  primary_key: bool,
  #[arg(long)]
  multiple:    bool,
  /// Details payload (JSON) matching `--type`.
  #[arg(long)]
  details:     Option<String>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;
  let org = cli
    .org
    .or(settings.organization_id)
    .context("no organization: pass --org or set organization_id")?;

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  tracing::debug!(store = ?settings.store_path, %org, "store opened");

  let outcome = match cli.command {
    Command::Activity(cmd) => run_activity(&store, org, &settings, cmd).await,
    Command::Field(cmd) => run_field(&store, org, cmd).await,
    Command::Check => run_check(&store, org).await,
  };
  if let Err(err) = &outcome
    && is_not_found(err)
  {
    tracing::error!("{err:#}");
    std::process::exit(NOT_FOUND_EXIT);
  }
  outcome
}

/// Exit status for a missing activity or field, distinct from other failures.
const NOT_FOUND_EXIT: i32 = 2;

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run_activity(
  store: &SqliteStore,
  org: Uuid,
  settings: &Settings,
  cmd: ActivityCommand,
) -> Result<()> {
  match cmd {
    ActivityCommand::Create { name, description } => {
      let activity = store
        .create_activity(NewActivity {
          organization_id: org,
          created_by: settings.user_id.unwrap_or(Uuid::nil()),
          name,
          description,
        })
        .await?;
      print_json(&activity)
    }
    ActivityCommand::List => print_json(&store.list_activities(org).await?),
    ActivityCommand::Show { activity } => {
      print_json(&fetch(store, org, activity).await?)
    }
    ActivityCommand::Rename { activity, name, description } => {
      print_json(&store.rename_activity(org, activity, name, description).await?)
    }
    ActivityCommand::Delete { activity } => {
      store.soft_delete_activity(org, activity).await?;
      tracing::info!(%activity, "activity deleted");
      Ok(())
    }
  }
}

async fn run_field(store: &SqliteStore, org: Uuid, cmd: FieldCommand) -> Result<()> {
  match cmd {
    FieldCommand::Add(add) => {
      let activity = fetch(store, org, add.activity).await?;
      let field_type = FieldType::from(add.field_type);
      let details = add
        .details
        .map(|raw| decode_details(&field_type, &raw))
        .transpose()?;
      let field = NewField {
        name: add.name,
        description: add.description,
        field_type,
        primary_key: add.primary_key,
        options: FieldOptions { multiple: add.multiple, ..FieldOptions::default() },
        code: add.code,
        details,
      };
      print_json(&store.add_field(&activity, org, field).await?)
    }
    FieldCommand::Set { activity, path, value, details } => {
      let activity = fetch(store, org, activity).await?;
      let value = parse_value(&value);
      let mut set = FieldSet::new(path, value);
      if let Some(raw) = details {
        let field_type = type_for_details(&activity, &set)?;
        set = set.with_details(decode_details(&field_type, &raw)?);
      }
      print_json(&store.update_field_set(&activity, org, set).await?)
    }
    FieldCommand::Remove { activity, position, name } => {
      let activity = fetch(store, org, activity).await?;
      print_json(&store.update_field_remove(&activity, org, position, &name).await?)
    }
  }
}

async fn run_check(store: &SqliteStore, org: Uuid) -> Result<()> {
  let activities = store.list_activities(org).await?;
  let violations = check_edges(&activities);
  if violations.is_empty() {
    tracing::info!(activities = activities.len(), "all relationship edges consistent");
    return Ok(());
  }
  for violation in &violations {
    tracing::warn!("{violation}");
  }
  bail!("{} relationship violation(s)", violations.len())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn fetch(store: &SqliteStore, org: Uuid, activity: Uuid) -> Result<Activity> {
  store
    .get_activity(org, activity)
    .await?
    .ok_or_else(|| StoreError::from(CoreError::ActivityNotFound(activity)).into())
}

fn is_not_found(err: &anyhow::Error) -> bool {
  err
    .downcast_ref::<StoreError>()
    .is_some_and(StoreError::is_not_found)
}

/// Accept JSON, falling back to a plain string for bare words.
fn parse_value(raw: &str) -> serde_json::Value {
  serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_owned()))
}

fn decode_details(field_type: &FieldType, raw: &str) -> Result<FieldDetails> {
  let payload = serde_json::from_str(raw).context("details must be JSON")?;
  Ok(FieldDetails::decode(field_type, payload)?)
}

/// The type the `--details` payload of `set` is meant for: the new type when
/// setting `type`, the field's current type otherwise.
fn type_for_details(activity: &Activity, set: &FieldSet) -> Result<FieldType> {
  let path = FieldPath::parse(&set.path)?;
  if path.leaf == Some(FieldLeaf::Type) {
    let tag = set.value.as_str().context("type must be a string")?;
    return Ok(FieldType::from(tag));
  }
  activity
    .fields
    .get(path.position)
    .map(|f| f.field_type.clone())
    .with_context(|| format!("no field at position {}", path.position))
}

fn print_json(value: &impl Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
