use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde_json::Value;
use tracing::debug;

use rook_client::{StorageClient, TypedStorage};
use rook_model::{game_registry, Lobby, User};
use rook_registry::DomainObject;
use rook_remote::InMemoryRemoteStore;
use rook_types::Key;

use crate::cli::*;
use crate::config::CliConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let db = config.db_path(cli.db.as_deref());
    let store = Arc::new(load_snapshot(&db)?);
    let client = StorageClient::new(store.clone(), game_registry()?, config.client);

    let changed = match kind_of(&cli.command) {
        Kind::Users => execute::<User>(&client, &cli.command, cli.format).await?,
        Kind::Lobbies => execute::<Lobby>(&client, &cli.command, cli.format).await?,
    };
    if changed {
        save_snapshot(&store, &db)?;
    }
    Ok(())
}

fn kind_of(command: &Command) -> Kind {
    match command {
        Command::Register(args) | Command::Update(args) | Command::Set(args) => args.kind,
        Command::Get(args) => args.kind,
        Command::List(args) | Command::Keys(args) => args.kind,
        Command::Exists(args) | Command::Remove(args) => args.kind,
    }
}

/// Run one command against the collection of `T`. Returns whether the
/// store was modified.
async fn execute<T: DomainObject>(
    client: &StorageClient,
    command: &Command,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let storage = client.for_type::<T>()?;
    match command {
        Command::Register(args) => {
            let value = parse_record::<T>(client, &args.json).await?;
            storage.register_value(&value).await?;
            report(format, "Registered", &value.key());
            Ok(true)
        }
        Command::Update(args) => {
            let value = parse_record::<T>(client, &args.json).await?;
            storage.update_value(&value).await?;
            report(format, "Updated", &value.key());
            Ok(true)
        }
        Command::Set(args) => {
            let value = parse_record::<T>(client, &args.json).await?;
            storage.set_value(&value).await?;
            report(format, "Set", &value.key());
            Ok(true)
        }
        Command::Get(args) => {
            let keys = parse_keys(&args.keys)?;
            let values = storage.get_values(&keys).await?;
            print_records(client, format, &values)?;
            Ok(false)
        }
        Command::List(_) => {
            let values = storage.get_all_values().await?;
            print_records(client, format, &values)?;
            Ok(false)
        }
        Command::Keys(_) => {
            let keys = storage.get_all_keys().await?;
            match format {
                OutputFormat::Json => {
                    let keys: Vec<&str> = keys.iter().map(Key::as_str).collect();
                    println!("{}", serde_json::to_string_pretty(&keys)?);
                }
                OutputFormat::Text => {
                    for key in &keys {
                        println!("{}", key.as_str().yellow());
                    }
                }
            }
            Ok(false)
        }
        Command::Exists(args) => {
            let exists = storage.key_exists(&Key::new(args.key.as_str())?).await?;
            match format {
                OutputFormat::Json => println!("{exists}"),
                OutputFormat::Text if exists => println!("{}", "true".green()),
                OutputFormat::Text => println!("{}", "false".red()),
            }
            Ok(false)
        }
        Command::Remove(args) => {
            let key = Key::new(args.key.as_str())?;
            let removed = storage.remove_value(&key).await?;
            if removed {
                report(format, "Removed", &key);
            } else if format == OutputFormat::Text {
                println!("Nothing stored under {}", key.as_str().yellow());
            }
            Ok(removed)
        }
    }
}

/// Decode a JSON record into its persisted shape and convert it through
/// the registry.
async fn parse_record<T: DomainObject>(client: &StorageClient, json: &str) -> anyhow::Result<T> {
    let persisted: T::Persisted = serde_json::from_str(json)
        .with_context(|| format!("parsing {} record", T::DOMAIN_TYPE))?;
    Ok(client
        .registry()
        .convert_persisted_to_domain::<T, T::Persisted>(persisted)
        .await?)
}

fn parse_keys(keys: &[String]) -> anyhow::Result<Vec<Key>> {
    keys.iter()
        .map(|k| Key::new(k.as_str()).map_err(anyhow::Error::from))
        .collect()
}

fn report(format: OutputFormat, action: &str, key: &Key) {
    if format == OutputFormat::Text {
        println!("{} {} {}", "✓".green().bold(), action, key.as_str().yellow());
    }
}

fn print_records<T: DomainObject>(
    client: &StorageClient,
    format: OutputFormat,
    values: &[T],
) -> anyhow::Result<()> {
    let mut records = Vec::with_capacity(values.len());
    for value in values {
        records.push(client.registry().encode(value)?);
    }

    match format {
        OutputFormat::Json => {
            let values: Vec<Value> = records.into_iter().map(|r| r.into_value()).collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No {} records.", T::DOMAIN_TYPE);
            }
            for (value, record) in values.iter().zip(&records) {
                let fields: Vec<String> = record
                    .fields()
                    .iter()
                    .filter(|(name, _)| name.as_str() != "key")
                    .map(|(name, v)| match v {
                        Value::String(s) => format!("{}={}", name.dimmed(), s),
                        other => format!("{}={}", name.dimmed(), other),
                    })
                    .collect();
                println!("{}  {}", value.key().as_str().yellow().bold(), fields.join(" "));
            }
        }
    }
    Ok(())
}

fn load_snapshot(path: &Path) -> anyhow::Result<InMemoryRemoteStore> {
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot, starting empty");
        return Ok(InMemoryRemoteStore::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshot: Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    Ok(InMemoryRemoteStore::from_snapshot(snapshot)?)
}

/// Write the store to `path` through a temporary file in the same
/// directory, so a failed write leaves the old snapshot intact.
fn save_snapshot(store: &InMemoryRemoteStore, path: &Path) -> anyhow::Result<()> {
    let snapshot = store.snapshot()?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, &snapshot)?;
    tmp.persist(path)
        .with_context(|| format!("writing snapshot {}", path.display()))?;
    debug!(path = %path.display(), "snapshot saved");
    Ok(())
}
