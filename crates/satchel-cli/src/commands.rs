use anyhow::Context;
use colored::Colorize;
use satchel_store::{Codec, FileModelStore, ModelStore, StoredModel};
use satchel_types::TypeKey;
use serde_json::{json, Value};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = FileModelStore::open(&cli.dir, cli.namespace.as_str())
        .with_context(|| format!("opening {}", cli.dir.display()))?;
    tracing::debug!(path = %store.path().display(), "opened session document");
    match cli.command {
        Command::List => cmd_list(&store, cli.format),
        Command::Show(args) => cmd_show(&store, &args.key, cli.format),
        Command::Remove(args) => cmd_remove(&store, &args.key, cli.format),
        Command::Wipe => cmd_wipe(&store, cli.format),
    }
}

fn parse_key(raw: &str) -> anyhow::Result<TypeKey> {
    raw.parse::<TypeKey>()
        .with_context(|| format!("invalid type key {raw:?}"))
}

/// Render a stored payload for display: JSON payloads as a value, binary
/// payloads as a hex string.
fn render_payload(model: &StoredModel) -> anyhow::Result<Value> {
    match model.codec {
        Codec::Json => serde_json::from_slice(&model.data).context("payload is not valid JSON"),
        Codec::Bincode => Ok(Value::String(hex::encode(&model.data))),
    }
}

fn cmd_list(store: &FileModelStore, format: OutputFormat) -> anyhow::Result<()> {
    let entries = store.entries()?;
    match format {
        OutputFormat::Json => {
            let rows: Vec<Value> = entries
                .iter()
                .map(|(key, entry)| {
                    json!({
                        "key": key.as_str(),
                        "codec": entry.codec,
                        "size": entry.size(),
                        "digest": entry.digest,
                        "written_at": entry.written_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No models in {}.", store.namespace().bold());
                return Ok(());
            }
            println!("Namespace {} ({} models)", store.namespace().bold(), entries.len());
            for (key, entry) in &entries {
                println!(
                    "  {:<24} {:<8} {:>8} B  {}",
                    key.as_str().yellow(),
                    entry.codec.to_string().cyan(),
                    entry.size(),
                    entry.written_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                );
            }
        }
    }
    Ok(())
}

fn cmd_show(store: &FileModelStore, raw: &str, format: OutputFormat) -> anyhow::Result<()> {
    let key = parse_key(raw)?;
    let Some(model) = store.get(&key)? else {
        anyhow::bail!("no model stored under {key} in {}", store.namespace());
    };
    let payload = render_payload(&model)?;
    match format {
        OutputFormat::Json => {
            let out = json!({ "key": key.as_str(), "codec": model.codec, "value": payload });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{} ({}, {} B)", key.as_str().yellow().bold(), model.codec, model.size());
            match payload {
                Value::String(hex) if model.codec == Codec::Bincode => println!("{hex}"),
                value => println!("{}", serde_json::to_string_pretty(&value)?),
            }
        }
    }
    Ok(())
}

fn cmd_remove(store: &FileModelStore, raw: &str, format: OutputFormat) -> anyhow::Result<()> {
    let key = parse_key(raw)?;
    let existed = store.get(&key)?.is_some();
    if existed {
        store.set(&key, None)?;
    }
    match format {
        OutputFormat::Json => println!("{}", json!({ "key": key.as_str(), "removed": existed })),
        OutputFormat::Text if existed => println!("{} Removed {}", "✓".green(), key.as_str().yellow()),
        OutputFormat::Text => println!("Nothing stored under {}.", key.as_str().yellow()),
    }
    Ok(())
}

fn cmd_wipe(store: &FileModelStore, format: OutputFormat) -> anyhow::Result<()> {
    let count = store.entries()?.len();
    store.clear()?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "namespace": store.namespace(), "removed": count })),
        OutputFormat::Text => println!(
            "{} Wiped {} ({count} models)",
            "✓".green().bold(),
            store.namespace().bold()
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn seeded() -> (TempDir, FileModelStore) {
        let dir = TempDir::new().unwrap();
        let store = FileModelStore::open(dir.path(), "web").unwrap();
        let cart = StoredModel::encode(Codec::Json, &json!({ "items": ["apple"] })).unwrap();
        let user = StoredModel::encode(Codec::Bincode, &7u32).unwrap();
        store.set(&"cart".parse().unwrap(), Some(cart)).unwrap();
        store.set(&"user".parse().unwrap(), Some(user)).unwrap();
        (dir, store)
    }

    fn run(dir: &TempDir, args: &[&str]) -> anyhow::Result<()> {
        let dir = dir.path().to_str().unwrap();
        let mut argv = vec!["satchel", "--dir", dir, "--namespace", "web"];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn json_payload_renders_as_value() {
        let model = StoredModel::encode(Codec::Json, &json!({ "n": 1 })).unwrap();
        assert_eq!(render_payload(&model).unwrap(), json!({ "n": 1 }));
    }

    #[test]
    fn bincode_payload_renders_as_hex() {
        let model = StoredModel::new(Codec::Bincode, vec![0x0a, 0xff]);
        assert_eq!(render_payload(&model).unwrap(), json!("0aff"));
    }

    #[test]
    fn list_and_show_read_without_writing() {
        let (dir, store) = seeded();
        run(&dir, &["list"]).unwrap();
        run(&dir, &["list", "--format", "json"]).unwrap();
        run(&dir, &["show", "cart"]).unwrap();
        run(&dir, &["show", "user", "--format", "json"]).unwrap();
        assert_eq!(store.entries().unwrap().len(), 2);
    }

    #[test]
    fn show_missing_key_fails() {
        let (dir, _store) = seeded();
        assert!(run(&dir, &["show", "ghost"]).is_err());
    }

    #[test]
    fn invalid_key_is_rejected() {
        let (dir, _store) = seeded();
        assert!(run(&dir, &["remove", "has space"]).is_err());
    }

    #[test]
    fn remove_deletes_one_entry() {
        let (dir, store) = seeded();
        run(&dir, &["remove", "cart"]).unwrap();
        let keys: Vec<_> = store.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["user".parse::<TypeKey>().unwrap()]);
        // Removing again is not an error.
        run(&dir, &["remove", "cart"]).unwrap();
    }

    #[test]
    fn wipe_removes_the_document() {
        let (dir, store) = seeded();
        run(&dir, &["wipe"]).unwrap();
        assert!(store.entries().unwrap().is_empty());
        assert!(!store.path().exists());
    }
}
