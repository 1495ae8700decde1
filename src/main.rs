use anyhow::Context;
use std::sync::Arc;

use droplift::engine::UploadEngine;
use droplift::events::{LogNotifier, LogTransport, MemoryClipboard};
use droplift::history::SqliteHistory;
use droplift::presenter::ResultPresenter;
use droplift::profiles::{JsonProfileStore, ProfileStore};
use droplift::settings::JsonSettings;
use droplift::uploader::UploaderRegistry;

const HISTORY_RETENTION_DAYS: i64 = 90;

fn print_usage() {
    eprintln!("Usage: droplift [--profile <id>] [--dir <remote-dir>] <file>...");
    eprintln!("       droplift --list-profiles");
}

struct CliArgs {
    files: Vec<String>,
    profile_id: Option<String>,
    target_directory: Option<String>,
    list_profiles: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        files: Vec::new(),
        profile_id: None,
        target_directory: None,
        list_profiles: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--profile" => {
                parsed.profile_id = Some(
                    iter.next()
                        .ok_or_else(|| "--profile needs a value".to_string())?
                        .to_string(),
                );
            }
            "--dir" => {
                parsed.target_directory = Some(
                    iter.next()
                        .ok_or_else(|| "--dir needs a value".to_string())?
                        .to_string(),
                );
            }
            "--list-profiles" => parsed.list_profiles = true,
            other if other.starts_with("--") => {
                return Err(format!("Unknown flag: {}", other));
            }
            file => parsed.files.push(file.to_string()),
        }
    }

    Ok(parsed)
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let profiles = Arc::new(JsonProfileStore::open_default().context("opening profile store")?);
    let settings = Arc::new(JsonSettings::open_default().context("opening settings")?);
    let history = Arc::new(
        SqliteHistory::open_default()
            .await
            .context("opening upload history")?,
    );

    if args.list_profiles {
        for profile in profiles.get_all() {
            let marker = if profile.is_default { "*" } else { " " };
            println!(
                "{} {}  {} ({})",
                marker, profile.id, profile.name, profile.uploader_name
            );
        }
        return Ok(());
    }

    if let Err(e) = history.cleanup_older_than(HISTORY_RETENTION_DAYS).await {
        log::warn!("History cleanup failed: {}", e);
    }

    let notifier = Arc::new(LogNotifier);
    let clipboard = Arc::new(MemoryClipboard::new());
    let presenter = ResultPresenter::new(notifier.clone(), clipboard);

    let engine = UploadEngine::new(
        profiles,
        Arc::new(UploaderRegistry::with_builtins()),
        history,
        Arc::new(LogTransport),
        notifier,
        settings,
        presenter,
    );

    engine
        .upload(
            args.files,
            args.profile_id.as_deref(),
            args.target_directory.as_deref(),
            false,
        )
        .await;

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw_args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    if args.files.is_empty() && !args.list_profiles {
        print_usage();
        std::process::exit(2);
    }

    log::info!("Starting droplift");

    if let Err(e) = run(args).await {
        log::error!("droplift failed: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_splits_flags_and_files() {
        let args = vec![
            "--profile".to_string(),
            "p1".to_string(),
            "a.png".to_string(),
            "b.png".to_string(),
        ];
        let parsed = parse_args(&args).unwrap();
        assert_eq!(parsed.profile_id.as_deref(), Some("p1"));
        assert_eq!(parsed.files, vec!["a.png", "b.png"]);
    }

    #[test]
    fn parse_args_rejects_unknown_flags() {
        let args = vec!["--nope".to_string()];
        assert!(parse_args(&args).is_err());
    }
}
