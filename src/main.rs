use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{TimeZone, Utc};
use dotenvy::dotenv;
use tracing::info;

use photo_studio::config::CONFIG;
use photo_studio::db::Database;
use photo_studio::llm::{GatewayClient, ImageData};
use photo_studio::studio::types::MAX_IMAGE_COUNT;
use photo_studio::studio::{compile_request, History, Session, Studio};
use photo_studio::utils::logging::init_logging;

const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Prompt {
        session: PathBuf,
    },
    Generate {
        session: PathBuf,
        count: Option<u32>,
        out_dir: PathBuf,
    },
    History {
        limit: usize,
    },
    ClearHistory,
    Retouch {
        image: PathBuf,
        mask: Option<PathBuf>,
        out: Option<PathBuf>,
    },
}

fn usage() -> &'static str {
    "Usage: photo-studio <command>\n\
     \x20 prompt --session <file>\n\
     \x20 generate --session <file> [--count <n>] [--out-dir <dir>]\n\
     \x20 history [--limit <n>]\n\
     \x20 clear-history\n\
     \x20 retouch --image <file> [--mask <file>] [--out <file>]"
}

fn take_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str> {
    *index += 1;
    args.get(*index)
        .map(|value| value.as_str())
        .ok_or_else(|| anyhow!("Missing value for {flag}"))
}

fn parse_args(args: &[String]) -> Result<CliCommand> {
    let command = args.get(1).map(|value| value.as_str());
    let mut session: Option<PathBuf> = None;
    let mut count: Option<u32> = None;
    let mut out_dir = PathBuf::from("output");
    let mut limit = DEFAULT_HISTORY_LIMIT;
    let mut image: Option<PathBuf> = None;
    let mut mask: Option<PathBuf> = None;
    let mut out: Option<PathBuf> = None;

    let mut index = 2;
    while index < args.len() {
        match args[index].as_str() {
            "--session" => {
                session = Some(PathBuf::from(take_value(args, &mut index, "--session")?));
            }
            "--count" => {
                let value = take_value(args, &mut index, "--count")?;
                count = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| anyhow!("Invalid --count value: {value}"))?
                        .clamp(1, MAX_IMAGE_COUNT),
                );
            }
            "--out-dir" => {
                out_dir = PathBuf::from(take_value(args, &mut index, "--out-dir")?);
            }
            "--limit" => {
                let value = take_value(args, &mut index, "--limit")?;
                limit = value
                    .parse::<usize>()
                    .map_err(|_| anyhow!("Invalid --limit value: {value}"))?;
            }
            "--image" => {
                image = Some(PathBuf::from(take_value(args, &mut index, "--image")?));
            }
            "--mask" => {
                mask = Some(PathBuf::from(take_value(args, &mut index, "--mask")?));
            }
            "--out" => {
                out = Some(PathBuf::from(take_value(args, &mut index, "--out")?));
            }
            "--help" | "-h" => {
                return Err(anyhow!(usage()));
            }
            other => {
                return Err(anyhow!("Unknown argument: {other}\n{}", usage()));
            }
        }
        index += 1;
    }

    match command {
        Some("prompt") => Ok(CliCommand::Prompt {
            session: session.ok_or_else(|| anyhow!("--session is required"))?,
        }),
        Some("generate") => Ok(CliCommand::Generate {
            session: session.ok_or_else(|| anyhow!("--session is required"))?,
            count,
            out_dir,
        }),
        Some("history") => Ok(CliCommand::History { limit }),
        Some("clear-history") => Ok(CliCommand::ClearHistory),
        Some("retouch") => Ok(CliCommand::Retouch {
            image: image.ok_or_else(|| anyhow!("--image is required"))?,
            mask,
            out,
        }),
        Some(other) => Err(anyhow!("Unknown command: {other}\n{}", usage())),
        None => Err(anyhow!(usage())),
    }
}

async fn load_session(path: &Path) -> Result<Session> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read session file {}", path.display()))?;
    let session: Session = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid session file {}", path.display()))?;
    Ok(session)
}

async fn read_image(path: &Path) -> Result<ImageData> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(ImageData::from_bytes(&bytes))
}

/// Writes a data URL image to `path`. Remote URLs are printed instead.
async fn write_image(image: &ImageData, path: &Path) -> Result<()> {
    let Some(bytes) = image.decode() else {
        println!("{}", image.as_str());
        return Ok(());
    };
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

async fn open_studio(session: Session) -> Result<Studio<GatewayClient, Database>> {
    let client = GatewayClient::from_config()?;
    let db = Database::init(&CONFIG.database_url).await?;
    Ok(Studio::open_with_session(client, db, session).await)
}

async fn run_prompt(session: &Path) -> Result<()> {
    let session = load_session(session).await?;
    let request = compile_request(session.characters(), session.settings());
    println!("{}", request.prompt);
    println!();
    println!(
        "Reference images: {} (model: {})",
        request.reference_images.len(),
        request.model
    );
    Ok(())
}

async fn run_generate(session: &Path, count: Option<u32>, out_dir: &Path) -> Result<()> {
    let mut session = load_session(session).await?;
    if count.is_some() {
        session.update_settings(|settings| settings.image_count = count);
    }

    let mut studio = open_studio(session).await?;
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let outcomes = studio.generate().await;
    let mut failures = 0;
    for outcome in &outcomes {
        match outcome {
            Ok(image) => {
                let path = out_dir.join(format!(
                    "{}.{}",
                    image.id,
                    image.image_data.file_extension()
                ));
                write_image(&image.image_data, &path).await?;
            }
            Err(err) => {
                failures += 1;
                eprintln!("Generation failed: {}", err.user_message());
            }
        }
    }

    if failures == outcomes.len() {
        return Err(anyhow!("All {} generation request(s) failed", failures));
    }
    Ok(())
}

async fn run_history(limit: usize) -> Result<()> {
    let db = Database::init(&CONFIG.database_url).await?;
    let history = History::load(&db).await;
    if history.is_empty() {
        println!("No generations yet.");
        return Ok(());
    }

    for entry in history.entries().iter().take(limit) {
        let created = Utc
            .timestamp_millis_opt(entry.timestamp)
            .single()
            .map(|time| time.to_rfc3339())
            .unwrap_or_else(|| entry.timestamp.to_string());
        let summary: String = entry
            .prompt
            .rsplit("\n\n")
            .next()
            .unwrap_or_default()
            .chars()
            .take(80)
            .collect();
        println!(
            "{}  {}  {} character(s)  {}",
            entry.id,
            created,
            entry.characters.len(),
            summary
        );
    }
    Ok(())
}

async fn run_clear_history() -> Result<()> {
    let db = Database::init(&CONFIG.database_url).await?;
    let mut history = History::load(&db).await;
    let removed = history.len();
    history.clear(&db).await?;
    info!("Cleared {} history entr(ies)", removed);
    println!("Cleared {removed} history entr(ies).");
    Ok(())
}

async fn run_retouch(image: &Path, mask: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let source = read_image(image).await?;
    let mask = match mask {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };

    let studio = open_studio(Session::new()).await?;
    let retouched = studio
        .retouch(&source, mask.as_ref())
        .await
        .map_err(|err| anyhow!(err.user_message()))?;

    let path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("retouched.{}", retouched.file_extension())));
    write_image(&retouched, &path).await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;
    let _guards = init_logging();

    match command {
        CliCommand::Prompt { session } => run_prompt(&session).await,
        CliCommand::Generate {
            session,
            count,
            out_dir,
        } => run_generate(&session, count, &out_dir).await,
        CliCommand::History { limit } => run_history(limit).await,
        CliCommand::ClearHistory => run_clear_history().await,
        CliCommand::Retouch { image, mask, out } => {
            run_retouch(&image, mask.as_deref(), out.as_deref()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("photo-studio")
            .chain(values.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn parses_generate_with_options() {
        let command =
            parse_args(&args(&["generate", "--session", "s.json", "--count", "0", "--out-dir", "out"]))
                .unwrap();
        assert_eq!(
            command,
            CliCommand::Generate {
                session: PathBuf::from("s.json"),
                count: Some(1),
                out_dir: PathBuf::from("out"),
            }
        );
    }

    #[test]
    fn required_flags_are_enforced() {
        let err = parse_args(&args(&["prompt"])).unwrap_err();
        assert_eq!(err.to_string(), "--session is required");
        let err = parse_args(&args(&["retouch", "--mask", "m.png"])).unwrap_err();
        assert_eq!(err.to_string(), "--image is required");
        assert!(parse_args(&args(&["history", "--limit"])).is_err());
    }

    #[test]
    fn unknown_command_shows_usage() {
        let err = parse_args(&args(&["paint"])).unwrap_err();
        assert!(err.to_string().contains("Usage: photo-studio"));
        assert_eq!(
            parse_args(&args(&["history"])).unwrap(),
            CliCommand::History {
                limit: DEFAULT_HISTORY_LIMIT
            }
        );
    }

    #[test]
    fn count_is_capped() {
        let command = parse_args(&args(&["generate", "--session", "s.json", "--count", "500"]))
            .unwrap();
        let CliCommand::Generate { count, .. } = command else {
            panic!("expected generate, got {command:?}");
        };
        assert_eq!(count, Some(MAX_IMAGE_COUNT));
        assert!(parse_args(&args(&["generate", "--session", "s.json", "--count", "-1"])).is_err());
    }
}
