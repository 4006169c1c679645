mod command;
mod config;
mod db;
mod llm;
mod logging;
mod vector;

use anyhow::Result;
use std::path::PathBuf;

use command::{CommandError, CommandProcessor, LlmIntentClassifier};
use config::Config;
use llm::LlmClient;
use vector::SqliteVectorIndex;

enum Mode {
    Process(String),
    History,
    Delete(i64),
}

struct Args {
    config_path: Option<PathBuf>,
    user_id: i64,
    mode: Mode,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut user_id = 1;
    let mut history = false;
    let mut delete_id = None;
    let mut text_parts: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("picshelf {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user_id = match args[i + 1].parse() {
                        Ok(id) => id,
                        Err(_) => {
                            eprintln!("Error: --user requires a numeric id");
                            std::process::exit(1);
                        }
                    };
                    i += 1;
                } else {
                    eprintln!("Error: --user requires an id argument");
                    std::process::exit(1);
                }
            }
            "--history" | "-H" => {
                history = true;
            }
            "--delete" | "-d" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse() {
                        Ok(id) => delete_id = Some(id),
                        Err(_) => {
                            eprintln!("Error: --delete requires a numeric command id");
                            std::process::exit(1);
                        }
                    }
                    i += 1;
                } else {
                    eprintln!("Error: --delete requires a command id");
                    std::process::exit(1);
                }
            }
            other => {
                text_parts.push(other.to_string());
            }
        }
        i += 1;
    }

    let mode = if history {
        Mode::History
    } else if let Some(id) = delete_id {
        Mode::Delete(id)
    } else {
        Mode::Process(text_parts.join(" "))
    };

    Args {
        config_path,
        user_id,
        mode,
    }
}

fn print_help() {
    println!(
        r#"picshelf - photo library backend with natural-language commands

USAGE:
    picshelf [OPTIONS] COMMAND_TEXT...
    picshelf [OPTIONS] --history

OPTIONS:
    --config, -c PATH   Path to config file
    --user, -u ID       Acting user id (default: 1)
    --history, -H       Show recent command history
    --delete, -d ID     Delete a command from the history
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PICSHELF_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/picshelf/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    // Load configuration
    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize database
    let db = db::Database::open(&config.db_path)?;
    db.initialize()?;

    match args.mode {
        Mode::History => {
            let total = db.count_commands(args.user_id)?;
            let commands = db.list_commands(args.user_id, config.commands.history_limit, 0)?;
            println!("{} commands ({} shown)", total, commands.len());
            for record in commands {
                println!(
                    "[{}] #{} {} intent={} \"{}\"",
                    record.result_status, record.id, record.created_at, record.intent, record.text
                );
            }
        }
        Mode::Delete(id) => {
            if db.delete_command(args.user_id, id)? {
                println!("deleted command #{}", id);
            } else {
                eprintln!("Error: command #{} not found", id);
                std::process::exit(1);
            }
        }
        Mode::Process(text) => {
            let client = LlmClient::from_config(&config.llm);
            let classifier = LlmIntentClassifier::new(client);
            let index = SqliteVectorIndex::open(&config.db_path, config.commands.search_limit)?;
            let processor = CommandProcessor::new(db, Box::new(classifier), Box::new(index));

            match processor.process(args.user_id, &text) {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                Err(CommandError::EmptyCommand) => {
                    eprintln!("Error: no command text given");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
