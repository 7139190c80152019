//! ats-scorer: resume to job description ATS match scoring

use ats_scorer::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use ats_scorer::config::Config;
use ats_scorer::error::{AtsScorerError, Result};
use ats_scorer::output::formatter::formatter_for;
use ats_scorer::processing::embedding_manager::EmbeddingModelManager;
use ats_scorer::Scorer;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, config_path).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: PathBuf) -> Result<()> {
    match command {
        Commands::Score { resume, job, output, detailed } => {
            cli::validate_file_extension(&resume, &["pdf"])
                .map_err(|e| AtsScorerError::InvalidInput(format!("Resume file: {}", e)))?;
            cli::validate_file_extension(&job, &["pdf"])
                .map_err(|e| AtsScorerError::InvalidInput(format!("Job description file: {}", e)))?;

            let format = match output {
                Some(format) => cli::parse_output_format(&format).map_err(AtsScorerError::InvalidInput)?,
                None => config.output.format,
            };

            info!("Scoring {} against {}", resume.display(), job.display());
            let scorer = Scorer::from_config(&config)?;
            let report = scorer.score(&resume, &job).await?;

            let formatter = formatter_for(format, config.output.color_output, detailed);
            println!("{}", formatter.format_report(&report)?);
        }

        Commands::Models { action } => {
            let manager = EmbeddingModelManager::new(config.models_dir().clone());
            match action {
                ModelAction::List => {
                    println!("Embedding models:\n");
                    for (id, info) in manager.list_available_models() {
                        let status = if manager.is_model_downloaded(id).await {
                            "downloaded"
                        } else {
                            "available"
                        };
                        let marker = if *id == config.embedding.model_id { " (default)" } else { "" };
                        println!(
                            "  {}{} [{}] - {} ({} dims, ~{} MB, {:?})",
                            id, marker, status, info.repo_id, info.dimensions, info.size_mb, info.backend
                        );
                        println!("    {}", info.description);
                    }
                }
                ModelAction::Download { model, revision } => {
                    let path = manager.download_model(&model, &revision).await?;
                    println!("Model '{}' downloaded to {}", model, path.display());
                }
            }
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                let content = toml::to_string_pretty(&config)
                    .map_err(|e| AtsScorerError::Configuration(e.to_string()))?;
                println!("{}", content);
            }
            Some(ConfigAction::Reset) => {
                Config::default().save_to(&config_path)?;
                println!("Configuration reset: {}", config_path.display());
            }
            Some(ConfigAction::Path) => {
                println!("{}", config_path.display());
            }
        },
    }

    Ok(())
}
