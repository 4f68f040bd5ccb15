mod analyze;
mod kb;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use storeprobe_core::{AppConfig, SignalCatalog};
use storeprobe_scraper::{
    Analyzer, AnalyzerSettings, CrawlGuard, GuardPolicy, HttpFetcher, JsonFileBacklog,
    KnowledgeBase, KnowledgePolicy, TokioClock, ValidationThresholds,
};
use tracing_subscriber::EnvFilter;

use crate::kb::KbCommands;

#[derive(Debug, Parser)]
#[command(name = "storeprobe")]
#[command(about = "Detect storefront platforms and extract product content")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full analysis for one or more domains
    Analyze {
        #[arg(required = true)]
        domains: Vec<String>,
        /// Print outcomes as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Fetch one page and report the detected platform
    Classify { url: String },
    /// Inspect or reset the knowledge base
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },
    /// List the platform profiles in the signal catalog
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = storeprobe_core::load_app_config_from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let catalog = Arc::new(SignalCatalog::load_or_builtin(config.catalog_path.as_deref())?);

    match cli.command {
        Commands::Analyze { domains, json } => {
            let analyzer = build_analyzer(&config, catalog)?;
            analyze::run_analyze(&analyzer, &domains, json).await
        }
        Commands::Classify { url } => {
            let analyzer = build_analyzer(&config, catalog)?;
            analyze::run_classify(&analyzer, &url).await
        }
        Commands::Kb { command } => {
            let knowledge = open_knowledge(&config)?;
            kb::run_kb(&knowledge, command).await
        }
        Commands::Catalog => {
            analyze::print_catalog(&catalog);
            Ok(())
        }
    }
}

fn open_knowledge(config: &AppConfig) -> anyhow::Result<KnowledgeBase> {
    Ok(KnowledgeBase::open(
        config.knowledge_path.clone(),
        KnowledgePolicy::from(config),
    )?)
}

fn build_analyzer(
    config: &AppConfig,
    catalog: Arc<SignalCatalog>,
) -> anyhow::Result<Analyzer<HttpFetcher>> {
    let fetcher = HttpFetcher::from_config(config)?;
    let guard = CrawlGuard::new(GuardPolicy::from(config), Arc::new(TokioClock));
    let knowledge = Arc::new(open_knowledge(config)?);
    let backlog = Arc::new(JsonFileBacklog::new(config.backlog_path.clone()));

    tracing::debug!(
        env = ?config.env,
        knowledge = %config.knowledge_path.display(),
        backlog = %config.backlog_path.display(),
        "analyzer configured"
    );

    Ok(Analyzer::new(fetcher, catalog, guard, knowledge, backlog)
        .with_thresholds(ValidationThresholds::from(config))
        .with_settings(AnalyzerSettings::from(config)))
}

#[cfg(test)]
mod tests;
