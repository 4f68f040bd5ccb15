//! Knowledge-base maintenance commands.

use clap::Subcommand;
use storeprobe_scraper::{normalize_domain, KnowledgeBase};

#[derive(Debug, Subcommand)]
pub enum KbCommands {
    /// Print the stored record for a domain as JSON
    Show { domain: String },
    /// List every known domain with its confirmed patterns
    List,
    /// Clear confirmed patterns for a domain (counters and history are kept)
    Reset { domain: String },
}

pub(crate) async fn run_kb(knowledge: &KnowledgeBase, command: KbCommands) -> anyhow::Result<()> {
    match command {
        KbCommands::Show { domain } => {
            let record = knowledge
                .get(&domain)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no record for '{}'", normalize_domain(&domain)))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        KbCommands::List => {
            let records = knowledge.list().await?;
            if records.is_empty() {
                println!("knowledge base is empty");
                return Ok(());
            }
            println!(
                "{:<32}{:<16}{:<8}{:<8}{}",
                "DOMAIN", "PLATFORM", "OK", "FAIL", "LISTING"
            );
            for record in records {
                println!(
                    "{:<32}{:<16}{:<8}{:<8}{}",
                    record.domain,
                    record.platform_id.as_deref().unwrap_or("-"),
                    record.success_count,
                    record.failure_count,
                    record.confirmed_listing_pattern.as_deref().unwrap_or("-")
                );
            }
        }
        KbCommands::Reset { domain } => {
            let record = knowledge.cleanup(&domain).await?;
            tracing::info!(domain = %record.domain, "knowledge record reset");
            println!("reset {}", record.domain);
        }
    }
    Ok(())
}
