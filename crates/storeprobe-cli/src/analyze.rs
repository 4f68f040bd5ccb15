//! `analyze`, `classify` and `catalog` command handlers.

use storeprobe_core::SignalCatalog;
use storeprobe_scraper::{AnalysisOutcome, Analyzer, HttpFetcher, SiteOrigin};

pub(crate) async fn run_analyze(
    analyzer: &Analyzer<HttpFetcher>,
    domains: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let outcomes = analyzer.analyze_many(domains).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for outcome in &outcomes {
            print_summary(outcome);
        }
    }

    let failed = outcomes.iter().filter(|o| !o.success).count();
    if failed > 0 {
        tracing::warn!(failed, total = outcomes.len(), "some domains could not be analyzed");
    }
    Ok(())
}

fn print_summary(outcome: &AnalysisOutcome) {
    let platform = outcome.platform_id.as_deref().unwrap_or("unknown");
    if outcome.success {
        println!(
            "{}: {} products via {} [{}]",
            outcome.domain,
            outcome.products.len(),
            outcome.listing_url.as_deref().unwrap_or("-"),
            platform
        );
        for product in &outcome.products {
            println!(
                "  {:<10} {:>5.2}  {}",
                product.quality_score.to_string(),
                product.coverage_ratio,
                if product.title.is_empty() { &product.url } else { &product.title }
            );
        }
    } else {
        println!(
            "{}: failed [{}] {}",
            outcome.domain,
            platform,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    for warning in &outcome.warnings {
        println!("  warning: {warning}");
    }
}

/// Classifies the page at `url` (a bare domain means its home page).
pub(crate) async fn run_classify(
    analyzer: &Analyzer<HttpFetcher>,
    url: &str,
) -> anyhow::Result<()> {
    let target = if url.contains("://") {
        url.to_string()
    } else {
        SiteOrigin::parse(url)?.home_url()
    };

    let detection = analyzer.classify_page(&target).await?;
    match &detection.platform_id {
        Some(id) => println!(
            "{target}: {id} (score {}, {} confidence)",
            detection.score, detection.confidence
        ),
        None => println!("{target}: no platform detected"),
    }
    for signal in &detection.matched_signals {
        println!("  +{:<3} {}", signal.weight, signal.description);
    }
    Ok(())
}

pub(crate) fn print_catalog(catalog: &SignalCatalog) {
    println!("signal catalog v{}", catalog.version());
    println!(
        "{:<22}{:<12}{:<10}{:<8}{}",
        "ID", "THRESHOLD", "SIGNALS", "PATHS", "NAME"
    );
    for profile in catalog.platforms() {
        println!(
            "{:<22}{:<12}{:<10}{:<8}{}",
            profile.id,
            profile.confidence_threshold,
            profile.signals.len(),
            profile.listing_paths.len(),
            profile.name()
        );
    }
}
