use std::env;
use std::path::PathBuf;

use epmforge_core::GenerationConfig;
use epmforge_generate::GenerationEngine;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("missing config path")?;
    let config_json = std::fs::read_to_string(&config_path)?;
    let config: GenerationConfig = serde_json::from_str(&config_json)?;

    let engine = GenerationEngine::new();
    let outcome = engine.run(&config)?;

    println!(
        "generated {} rows with {} issues",
        outcome.report.rows_generated,
        outcome.issues.len()
    );
    for row in outcome.rows().iter().take(5) {
        println!("{row}");
    }
    for issue in &outcome.issues {
        println!("issue: {issue}");
    }
    Ok(())
}
