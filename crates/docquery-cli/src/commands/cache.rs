//! Cache maintenance commands

use crate::app::{CacheAction, CacheArgs, OutputFormat};
use anyhow::Result;
use docquery_core::{ResponseCache, SqliteCacheStore};
use std::path::Path;
use std::time::Duration;

pub fn run(args: CacheArgs, db_path: &Path, format: OutputFormat) -> Result<()> {
    let cache = SqliteCacheStore::open(db_path)?;

    match args.action {
        CacheAction::Stats => {
            let stats = cache.stats()?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Cli => {
                    println!("Database:        {}", db_path.display());
                    println!("Entries:         {}", stats.total_entries);
                    println!("  Degraded:      {}", stats.degraded_entries);
                    println!("Token cost:      {}", stats.total_token_cost);
                    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                        println!("Oldest:          {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"));
                        println!("Newest:          {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
            }
        }
        CacheAction::Evict { older_than_secs } => {
            let removed = cache.evict_older_than(Duration::from_secs(older_than_secs))?;
            report(format, "evicted", removed)?;
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            report(format, "cleared", removed)?;
        }
    }
    Ok(())
}

fn report(format: OutputFormat, action: &str, count: usize) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "action": action, "count": count }))?
            );
        }
        OutputFormat::Cli => {
            println!("{} {} cache entries", capitalize(action), count);
        }
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
