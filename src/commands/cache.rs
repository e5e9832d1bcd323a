use anyhow::Result;
use clap::Subcommand;

use masothue::cache::ResultCache;
use masothue::config::Config;
use masothue::utils::format_bytes;

#[derive(Subcommand)]
pub enum CacheAction {
    /// Drop expired and corrupt entries, then the oldest until within budget
    Prune,

    /// Delete every entry
    Clear,

    /// Show entry count and size
    Stats,
}

pub async fn cache(config: &Config, action: CacheAction) -> Result<()> {
    let cache = ResultCache::new(config.cache_config());
    let dir = config.cache.dir.display();

    if !cache.is_enabled() {
        println!("Cache is disabled (cache.enabled = false)");
        return Ok(());
    }

    match action {
        CacheAction::Prune => {
            let stats = cache.prune().await;
            println!("Pruned cache at {dir}");
            println!(
                "  Deleted: {} entries ({})",
                stats.deleted_count,
                format_bytes(stats.freed_bytes)
            );
            println!(
                "  Remaining: {} entries ({})",
                stats.remaining_count,
                format_bytes(stats.remaining_bytes)
            );
        }
        CacheAction::Clear => {
            let removed = cache.clear().await;
            println!("Removed {removed} entries from {dir}");
        }
        CacheAction::Stats => {
            let stats = cache.stats().await?;
            println!("Cache directory: {dir}");
            println!("  Entries: {}", stats.entry_count);
            println!(
                "  Size: {} of {}",
                format_bytes(stats.total_bytes),
                format_bytes(cache.config().max_size_bytes)
            );
        }
    }
    Ok(())
}
