//! Statistics reporting.

use console::style;

use crate::download::RunStats;
use crate::fs::format_size;

/// Print totals for a batch of requests.
pub fn print_run_stats(stats: &RunStats) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Run Statistics:").bold());
    println!("  Requests:    {}", stats.total());
    println!("  Downloaded:  {}", style(stats.primary).green());
    if stats.substitute > 0 {
        println!(
            "  Substitutes: {}",
            style(stats.substitute).yellow()
        );
    }
    if stats.failed > 0 {
        println!("  Failed:      {}", style(stats.failed).red());
    }
    println!("  Written:     {}", format_size(stats.bytes_written));
    println!("{}", style("═".repeat(50)).dim());
}

