//! Console output utilities.

use console::style;

use crate::media::DownloadManifest;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     postgrab                                          ║
║     Instagram & Facebook post media downloader        ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(request_count: usize, pool_size: usize, download_dir: &str) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Requests:  {}", request_count);
    println!("  Browsers:  {}", pool_size);
    println!("  Directory: {}", download_dir);
    println!();
}

/// Print the outcome of one download.
///
/// Substitute content is reported as a warning together with its note.
pub fn print_manifest(url: &str, manifest: &DownloadManifest) {
    let line = format!(
        "{} -> {} ({}, {})",
        url, manifest.local_filename, manifest.content_kind, manifest.size_label
    );
    match manifest.note {
        Some(ref note) => {
            print_warning(&line);
            println!("     {}", style(note).dim());
        }
        None => print_success(&line),
    }
}
