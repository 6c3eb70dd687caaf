//! postgrab - CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use postgrab::{
    browser::ChromeLauncher,
    cli::Args,
    config::{validate_config, Config},
    download::{Downloader, RunStats},
    error::{exit_codes, Error, Result},
    media::{DownloadManifest, DownloadRequest},
    output::{
        create_spinner, print_banner, print_config_summary, print_error, print_info,
        print_manifest, print_run_stats, print_success, print_warning,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::TomlParse(_)
                | Error::InvalidUrl(_)
                | Error::UnsupportedPlatform(_) => ExitCode::from(exit_codes::CONFIG_ERROR as u8),
                Error::Fallback { .. } | Error::Fetch(_) => {
                    ExitCode::from(exit_codes::DOWNLOAD_ERROR as u8)
                }
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if args.init_config {
        Config::default().save(&args.config)?;
        print_success(&format!("Wrote default configuration to {}", args.config.display()));
        return Ok(exit_codes::SUCCESS);
    }

    if !args.json {
        print_banner();
    }

    // Load configuration
    let mut config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        if !args.json {
            print_warning(&format!(
                "Configuration file not found: {}",
                args.config.display()
            ));
            print_info("Using default configuration with CLI arguments");
        }
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;

    let requests = build_requests(&args)?;

    if !args.json {
        print_config_summary(
            requests.len(),
            config.browser.pool_size,
            &config.download_directory().display().to_string(),
        );
    }

    let downloader = Downloader::new(ChromeLauncher::new(config.browser.clone()), &config)?;

    let spinner = (!args.json).then(|| {
        create_spinner(&format!("Downloading {} post(s)...", requests.len()))
    });
    let results = downloader.download_all(requests.clone()).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    downloader.shutdown().await;

    let stats = RunStats::from_results(&results);

    if args.json {
        print_json(&requests, &results)?;
    } else {
        for (request, result) in requests.iter().zip(&results) {
            match result {
                Ok(manifest) => print_manifest(request.url(), manifest),
                Err(e) => print_error(&format!("{}: {}", request.url(), e)),
            }
        }
        print_run_stats(&stats);
    }

    Ok(if stats.failed == 0 {
        exit_codes::SUCCESS
    } else if stats.succeeded() == 0 {
        exit_codes::DOWNLOAD_ERROR
    } else {
        exit_codes::SOME_REQUESTS_FAILED
    })
}

/// Turn the URL arguments into requests, applying any `--type` override.
fn build_requests(args: &Args) -> Result<Vec<DownloadRequest>> {
    let content_type = args.content_type_override();

    args.urls
        .iter()
        .map(|url| {
            let request = DownloadRequest::from_url(url)?;
            Ok(match content_type {
                Some(ct) => request.with_content_type(ct),
                None => request,
            })
        })
        .collect()
}

/// Print one JSON object per request, in request order.
fn print_json(requests: &[DownloadRequest], results: &[Result<DownloadManifest>]) -> Result<()> {
    let entries: Vec<_> = requests
        .iter()
        .zip(results)
        .map(|(request, result)| match result {
            Ok(manifest) => json!({ "url": request.url(), "manifest": manifest }),
            Err(e) => json!({ "url": request.url(), "success": false, "error": e.to_string() }),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
