use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use sitewalk_core::crawl::{CrawlOptions, build_crawler, execute_crawl, outcome_description};
use sitewalk_core::report::{ReportFormat, render_report, save_report};
use sitewalk_scanner::normalize::{ensure_scheme, normalize_domain};
use sitewalk_scanner::{Crawler, PageRecord};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Everything the `crawl` subcommand was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlArgs {
    pub url: String,
    pub depth: usize,
    pub threads: usize,
    pub timeout_secs: u64,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub search: Option<String>,
    pub domain: Option<String>,
}

impl CrawlArgs {
    pub fn from_matches(sub_matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = sub_matches
            .get_one::<String>("url")
            .ok_or_else(|| anyhow!("--url must be provided"))?;
        if url.trim().is_empty() {
            return Err(anyhow!("--url must not be empty"));
        }
        let format_name = sub_matches
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("text");
        let format = ReportFormat::from_str(format_name)
            .ok_or_else(|| anyhow!("Unknown report format '{}'", format_name))?;

        Ok(Self {
            url: url.trim().to_string(),
            depth: sub_matches.get_one::<usize>("depth").copied().unwrap_or(3),
            threads: sub_matches.get_one::<usize>("threads").copied().unwrap_or(10),
            timeout_secs: sub_matches.get_one::<u64>("timeout").copied().unwrap_or(15),
            format,
            output: sub_matches.get_one::<PathBuf>("output").cloned(),
            search: sub_matches.get_one::<String>("search").cloned(),
            domain: sub_matches.get_one::<String>("domain").cloned(),
        })
    }
}

/// Default log filter for a `-v` count. `RUST_LOG` wins when set.
pub fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbosity)));
    // Logs go to stderr so reports on stdout stay pipeable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Stored crawl results, narrowed to the `--search` / `--domain` selection.
pub async fn select_pages(
    crawler: &Crawler,
    search: Option<&str>,
    domain: Option<&str>,
) -> Vec<PageRecord> {
    match (search, domain) {
        (Some(query), Some(domain)) => {
            let wanted = normalize_domain(domain);
            crawler
                .search_websites(query)
                .await
                .into_iter()
                .filter(|page| page.normalized_domain() == wanted)
                .collect()
        }
        (Some(query), None) => crawler.search_websites(query).await,
        (None, Some(domain)) => crawler.filter_by_domain(domain).await,
        (None, None) => crawler.get_results().await,
    }
}

/// Writes the report to `output`, or stdout when no path was given.
pub fn write_output(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => save_report(content, path)
            .with_context(|| format!("Failed to write report to {}", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let args = CrawlArgs::from_matches(sub_matches)?;

    let options = CrawlOptions {
        url: ensure_scheme(&args.url),
        max_depth: args.depth,
        workers: args.threads,
        timeout_secs: args.timeout_secs,
        show_progress_bars: !quiet,
    };
    let crawler = build_crawler(&options).context("Failed to build HTTP client")?;

    if !quiet {
        eprintln!("{} Crawling {}", "→".blue(), options.url.bright_white());
        eprintln!("Workers: {}", options.workers);
        eprintln!("Max depth: {}\n", options.max_depth);
    }

    // Ctrl-C lets in-flight pages finish, then the crawl stops at the level boundary
    let stopper = crawler.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping crawl");
            stopper.stop_scraping();
        }
    });

    let mut run = execute_crawl(&crawler, &options, None).await;
    interrupt.abort();

    if args.search.is_some() || args.domain.is_some() {
        run.pages = select_pages(&crawler, args.search.as_deref(), args.domain.as_deref()).await;
    }

    if !quiet {
        eprintln!(
            "\n{} Crawl complete: {} pages ({})\n",
            "✓".green().bold(),
            run.pages.len(),
            outcome_description(run.outcome)
        );
    }

    let report = render_report(&run, args.format).context("Failed to render report")?;
    write_output(&report, args.output.as_deref())?;

    if let Some(ref path) = args.output
        && !quiet
    {
        eprintln!(
            "{} Report saved to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }

    Ok(())
}
