use colored::Colorize;

pub mod crawl;
pub mod report;

/// Prints the banner to stderr so stdout carries nothing but the report.
pub fn print_banner() {
    let banner = r#"
         _ __                      ____
   _____(_) /____ _      ______ _/ / /__
  / ___/ / __/ _ \ | /| / / __ `/ / //_/
 (__  ) / /_/  __/ |/ |/ / /_/ / / ,<
/____/_/\__/\___/|__/|__/\__,_/_/_/|_|
"#;
    eprintln!("{}", banner.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "breadth-first site crawler".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
