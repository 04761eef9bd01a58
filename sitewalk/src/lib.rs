pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{CrawlArgs, handle_crawl, init_tracing, select_pages, write_output};
