use bookshelf::core::config;
use bookshelf::shell;
use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "bookshelf", about = "Terminal client for the bookshelf REST API")]
struct Args {
    /// API base URL, e.g. http://localhost:8000/api/v1/
    #[arg(short, long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to bookshelf.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("bookshelf.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    let resolved = config::resolve(&file_config, args.base_url.as_deref());

    log::info!("Bookshelf starting up against {}", resolved.base_url);

    shell::run(resolved).await
}
