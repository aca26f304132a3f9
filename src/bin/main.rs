use autoscrape::{CrawlOutcome, InputType};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "autoscrape")]
#[command(about = "Depth-first crawler that finds and scrapes search forms")]
#[command(version)]
struct Cli {
    /// Crawl config file
    config: PathBuf,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Directory for snapshots (overrides config)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Save screenshots alongside snapshots (overrides config)
    #[arg(long)]
    screenshots: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate config without crawling
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> autoscrape::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = autoscrape::Config::load(&cli.config)?;

    if cli.check {
        let crawl = &config.crawl;
        println!("Config valid: {}", cli.config.display());
        println!("  Target: {}", config.target.url);
        match crawl.max_depth {
            Some(depth) => println!("  Max depth: {}", depth),
            None => println!("  Max depth: unbounded"),
        }
        if crawl.form_depth == 0 {
            println!("  'Next' hops: unbounded");
        } else {
            println!("  'Next' hops: {}", crawl.form_depth);
        }
        match crawl.form_match {
            Some(ref m) => println!("  Form match: {:?}", m),
            None => println!("  Form match: none (crawl only)"),
        }
        let strategy = match crawl.input_type {
            Some(InputType::CharacterIteration) => "character_iteration",
            Some(InputType::FixedStrings) => "fixed_strings",
            Some(InputType::MultiManual) => "multi_manual",
            None => "none",
        };
        println!("  Input: {}", strategy);
        if let Some(ref dir) = crawl.output_dir {
            println!("  Output: {}", dir.display());
        }
        return Ok(());
    }

    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(output) = cli.output {
        config.crawl.output_dir = Some(output);
    }
    if cli.screenshots {
        config.crawl.save_screenshots = true;
    }

    println!("Crawling: {}", config.target.url);

    let mut crawler = autoscrape::Crawler::new(config.crawl.clone())?;
    let mut browser =
        autoscrape::EokaBrowser::launch(&config.browser, config.crawl.form_submit_wait).await?;
    let result = crawler.run(&mut browser, &config.target.url).await;
    browser.close().await?;
    let report = result?;

    println!();
    match report.outcome {
        CrawlOutcome::Scraped(done) => {
            println!("✓ Scraped form {}", done.form_index);
            println!("  Input plans: {}", done.plans);
        }
        CrawlOutcome::Exhausted => println!("✗ No matching form scraped"),
    }
    println!("  Pages: {}", report.pages_loaded);
    println!("  Snapshots: {}", report.snapshots_written);
    println!("  Duration: {}ms", report.duration_ms);

    if !report.scraped() {
        std::process::exit(1);
    }

    Ok(())
}
