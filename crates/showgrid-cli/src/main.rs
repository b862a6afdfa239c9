use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use showgrid::format::{TaskReport, TextOptions, format_table, format_text_with};
use showgrid::orchestrator::OrchestratorConfig;
use showgrid::utils::TaskSpec;
use showgrid::{
    CatalogSource, Orchestrator, RunEvent, Session, Task, TaskStatus, WebCatalog,
    WebPricingFetcher,
};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "showgrid")]
#[command(about = "A Broadway Inbound group pricing scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum ListFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
enum ScrapeFormat {
    Text,
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the shows that have published group pricing, with their bookable date range
    Shows {
        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: ListFormat,
    },
    /// Scrape the pricing grid of one or more shows over date ranges
    Scrape {
        #[arg(
            short = 't',
            long = "task",
            value_name = "SHOW:START[:END]",
            required = true,
            help = "Task to run, e.g. wicked:05/01/2024:05/07/2024 (repeatable)",
            value_parser = |s: &str| s.parse::<TaskSpec>(),
        )]
        tasks: Vec<TaskSpec>,

        #[arg(
            long,
            default_value_t = 5,
            help = "Maximum number of pricing grids fetched at the same time",
            value_parser = clap::value_parser!(u16).range(1..)
        )]
        max_concurrency: u16,

        #[arg(
            long,
            value_name = "SECS",
            default_value_t = 60,
            help = "Give up on a single date after this many seconds",
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        timeout: u64,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: ScrapeFormat,

        #[arg(long, help = "Name the show and weekday in the email text header")]
        with_show_name: bool,

        #[arg(long, help = "Put each section of a combined label like 'Orchestra/Mezzanine' on its own line")]
        split_labels: bool,

        #[arg(long, help = "Drop repeated label and price lines")]
        dedupe: bool,
    },
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Done => "✅",
        TaskStatus::Failed => "❌",
        TaskStatus::Cancelled => "⏹",
        TaskStatus::Pending | TaskStatus::Running => "…",
    }
}

fn print_text(task: &Task, options: &TextOptions) {
    println!(
        "{} {} ({}) [{}]",
        status_icon(task.status()),
        task.show().name,
        task.range(),
        task.status()
    );
    for result in task.results() {
        println!();
        match &result.error {
            None => println!("{}", format_text_with(result, options)),
            Some(e) => println!("{}: {}", result.date, e),
        }
    }
    println!();
}

fn print_table(task: &Task) {
    println!(
        "{} {} ({}) [{}]",
        status_icon(task.status()),
        task.show().name,
        task.range(),
        task.status()
    );
    let rows = format_table(task);
    if rows.is_empty() {
        println!("  No pricing rows.");
    }
    for row in rows {
        println!("  {}  {:<40} ${:>8}", row.date, row.label, row.price.to_string());
    }
    for failed in task.failed_dates() {
        if let Some(e) = &failed.error {
            println!("  {}  {}", failed.date, e);
        }
    }
    println!();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let catalog = WebCatalog::new().unwrap_or_else(|e| {
        log::error!("Error creating catalog client: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::Shows { format } => {
            let shows = catalog.load_shows().await.unwrap_or_else(|e| {
                log::error!("Error loading shows: {}", e);
                process::exit(1);
            });

            match format {
                ListFormat::Json => serialize_json(&shows),
                ListFormat::Text => {
                    if shows.is_empty() {
                        println!("No shows with group pricing.");
                    } else {
                        for (i, show) in shows.iter().enumerate() {
                            println!("{:>3}. {}", i + 1, show);
                        }
                        println!("\nTotal: {}", shows.len());
                    }
                }
            }
        }

        Commands::Scrape {
            tasks,
            max_concurrency,
            timeout,
            format,
            with_show_name,
            split_labels,
            dedupe,
        } => {
            let mut session = Session::load(&catalog).await.unwrap_or_else(|e| {
                log::error!("Cannot create tasks, show catalog unavailable: {}", e);
                process::exit(1);
            });

            for spec in &tasks {
                if let Err(e) = session.add_spec(spec) {
                    log::error!("Invalid task '{}': {}", spec.show_id, e);
                    process::exit(1);
                }
            }

            let fetcher = WebPricingFetcher::new().unwrap_or_else(|e| {
                log::error!("Error creating pricing fetcher: {}", e);
                process::exit(1);
            });
            let config = OrchestratorConfig {
                max_concurrency: max_concurrency.into(),
                fetch_timeout: Duration::from_secs(timeout),
            };
            let (tx, mut rx) = mpsc::unbounded_channel();
            let orchestrator = Orchestrator::new(Arc::new(fetcher), config)
                .unwrap_or_else(|e| {
                    log::error!("Invalid settings: {}", e);
                    process::exit(1);
                })
                .with_events(tx);

            let token = orchestrator.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, finishing in-flight fetches...");
                    token.cancel();
                }
            });

            let total = session.tasks().len();
            let progress = tokio::spawn(async move {
                let mut finished = 0;
                while let Some(event) = rx.recv().await {
                    match event {
                        RunEvent::TaskStarted { task, dates } => {
                            log::debug!("Task {} started with {} date(s)", task, dates)
                        }
                        RunEvent::DateFinished { task, date, error } => match error {
                            Some(e) => log::debug!("Task {} {}: {}", task, date, e),
                            None => log::debug!("Task {} {}: ok", task, date),
                        },
                        RunEvent::TaskFinished { task, status } => {
                            finished += 1;
                            log::info!(
                                "Completed {}/{} tasks ({} {})",
                                finished,
                                total,
                                task,
                                status
                            );
                        }
                    }
                }
            });

            let finished = session.run(&orchestrator).await;
            drop(orchestrator);
            let _ = progress.await;

            let options = TextOptions {
                show_name: None,
                split_combined_labels: split_labels,
                dedupe,
            };

            match format {
                ScrapeFormat::Json => {
                    let reports: Vec<_> = finished
                        .iter()
                        .map(|task| {
                            let options = TextOptions {
                                show_name: with_show_name.then(|| task.show().name.clone()),
                                ..options.clone()
                            };
                            TaskReport::new(task, &options)
                        })
                        .collect();
                    serialize_json(&reports);
                }
                ScrapeFormat::Text => {
                    for task in finished {
                        let options = TextOptions {
                            show_name: with_show_name.then(|| task.show().name.clone()),
                            ..options.clone()
                        };
                        print_text(task, &options);
                    }
                }
                ScrapeFormat::Table => finished.iter().for_each(print_table),
            }

            if finished.iter().all(|t| t.status() != TaskStatus::Done) {
                process::exit(1);
            }
        }
    }
}
