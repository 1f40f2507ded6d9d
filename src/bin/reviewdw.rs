use std::io::Write;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use reviewdw::{Activity, ActivityKind, AnalyticsService, ExportFormat, Timeframe};

#[derive(Parser)]
#[command(name = "reviewdw", about = "Usage analytics warehouse CLI")]
struct Cli {
    /// Database path (default: ~/.reviewdw/reviewdw.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an activity event
    Record {
        /// User the event belongs to
        #[arg(long)]
        user: String,
        /// Event kind: analysis, issue_detected, issue_resolved, review
        #[arg(long)]
        kind: String,
        /// Language of the analyzed code (analysis events)
        #[arg(long)]
        language: Option<String>,
        /// Issue category (issue_detected / issue_resolved events)
        #[arg(long)]
        issue_type: Option<String>,
        /// Duration in seconds (analysis / review events)
        #[arg(long)]
        duration: Option<f64>,
        /// Quality score in [0, 1] (analysis events)
        #[arg(long)]
        score: Option<f64>,
        /// Event timestamp, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Generate a usage report for a timeframe
    Report {
        /// Timeframe (e.g. 2025-Q1, 2025-01, 2025-W05, 30d, today)
        #[arg(default_value = "30d")]
        timeframe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export a report as json, csv, or text
    Export {
        /// Timeframe (e.g. 2025-Q1, 2025-01, 30d)
        #[arg(default_value = "30d")]
        timeframe: String,
        /// Output format: json, csv, text
        #[arg(long, default_value = "json")]
        format: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// List recently recorded activities
    Recent {
        /// Maximum results
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show warehouse status
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => reviewdw::Database::open_at(path).await?,
        None => reviewdw::Database::open().await?,
    };
    let svc = AnalyticsService::new(db);

    match cli.command {
        Commands::Record {
            user,
            kind,
            language,
            issue_type,
            duration,
            score,
            at,
        } => {
            let mut activity = Activity::new(ActivityKind::parse(&kind)?);
            activity.language = language;
            activity.issue_type = issue_type;
            activity.duration_seconds = duration;
            activity.quality_score = score;
            if let Some(ts) = at {
                let parsed = chrono::DateTime::parse_from_rfc3339(&ts)
                    .map_err(|e| anyhow::anyhow!("invalid --at timestamp: {e}"))?;
                activity = activity.at(parsed.with_timezone(&chrono::Utc));
            }
            svc.record_activity(&user, activity).await?;
            println!("Recorded.");
        }
        Commands::Report { timeframe, json } => {
            let tf = Timeframe::parse(&timeframe)?;
            let report = svc.generate_report(&tf).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Export {
            timeframe,
            format,
            output,
        } => {
            let tf = Timeframe::parse(&timeframe)?;
            let format = ExportFormat::from_str(&format)?;
            let bytes = svc
                .export_report(&tf, format)
                .await?
                .ok_or_else(|| anyhow::anyhow!("export failed: encoder produced no output"))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)?;
                    eprintln!("Wrote {} bytes to {path}", bytes.len());
                }
                None => std::io::stdout().write_all(&bytes)?,
            }
        }
        Commands::Recent { limit, json } => {
            let rows = svc.recent_activities(limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No activities recorded.");
            } else {
                for row in rows {
                    let detail = row
                        .language
                        .as_deref()
                        .or(row.issue_type.as_deref())
                        .unwrap_or("");
                    println!("{} {} {} {}", row.occurred_at, row.user_id, row.kind, detail);
                }
            }
        }
        Commands::Status => {
            print_status(&svc).await?;
        }
        Commands::Config { action } => {
            handle_config(&svc, action).await?;
        }
    }

    Ok(())
}

fn print_report(report: &reviewdw::Report) {
    println!("Usage Report — {}", report.timeframe);
    println!("  Generated:        {}", report.generated_at.to_rfc3339());
    println!("  Total analyses:   {}", report.total_analyses);
    println!("  Unique users:     {}", report.unique_users);
    println!(
        "  Avg analysis:     {:.2}s",
        report.average_analysis_time
    );
    if !report.top_issue_types.is_empty() {
        println!("  Top issues:       {}", report.top_issue_types.join(", "));
    }
    if !report.language_distribution.is_empty() {
        let langs: Vec<String> = report
            .language_distribution
            .iter()
            .map(|(lang, n)| format!("{lang} ({n})"))
            .collect();
        println!("  Languages:        {}", langs.join(", "));
    }
    if !report.quality_trend.is_empty() {
        let trend: Vec<String> = report
            .quality_trend
            .iter()
            .map(|q| format!("{q:.2}"))
            .collect();
        println!("  Quality trend:    {}", trend.join(" -> "));
    }
    let tp = &report.team_productivity;
    println!("  Team productivity:");
    println!("    Analyses/user:  {:.2}", tp.analyses_per_user);
    println!("    Avg quality:    {:.2}", tp.average_quality_score);
    println!("    Resolution:     {:.0}%", tp.issue_resolution_rate * 100.0);
    println!("    Review eff.:    {:.0}%", tp.code_review_efficiency * 100.0);
}

async fn print_status(svc: &AnalyticsService) -> anyhow::Result<()> {
    let stats = svc
        .db()
        .reader()
        .call(|conn| {
            let activities = reviewdw::storage::repository::count_activities(conn)?;
            let users = reviewdw::storage::repository::count_users(conn)?;
            let last = reviewdw::storage::repository::last_recorded_at(conn)?;
            Ok::<_, rusqlite::Error>((activities, users, last))
        })
        .await?;

    let (activities, users, last) = stats;
    println!("Warehouse Status");
    println!("  Activities: {activities}");
    println!("  Users:      {users}");
    println!(
        "  Last event: {}",
        last.unwrap_or_else(|| "never".to_string())
    );
    Ok(())
}

async fn handle_config(svc: &AnalyticsService, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match svc.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            svc.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = svc.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}
