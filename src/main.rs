use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

use bloodsync::eligibility::validate_donation_date;
use bloodsync::{
    can_donate, compatibility_of, days_since_donation, BloodInventory, BloodRequest,
    BloodSyncError, BloodType, Config, DonorMatcher, EligibilityInput, FileParser, ParsedRoster,
    RegistrySnapshot, ReportFormat, ReportGenerator, RequestStatus, RosterDiscovery, Urgency,
    MIN_DONATION_INTERVAL_DAYS,
};

/// Blood-type compatibility, donor eligibility and donor matching
#[derive(Parser, Debug)]
#[command(
    name = "bloodsync",
    version,
    about = "Blood donation compatibility, eligibility and donor matching",
    long_about = r#"
Tools behind a blood-donation coordination site:
- Blood group compatibility lookup
- Donor age/weight eligibility and the 56-day donation interval
- Ranked donor matching for blood requests
- Inventory and dashboard statistics

Donor rosters are read from CSV, TSV or JSON exports.
"#
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, env = "BLOODSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Number of threads (0 = auto-detect)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which groups a blood type can donate to and receive from
    Compat {
        blood_type: String,

        /// Print the rule as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check age/weight eligibility
    Eligible {
        #[arg(long)]
        age: Option<String>,

        /// Weight in kilograms
        #[arg(long)]
        weight: Option<String>,
    },
    /// Check whether the donation interval has elapsed
    CanDonate {
        /// Date of the last donation (YYYY-MM-DD)
        #[arg(long)]
        last_donation: Option<NaiveDate>,
    },
    /// Rank compatible donors for a blood request
    Match {
        /// Requested blood type
        #[arg(short, long)]
        blood_type: BloodType,

        /// Roster files or directories
        #[arg(short, long, value_name = "PATHS", num_args = 1.., required = true, value_hint = ValueHint::AnyPath)]
        donors: Vec<PathBuf>,

        /// Recursively search directories
        #[arg(short, long)]
        recursive: bool,

        #[arg(short, long, default_value = "1")]
        units: u32,

        #[arg(long, value_enum, default_value = "normal")]
        urgency: Urgency,

        /// City or state filter
        #[arg(short, long)]
        location: Option<String>,

        /// Maximum donors to report
        #[arg(long)]
        limit: Option<usize>,

        /// Registry snapshot (JSON) supplying current inventory
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        inventory: Option<PathBuf>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output directory for reports
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute dashboard statistics from a registry snapshot
    Stats {
        #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,

        /// Keep refreshing on the configured interval
        #[arg(short, long)]
        watch: bool,

        /// Also write the statistics to this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Interactive eligibility and compatibility check
    Interactive,
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Html,
    Csv,
    Json,
    Tsv,
    All,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> ReportFormat {
        match format {
            OutputFormat::Html => ReportFormat::Html,
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Tsv => ReportFormat::Tsv,
            OutputFormat::All => ReportFormat::All,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    init_logging(cli.verbose);

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    init_thread_pool(config.threads)?;

    match cli.command {
        Commands::Compat { blood_type, json } => show_compatibility(&blood_type, json),
        Commands::Eligible { age, weight } => check_eligibility(age.as_deref(), weight.as_deref()),
        Commands::CanDonate { last_donation } => check_interval(last_donation),
        Commands::Match {
            blood_type,
            donors,
            recursive,
            units,
            urgency,
            location,
            limit,
            inventory,
            format,
            output,
        } => {
            if let Some(location) = location {
                config.matching.location = Some(location);
            }
            if let Some(limit) = limit {
                config.matching.limit = limit;
            }
            if let Some(format) = format {
                config.report.format = format.into();
            }
            if let Some(output) = output {
                config.report.output_dir = output;
            }
            config.matching.recursive |= recursive;

            run_match(&config, blood_type, units, urgency, &donors, inventory.as_deref())
        }
        Commands::Stats {
            snapshot,
            watch,
            output,
        } => run_stats(&config, &snapshot, watch, output.as_deref()),
        Commands::Interactive => run_interactive_mode(),
        Commands::Completions { .. } => Ok(()),
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("bloodsync={}", level))
        .with_writer(io::stderr)
        .init();
}

fn init_thread_pool(threads: usize) -> Result<()> {
    let num_threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| anyhow::anyhow!("Failed to initialize thread pool: {}", e))?;

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn show_compatibility(blood_type: &str, json: bool) -> Result<()> {
    let rule = compatibility_of(blood_type)?;

    if json {
        println!("{}", serde_json::to_string_pretty(rule)?);
    } else {
        println!(
            "{} {}",
            style("Blood group").bold().cyan(),
            style(rule.blood_type).red().bold()
        );
        println!("{}", rule.summary());
    }
    Ok(())
}

fn check_eligibility(age: Option<&str>, weight: Option<&str>) -> Result<()> {
    let input = EligibilityInput::from_fields(age, weight)?;

    if input.is_eligible()? {
        println!("{} You are eligible to donate blood!", style("✓").green().bold());
    } else {
        println!(
            "{} You may not be eligible. Age: 18-65, Weight: 50+ kg",
            style("!").yellow().bold()
        );
    }
    Ok(())
}

fn check_interval(last_donation: Option<NaiveDate>) -> Result<()> {
    let today = today();
    if let Some(date) = last_donation {
        validate_donation_date(date, today)?;
    }

    match days_since_donation(last_donation, today) {
        None => println!("No previous donation on record."),
        Some(days) => println!("{} days since last donation.", days),
    }

    if can_donate(last_donation, today) {
        println!("{} Eligible to donate now.", style("✓").green().bold());
    } else {
        println!(
            "{} Please wait {} days between donations.",
            style("✗").red().bold(),
            MIN_DONATION_INTERVAL_DAYS
        );
    }
    Ok(())
}

fn load_rosters(config: &Config, paths: &[PathBuf]) -> Result<Vec<ParsedRoster>> {
    let discovery = RosterDiscovery::new(config.matching.recursive);
    let files = discovery.discover(paths)?;
    info!("Found {} roster files", files.len());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Parsing donor rosters...");

    let parser = FileParser::new(today());
    let rosters: Vec<ParsedRoster> = files
        .par_iter()
        .filter_map(|path| {
            let parsed = match parser.parse(path) {
                Ok(roster) => Some(roster),
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    None
                }
            };
            pb.inc(1);
            parsed
        })
        .collect();

    pb.finish_with_message("Rosters loaded");
    Ok(rosters)
}

fn load_snapshot(path: &Path) -> Result<RegistrySnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid registry snapshot: {}", path.display()))
}

fn run_match(
    config: &Config,
    blood_type: BloodType,
    units: u32,
    urgency: Urgency,
    paths: &[PathBuf],
    inventory_path: Option<&Path>,
) -> Result<()> {
    let rosters = load_rosters(config, paths)?;
    let donors: Vec<_> = rosters.into_iter().flat_map(|r| r.donors).collect();
    info!("Loaded {} donors", donors.len());

    let inventory: Option<BloodInventory> = inventory_path
        .map(|path| load_snapshot(path).map(|s| s.inventory))
        .transpose()?;

    let request = BloodRequest {
        id: String::new(),
        requestor_id: String::new(),
        blood_type,
        units_needed: units,
        fulfilled_units: 0,
        status: RequestStatus::Pending,
        urgency,
        location: None,
        required_date: None,
    };

    let matcher = DonorMatcher::new(config.match_options());
    let report = matcher.match_request(&request, &donors, inventory.as_ref(), today());

    println!(
        "{} {} compatible donors for {} ({:?}, {} units needed)",
        style("✓").green().bold(),
        report.total_compatible,
        style(blood_type).red().bold(),
        report.urgency,
        report.units_needed
    );
    for m in &report.matches {
        println!(
            "  {:<14} {:<4} score {:>3}  {}",
            m.donor.id,
            m.donor.blood_type,
            m.match_score,
            if m.can_donate_now {
                style("ready").green()
            } else {
                style("waiting").yellow()
            }
        );
    }
    if !report.fulfillable {
        println!("{}", style("No stock or compatible donors available").red());
    }

    let generator = ReportGenerator::new(&config.report.output_dir)?;
    generator.generate(&report, config.report.format)?;

    println!(
        "\n{} Reports saved to: {}",
        style("✓").green().bold(),
        style(config.report.output_dir.display()).cyan()
    );
    Ok(())
}

fn run_stats(config: &Config, snapshot: &Path, watch: bool, output: Option<&Path>) -> Result<()> {
    let schedule = config.refresh_schedule();
    let generator = output.map(ReportGenerator::new).transpose()?;
    let mut last_refresh: Option<Instant> = None;

    loop {
        if schedule.is_due(last_refresh, Instant::now()) {
            let refreshed = load_snapshot(snapshot).map(|s| {
                s.statistics(config.inventory.critical_threshold)
            });
            last_refresh = Some(Instant::now());

            match refreshed {
                Ok(stats) => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                    if let Some(generator) = &generator {
                        generator.generate_statistics(&stats)?;
                    }
                }
                // A failed poll keeps the previous figures on screen
                Err(e) if watch => warn!("Statistics refresh failed: {:#}", e),
                Err(e) => return Err(e),
            }

            if !watch {
                return Ok(());
            }
        }

        if let Some(last) = last_refresh {
            thread::sleep(schedule.next_due(last).saturating_duration_since(Instant::now()));
        }
    }
}

fn run_interactive_mode() -> Result<()> {
    println!(
        "{}",
        style("╔══════════════════════════════════════════════════════════════╗").red()
    );
    println!(
        "{}",
        style("║           BloodSync - Donor Self Check                       ║")
            .red()
            .bold()
    );
    println!(
        "{}",
        style("╚══════════════════════════════════════════════════════════════╝").red()
    );
    println!();

    let theme = ColorfulTheme::default();

    let labels: Vec<&str> = BloodType::ALL.iter().map(BloodType::label).collect();
    let idx = Select::with_theme(&theme)
        .with_prompt("Select your blood group")
        .default(0)
        .items(&labels)
        .interact()?;
    show_compatibility(labels[idx], false)?;
    println!();

    let age: String = Input::with_theme(&theme)
        .with_prompt("Age")
        .interact_text()?;
    let weight: String = Input::with_theme(&theme)
        .with_prompt("Weight (kg)")
        .interact_text()?;

    match check_eligibility(Some(&age), Some(&weight)) {
        Err(e) if e.downcast_ref::<BloodSyncError>().is_some() => {
            println!("{} Eligibility unknown: {}", style("?").yellow().bold(), e);
        }
        other => other?,
    }
    println!();

    let last: String = Input::with_theme(&theme)
        .with_prompt("Last donation date (YYYY-MM-DD, blank if never)")
        .allow_empty(true)
        .interact_text()?;

    let last_donation = match last.trim() {
        "" => None,
        s => Some(
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date: {}", s))?,
        ),
    };
    check_interval(last_donation)
}
