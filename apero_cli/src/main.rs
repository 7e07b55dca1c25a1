use apero_core::csv_rollup::{archive_expired_drinks, read_drink_history, write_forecast_csv};
use apero_core::drink_log::{clear_drinks, read_drinks, read_recent_drinks, remove_drink};
use apero_core::*;
use chrono::{DateTime, Duration, Local, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "apero")]
#[command(about = "Blood alcohol estimator and drink log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Evaluate at this instant (RFC 3339) instead of the system clock
    #[arg(long, global = true, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current and peak BAC (default)
    Status,

    /// View or edit the drinker profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Log, list and delete drinks
    Drink {
        #[command(subcommand)]
        action: DrinkAction,
    },

    /// Forecast BAC over the next hours
    Forecast {
        /// Look-ahead in hours (defaults to the configured horizon)
        #[arg(long)]
        hours: Option<f64>,

        /// Write the forecast to a CSV file instead of printing it
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show forecast phases and upcoming status changes
    Phases {
        /// Look-ahead in hours (defaults to the configured horizon)
        #[arg(long)]
        hours: Option<f64>,
    },

    /// Archive expired drinks to the CSV history
    Rollup,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the stored profile
    Show,

    /// Update one or more profile fields
    Set {
        /// male or female
        #[arg(long)]
        sex: Option<Sex>,

        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,

        /// Height in cm
        #[arg(long)]
        height: Option<f64>,

        /// Age in years
        #[arg(long)]
        age: Option<f64>,
    },
}

#[derive(Subcommand)]
enum DrinkAction {
    /// Log a drink from a preset or custom values
    Add {
        /// Preset id (see `apero drink presets`)
        #[arg(long, conflicts_with_all = ["name", "volume", "abv"])]
        preset: Option<String>,

        /// Drink name
        #[arg(long)]
        name: Option<String>,

        /// Volume in mL
        #[arg(long)]
        volume: Option<f64>,

        /// Alcohol by volume, in percent
        #[arg(long)]
        abv: Option<f64>,

        /// When drinking started (RFC 3339, defaults to now)
        #[arg(long, value_parser = parse_instant)]
        start: Option<DateTime<Utc>>,

        /// How long the drink took, in minutes
        #[arg(long)]
        minutes: Option<u32>,
    },

    /// List logged drinks
    List,

    /// List drinks archived by `apero rollup`
    History,

    /// Delete a drink by id
    Remove { id: String },

    /// Delete every logged drink
    Clear,

    /// List the built-in presets
    Presets,
}

/// Resolved locations of the persisted files
struct DataPaths {
    profile: PathBuf,
    drinks: PathBuf,
    history: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        Self {
            profile: data_dir.join("profile.json"),
            drinks: data_dir.join("drinks.jsonl"),
            history: data_dir.join("drinks_history.csv"),
        }
    }
}

fn parse_instant(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        apero_core::logging::init_with_level("debug");
    } else {
        apero_core::logging::init();
    }

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = DataPaths::new(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);

    let clock: Box<dyn Clock> = match cli.now {
        Some(t) => Box::new(FixedClock(t)),
        None => Box::new(SystemClock),
    };
    let model = BacModel::new(config.model.to_params());

    match cli.command {
        Some(Commands::Status) | None => cmd_status(&paths, &config, &model, clock.as_ref()),
        Some(Commands::Profile { action }) => cmd_profile(&paths, action),
        Some(Commands::Drink { action }) => cmd_drink(&paths, &config, clock.as_ref(), action),
        Some(Commands::Forecast { hours, csv }) => {
            let hours = hours.unwrap_or(config.forecast.horizon_hours);
            cmd_forecast(&paths, &config, &model, clock.as_ref(), hours, csv)
        }
        Some(Commands::Phases { hours }) => {
            let hours = hours.unwrap_or(config.forecast.horizon_hours);
            cmd_phases(&paths, &config, &model, clock.as_ref(), hours)
        }
        Some(Commands::Rollup) => cmd_rollup(&paths, &config, clock.as_ref()),
    }
}

fn retention(config: &Config) -> Duration {
    Duration::hours(i64::from(config.drinks.retention_hours))
}

/// Load the profile and the drinks that still count at `now`
fn load_inputs(
    paths: &DataPaths,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<(Profile, Vec<DrinkEvent>)> {
    let profile = Profile::load(&paths.profile)?;
    let drinks = read_recent_drinks(&paths.drinks, now, retention(config))?;

    if !profile.is_complete() {
        eprintln!("Profile incomplete: set at least --sex and --weight with `apero profile set`.");
    }
    Ok((profile, drinks))
}

fn cmd_status(paths: &DataPaths, config: &Config, model: &BacModel, clock: &dyn Clock) -> Result<()> {
    let now = clock.now();
    let (profile, drinks) = load_inputs(paths, config, now)?;
    let estimate = model.estimate(&drinks, &profile, now);

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  BAC ESTIMATE");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Current: {:.3} g/L  ({})",
        estimate.current_bac, estimate.status
    );
    println!("  Drinks:  {}", drinks.len());

    if estimate.peak_bac > 0.0 {
        println!(
            "  Peak:    {:.3} g/L at {}",
            estimate.peak_bac,
            fmt_time(estimate.peak_time)
        );
    }
    if let Some(sober) = estimate.sober_time {
        println!("  Sober:   ~{}", fmt_time(sober));
    }

    println!();
    println!("  Indicative only. Never drive after drinking.");
    println!();
    Ok(())
}

fn cmd_profile(paths: &DataPaths, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => {
            let profile = Profile::load(&paths.profile)?;
            display_profile(&profile);
        }
        ProfileAction::Set {
            sex,
            weight,
            height,
            age,
        } => {
            let profile = Profile::update(&paths.profile, |p| {
                if sex.is_some() {
                    p.sex = sex;
                }
                if weight.is_some() {
                    p.weight_kg = weight;
                }
                if height.is_some() {
                    p.height_cm = height;
                }
                if age.is_some() {
                    p.age_years = age;
                }
                Ok(())
            })?;
            println!("✓ Profile saved");
            display_profile(&profile);
        }
    }
    Ok(())
}

fn display_profile(profile: &Profile) {
    let field = |v: Option<f64>, unit: &str| match v {
        Some(v) => format!("{} {}", v, unit),
        None => "(unset)".to_string(),
    };
    let sex = match profile.sex {
        Some(Sex::Male) => "male",
        Some(Sex::Female) => "female",
        None => "(unset)",
    };

    println!("  Sex:    {}", sex);
    println!("  Weight: {}", field(profile.weight_kg, "kg"));
    println!("  Height: {}", field(profile.height_cm, "cm"));
    println!("  Age:    {}", field(profile.age_years, "years"));
}

fn cmd_drink(paths: &DataPaths, config: &Config, clock: &dyn Clock, action: DrinkAction) -> Result<()> {
    match action {
        DrinkAction::Add {
            preset,
            name,
            volume,
            abv,
            start,
            minutes,
        } => {
            let start = start.unwrap_or_else(|| clock.now());
            let minutes = minutes.unwrap_or(config.drinks.default_duration_minutes);
            let duration = Duration::minutes(i64::from(minutes));

            let drink = match (preset, name, volume, abv) {
                (Some(id), _, _, _) => get_default_catalog().get(&id)?.pour(start, duration)?,
                (None, Some(name), Some(volume), Some(abv)) => {
                    DrinkEvent::lasting(name, volume, abv, start, duration)?
                }
                _ => {
                    return Err(Error::InvalidDrink(
                        "use --preset, or all of --name, --volume and --abv".into(),
                    ))
                }
            };

            let mut log = JsonlDrinkLog::new(&paths.drinks);
            log.append(&drink)?;
            println!("✓ Logged {} ({})", drink.name, drink.id);
        }

        DrinkAction::List => {
            let drinks = read_drinks(&paths.drinks)?;
            if drinks.is_empty() {
                println!("No drinks logged.");
            }
            drinks.iter().for_each(print_drink);
        }

        DrinkAction::History => {
            let drinks = read_drink_history(&paths.history)?;
            if drinks.is_empty() {
                println!("No archived drinks.");
            }
            drinks.iter().for_each(print_drink);
        }

        DrinkAction::Remove { id } => {
            let id = uuid::Uuid::parse_str(&id)
                .map_err(|e| Error::Other(format!("Invalid drink id '{}': {}", id, e)))?;
            if remove_drink(&paths.drinks, id)? {
                println!("✓ Removed drink {}", id);
            } else {
                println!("No drink with id {}", id);
            }
        }

        DrinkAction::Clear => {
            let count = clear_drinks(&paths.drinks)?;
            println!("✓ Cleared {} drinks", count);
        }

        DrinkAction::Presets => {
            let catalog = get_default_catalog();
            let errors = catalog.validate();
            if !errors.is_empty() {
                return Err(Error::Catalog(errors.join("; ")));
            }
            for preset in catalog.iter() {
                println!(
                    "  {:<8} {:<8} {:>5.0} mL {:>5.1}%",
                    preset.id, preset.name, preset.volume_ml, preset.alcohol_percent
                );
            }
        }
    }
    Ok(())
}

fn print_drink(drink: &DrinkEvent) {
    println!(
        "  {}  {:<12} {:>6.0} mL {:>5.1}%  {} - {}",
        drink.id,
        drink.name,
        drink.volume_ml,
        drink.alcohol_percent,
        fmt_time(drink.start_time),
        fmt_time(drink.end_time)
    );
}

fn cmd_forecast(
    paths: &DataPaths,
    config: &Config,
    model: &BacModel,
    clock: &dyn Clock,
    hours: f64,
    csv: Option<PathBuf>,
) -> Result<()> {
    let now = clock.now();
    let (profile, drinks) = load_inputs(paths, config, now)?;
    let points = model.predict(&drinks, &profile, now, hours);

    if let Some(path) = csv {
        let count = write_forecast_csv(&points, &path)?;
        println!("✓ Wrote {} forecast points", count);
        println!("  CSV: {}", path.display());
        return Ok(());
    }

    if points.is_empty() {
        println!("No forecast available.");
        return Ok(());
    }

    for point in &points {
        println!(
            "  {}  {:.3} g/L  {}",
            fmt_time(point.time),
            point.bac,
            classify(point.bac)
        );
    }
    Ok(())
}

fn cmd_phases(
    paths: &DataPaths,
    config: &Config,
    model: &BacModel,
    clock: &dyn Clock,
    hours: f64,
) -> Result<()> {
    let now = clock.now();
    let (profile, drinks) = load_inputs(paths, config, now)?;
    let points = model.predict(&drinks, &profile, now, hours);

    let segments = phase_segments(&points);
    if segments.is_empty() {
        println!("No forecast available.");
        return Ok(());
    }

    println!("Phases:");
    for seg in &segments {
        println!(
            "  {} - {}  {}",
            fmt_time(seg.start_time),
            fmt_time(seg.end_time),
            seg.status
        );
    }

    let changes = upcoming_phase_changes(&points, now);
    if changes.is_empty() {
        println!("No upcoming phase change.");
    } else {
        println!("Upcoming:");
        for change in changes {
            println!("  {}  -> {}", fmt_time(change.at), change.status);
        }
    }
    Ok(())
}

fn cmd_rollup(paths: &DataPaths, config: &Config, clock: &dyn Clock) -> Result<()> {
    if !paths.drinks.exists() {
        println!("No drink log found - nothing to roll up.");
        return Ok(());
    }

    let count = archive_expired_drinks(&paths.drinks, &paths.history, clock.now(), retention(config))?;

    println!("✓ Archived {} drinks to CSV", count);
    println!("  CSV: {}", paths.history.display());
    Ok(())
}

fn fmt_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
