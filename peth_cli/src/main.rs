use clap::{Parser, Subcommand};
use peth_core::input::parse_session_spec;
use peth_core::units::pure_ethanol_grams;
use peth_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pethsim")]
#[command(about = "Blood alcohol and PEth timeline simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate BAC and PEth for a set of drinking sessions
    Simulate {
        /// Session file (.json or .csv)
        #[arg(long)]
        sessions: Option<PathBuf>,

        /// Inline session START,END,GRAMS[,FACTOR] (repeatable)
        #[arg(long = "session")]
        inline_sessions: Vec<String>,

        /// Sex (male, female)
        #[arg(long)]
        sex: Option<String>,

        /// Body weight in kg
        #[arg(long)]
        weight: Option<f64>,

        /// Age in years
        #[arg(long)]
        age: Option<u32>,

        /// Simulation step in minutes (1-120)
        #[arg(long)]
        step_minutes: Option<u32>,

        /// PEth half-life in days
        #[arg(long)]
        half_life_days: Option<f64>,

        /// PEth formation rate (ng/mL per hour at 1‰)
        #[arg(long)]
        formation_rate: Option<f64>,

        /// Do not apply the blood water factor to the distribution volume
        #[arg(long)]
        no_blood_water_factor: bool,

        /// Write the full timeline to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Print the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Convert a beverage volume and ABV into grams of pure ethanol
    Grams {
        /// Beverage volume in mL
        #[arg(long)]
        volume_ml: f64,

        /// Alcohol by volume in percent
        #[arg(long)]
        abv: f64,
    },

    /// Show the effective configuration
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    peth_core::logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            sessions,
            inline_sessions,
            sex,
            weight,
            age,
            step_minutes,
            half_life_days,
            formation_rate,
            no_blood_water_factor,
            export,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let mut simulation = config.simulation.clone();
            if let Some(step) = step_minutes {
                simulation.step_minutes = step;
            }
            if let Some(days) = half_life_days {
                simulation.decay_half_life_days = days;
            }
            if let Some(rate) = formation_rate {
                simulation.biomarker_formation_rate = rate;
            }
            if no_blood_water_factor {
                simulation.apply_blood_water_factor = false;
            }

            let sex = sex.map(|s| s.parse::<Sex>()).transpose()?;
            let subject = config.subject.resolve(sex, weight, age)?;

            let mut all_sessions = match sessions {
                Some(path) => load_sessions(&path)?,
                None => Vec::new(),
            };
            for spec in &inline_sessions {
                all_sessions.push(parse_session_spec(spec)?);
            }
            tracing::debug!("Collected {} session(s)", all_sessions.len());

            cmd_simulate(&subject, &all_sessions, &simulation, &config, export, json)
        }
        Commands::Grams { volume_ml, abv } => cmd_grams(volume_ml, abv),
        Commands::Config { init } => cmd_config(cli.config, init),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn cmd_simulate(
    subject: &SubjectParameters,
    sessions: &[DrinkingSession],
    simulation: &SimulationConfig,
    config: &Config,
    export: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let Some(result) = simulate(subject, sessions, simulation)? else {
        println!("No drinking sessions - nothing to simulate.");
        return Ok(());
    };

    if let Some(path) = export {
        let rows = write_timeline_csv(&result, &path)?;
        eprintln!("✓ Exported {} samples to {}", rows, path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    display_parameters(&result.parameters);
    if let Some(summary) = TimelineSummary::from_result(&result, config.display.warning_permille) {
        display_summary(&summary, config.display.bac_unit);
    }
    Ok(())
}

fn cmd_grams(volume_ml: f64, abv: f64) -> Result<()> {
    let grams = pure_ethanol_grams(volume_ml, abv)?;
    println!("{:.1} g pure ethanol", grams);
    Ok(())
}

fn cmd_config(path: Option<PathBuf>, init: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    if init {
        if path.exists() {
            return Err(Error::Config(format!(
                "Config file already exists at {}",
                path.display()
            )));
        }
        Config::default().save_to(&path)?;
        println!("✓ Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = if path.exists() {
        Config::load_from(&path)?
    } else {
        Config::default()
    };
    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

fn display_parameters(params: &DerivedParameters) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  MODEL PARAMETERS");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Subject: {:?}, {} kg, {} years",
        params.sex, params.weight_kg, params.age_years
    );
    println!(
        "  r = {:.2}, distribution volume {:.1} kg",
        params.widmark_ratio, params.distribution_volume_kg
    );
    println!(
        "  Elimination {:.3}‰/h ({:.1} g/h)",
        params.elimination_permille_per_hour, params.elimination_grams_per_hour
    );
    println!(
        "  Absorption k = {:.1}/h, capped at {:.0} g/h",
        params.absorption_rate_constant, params.absorption_rate_cap
    );
    println!(
        "  PEth formation {:.1} ng/mL per hour at 1‰, t½ = {:.1} days",
        params.biomarker_formation_rate, params.decay_half_life_days
    );
    println!("  Step: {} min", params.step_minutes);
}

fn display_summary(summary: &TimelineSummary, unit: BacUnit) {
    let fmt_time = |t: chrono::DateTime<chrono::Utc>| t.format("%Y-%m-%d %H:%M UTC").to_string();

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  TIMELINE");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Peak BAC: {:.3}{} at {}",
        unit.convert(summary.peak_bac_permille),
        unit.symbol(),
        fmt_time(summary.peak_bac_at)
    );
    println!(
        "  Time at or above {:.3}{}: {:.1} h",
        unit.convert(summary.warning_permille),
        unit.symbol(),
        summary.hours_above_warning
    );
    if let Some(sober) = summary.sober_at {
        println!("  BAC back to zero: {}", fmt_time(sober));
    }
    println!(
        "  Peak PEth: {:.0} ng/mL ({:.3} µmol/L) at {}",
        summary.peak_biomarker_ng_per_ml,
        summary.peak_biomarker_umol_per_l,
        fmt_time(summary.peak_biomarker_at)
    );
    println!(
        "  PEth at end: {:.3} µmol/L after {:.1} days",
        summary.final_biomarker_umol_per_l,
        summary.simulated_hours / 24.0
    );
    println!();
}
