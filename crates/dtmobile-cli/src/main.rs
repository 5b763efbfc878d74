mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use dtmobile_core::{DistanceUnit, GeoPoint};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dtmobile-cli")]
#[command(about = "Disciple.Tools mobile contacts command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// Print the contacts view for a user as JSON.
    Contacts {
        #[arg(long)]
        user_id: i64,
    },
    /// Great-circle distance between two `<lat>,<lng>` points.
    Distance {
        #[arg(long, allow_hyphen_values = true)]
        from: GeoPoint,
        #[arg(long, allow_hyphen_values = true)]
        to: GeoPoint,
        #[arg(long, value_enum, default_value_t = UnitArg::Mile)]
        unit: UnitArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum UnitArg {
    Mile,
    Kilometer,
    NauticalMile,
}

impl From<UnitArg> for DistanceUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Mile => DistanceUnit::Mile,
            UnitArg::Kilometer => DistanceUnit::Kilometer,
            UnitArg::NauticalMile => DistanceUnit::NauticalMile,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log_level = commands::log_level(|key| std::env::var(key));
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Distance { from, to, unit } => {
            println!("{}", commands::format_distance(from, to, unit.into()));
        }
        Commands::Migrate => {
            let config = dtmobile_core::load_app_config()?;
            let pool = commands::connect(&config).await?;
            let applied = dtmobile_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations applied");
        }
        Commands::Contacts { user_id } => {
            let config = dtmobile_core::load_app_config()?;
            let pool = commands::connect(&config).await?;
            let view = commands::run_contacts(pool, &config, user_id).await?;
            println!("{view}");
        }
    }

    Ok(())
}
