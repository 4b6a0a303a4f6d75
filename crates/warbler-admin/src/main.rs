use anyhow::{Context, bail};
use tracing::info;

use warbler_db::{Database, DbConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Migrate,
    Reset,
    Stats,
}

impl Command {
    fn parse(arg: Option<&str>) -> anyhow::Result<Self> {
        match arg {
            None | Some("migrate") => Ok(Self::Migrate),
            Some("reset") => Ok(Self::Reset),
            Some("stats") => Ok(Self::Stats),
            Some(other) => bail!("unknown command '{}', expected migrate, reset or stats", other),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warbler_db=debug,warbler_admin=debug".into()),
        )
        .init();

    let arg = std::env::args().nth(1);
    let command = Command::parse(arg.as_deref())?;

    // Config
    let config = DbConfig::from_env().context("reading DATABASE_URL")?;
    info!("Using database {}", config.location);

    // Opening the database applies any pending migrations
    let db = Database::connect(&config)
        .with_context(|| format!("opening database {}", config.location))?;

    match command {
        Command::Migrate => {}
        Command::Reset => db.reset().context("resetting schema")?,
        Command::Stats => {
            for (table, count) in db.table_counts()? {
                info!("{:<10} {}", table, count);
            }
        }
    }

    info!("{:?} finished", command);
    Ok(())
}
