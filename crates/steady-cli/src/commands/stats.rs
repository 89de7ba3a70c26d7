use clap::Subcommand;
use steady_core::storage::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Most recent sessions
    Recent {
        /// How many to show
        #[arg(default_value = "10")]
        limit: usize,
    },
    /// All-time aggregates
    All,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Recent { limit } => {
            let sessions = db.recent(limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        StatsAction::All => {
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
