use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;
mod util;

use commands::coach::CoachCommands;
use commands::plan::PlanCommands;

#[derive(Parser)]
#[command(name = "stride", version, about = "Stride CLI: chat with the workout coach and manage plans")]
struct Cli {
    /// API base URL
    #[arg(long, env = "STRIDE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Caller identity, sent as the x-user-id header
    #[arg(long, env = "STRIDE_USER_ID")]
    user_id: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Talk to the coach
    Coach {
        #[command(subcommand)]
        command: CoachCommands,
    },
    /// Saved plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Coach { command } => {
            let user_id = util::require_user(cli.user_id);
            commands::coach::run(&cli.api_url, user_id, command).await
        }
        Commands::Plan { command } => {
            let user_id = util::require_user(cli.user_id);
            commands::plan::run(&cli.api_url, user_id, command).await
        }
    };

    std::process::exit(code);
}
