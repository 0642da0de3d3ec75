use clap::Subcommand;
use uuid::Uuid;

use crate::util::api_request;

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Show the active (most recently approved) plan
    Active {
        /// Skip pretty-printing (raw JSON for piping)
        #[arg(long)]
        raw: bool,
    },
}

pub async fn run(api_url: &str, user_id: Uuid, command: PlanCommands) -> i32 {
    match command {
        PlanCommands::Active { raw } => {
            api_request(
                api_url,
                reqwest::Method::GET,
                "/v1/plans/active",
                Some(user_id),
                None,
                raw,
            )
            .await
        }
    }
}
