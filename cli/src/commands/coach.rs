use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::json;
use stride_core::conversation::UserProfile;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::util::{api_request, exit_code_for, send};

#[derive(Args, Default)]
pub struct ProfileArgs {
    /// Body weight in kg
    #[arg(long)]
    pub weight: Option<f64>,
    /// Height in cm
    #[arg(long)]
    pub height: Option<f64>,
    #[arg(long)]
    pub gender: Option<String>,
    /// Birthdate (YYYY-MM-DD)
    #[arg(long)]
    pub birthdate: Option<NaiveDate>,
    /// Whether training equipment is available (true/false)
    #[arg(long)]
    pub equipment: Option<bool>,
}

impl ProfileArgs {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            weight: self.weight,
            height: self.height,
            gender: self.gender,
            birthdate: self.birthdate,
            equipment: self.equipment,
        }
    }
}

#[derive(Subcommand)]
pub enum CoachCommands {
    /// Send one message, or start an interactive session when no message is given
    Chat {
        /// Message for this turn
        message: Option<String>,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Skip pretty-printing (raw JSON for piping)
        #[arg(long)]
        raw: bool,
    },
    /// Approve and save the plan awaiting approval
    Approve {
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Show the conversation state and history
    State {
        #[arg(long)]
        raw: bool,
    },
    /// Discard the conversation and start over
    Reset,
}

pub async fn run(api_url: &str, user_id: Uuid, command: CoachCommands) -> i32 {
    match command {
        CoachCommands::Chat {
            message: Some(message),
            profile,
            raw,
        } => {
            api_request(
                api_url,
                reqwest::Method::POST,
                "/v1/coach/chat",
                Some(user_id),
                Some(chat_body(&message, &profile.into_profile())),
                raw,
            )
            .await
        }
        CoachCommands::Chat {
            message: None,
            profile,
            ..
        } => interactive(api_url, user_id, profile.into_profile()).await,
        CoachCommands::Approve { profile } => {
            api_request(
                api_url,
                reqwest::Method::POST,
                "/v1/coach/approve",
                Some(user_id),
                Some(json!({ "user_profile": profile.into_profile() })),
                false,
            )
            .await
        }
        CoachCommands::State { raw } => {
            api_request(
                api_url,
                reqwest::Method::GET,
                "/v1/coach/state",
                Some(user_id),
                None,
                raw,
            )
            .await
        }
        CoachCommands::Reset => {
            api_request(
                api_url,
                reqwest::Method::DELETE,
                "/v1/coach/conversation",
                Some(user_id),
                None,
                false,
            )
            .await
        }
    }
}

pub fn chat_body(message: &str, profile: &UserProfile) -> serde_json::Value {
    json!({
        "message": message,
        "user_profile": profile,
    })
}

fn is_exit_command(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit" | "/q")
}

/// Line-oriented chat loop: each stdin line is one turn. Prints only the
/// coach's reply; errors are printed as JSON and the loop continues.
async fn interactive(api_url: &str, user_id: Uuid, profile: UserProfile) -> i32 {
    eprintln!("Chatting with the coach. Type 'exit' to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_code = 0;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read stdin: {e}");
                return 4;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if is_exit_command(&line) {
            break;
        }

        let body = chat_body(&line, &profile);
        match send(
            api_url,
            reqwest::Method::POST,
            "/v1/coach/chat",
            Some(user_id),
            Some(&body),
        )
        .await
        {
            Ok((status, resp)) if exit_code_for(status) == 0 => {
                last_code = 0;
                println!("{}\n", resp["reply"].as_str().unwrap_or_default());
                if resp["awaiting_approval"].as_bool() == Some(true) {
                    eprintln!("(reply 'yes' to save this plan, or describe what to change)");
                }
            }
            Ok((status, resp)) => {
                last_code = exit_code_for(status);
                eprintln!("{}", serde_json::to_string_pretty(&resp).unwrap_or_default());
            }
            Err(e) => {
                eprintln!(
                    "{}",
                    json!({
                        "error": "connection_error",
                        "message": e,
                        "docs_hint": "Is the API server running? Check STRIDE_API_URL."
                    })
                );
                return 3;
            }
        }
    }

    last_code
}
