//! Feedback command handlers.

use tabled::Tabled;

use stationflow_core::Feedback;

use crate::cli::{FeedbackArgs, FeedbackCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

#[derive(Tabled)]
struct FeedbackRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Received")]
    received: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Message")]
    message: String,
}

const PREVIEW_CHARS: usize = 60;

impl From<&Feedback> for FeedbackRow {
    fn from(f: &Feedback) -> Self {
        let mut message: String = f.message.chars().take(PREVIEW_CHARS).collect();
        if f.message.chars().count() > PREVIEW_CHARS {
            message.push('…');
        }
        Self {
            id: f.id.clone(),
            received: f
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            email: f.email.clone().unwrap_or_default(),
            message,
        }
    }
}

pub async fn handle(ctx: &Context, args: FeedbackArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = &ctx.client;

    match args.command {
        FeedbackCommand::Send { message, email } => {
            let reply = client.submit_feedback(&message, email.as_deref()).await?;
            output::success(global, if reply.is_empty() { "Feedback sent, thank you" } else { &reply });
            Ok(())
        }

        FeedbackCommand::List => {
            let entries = client.list_feedback().await?;
            let out = output::render_list(global.output, &entries, |f| FeedbackRow::from(f), |f| f.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FeedbackCommand::Delete { id } => {
            if !util::confirm(&format!("Delete feedback '{id}'?"), global.yes)? {
                return Ok(());
            }
            client.delete_feedback(&id).await?;
            output::success(global, &format!("Feedback '{id}' deleted"));
            Ok(())
        }
    }
}
