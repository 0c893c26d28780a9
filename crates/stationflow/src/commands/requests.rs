//! Update request command handlers.

use tabled::Tabled;

use stationflow_core::{RequestStatus, UpdateRequest};

use crate::cli::{GlobalOpts, RequestsArgs, RequestsCommand};
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct RequestRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Station")]
    station: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Requested")]
    requested: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&UpdateRequest> for RequestRow {
    fn from(r: &UpdateRequest) -> Self {
        Self {
            id: r.id.clone(),
            station: r
                .station_name
                .clone()
                .unwrap_or_else(|| r.station_id.to_string()),
            user: r.username.clone().unwrap_or_else(|| r.user_id.clone()),
            requested: r.requested_available,
            status: r.status.to_string(),
            created: r
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

fn print_requests(requests: &[UpdateRequest], global: &GlobalOpts) {
    let out = output::render_list(global.output, requests, |r| RequestRow::from(r), |r| r.id.clone());
    output::print_output(&out, global.quiet);
}

pub async fn handle(ctx: &Context, args: RequestsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = &ctx.client;

    match args.command {
        RequestsCommand::List { pending } => {
            let mut requests = client.pending_requests().await?;
            if pending {
                requests.retain(|r| r.status == RequestStatus::Pending);
            }
            print_requests(&requests, global);
            Ok(())
        }

        RequestsCommand::Mine => {
            let requests = client.my_requests().await?;
            print_requests(&requests, global);
            Ok(())
        }

        RequestsCommand::Approve { id } => {
            let message = client.approve_request(&id).await?;
            output::success(global, &or_default(message, &format!("Request '{id}' approved")));
            Ok(())
        }

        RequestsCommand::Reject { id } => {
            let message = client.reject_request(&id).await?;
            output::success(global, &or_default(message, &format!("Request '{id}' rejected")));
            Ok(())
        }
    }
}

fn or_default(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}
