//! Command dispatch: bridges CLI args -> core client calls -> output.

pub mod auth;
pub mod config_cmd;
pub mod feedback;
pub mod requests;
pub mod route;
pub mod stations;
pub mod util;
pub mod watch;

use tracing::{debug, warn};

use stationflow_core::StationDataClient;

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, SessionStore};
use crate::error::CliError;

/// Everything a backend-bound command needs.
pub struct Context {
    pub client: StationDataClient,
    pub profile: String,
    pub sessions: SessionStore,
    restored: bool,
}

impl Context {
    /// Resolve the profile, build the client, and adopt any stored
    /// session for that profile.
    pub fn connect(global: &GlobalOpts, live: bool) -> Result<Self, CliError> {
        let cfg = config::load_config_or_default();
        let (profile, prof) = config::resolve_profile(global, &cfg)?;
        let client_config = config::client_config(global, &cfg, &prof, live)?;
        let client = StationDataClient::new(client_config)?;
        let sessions = SessionStore::new(profile.clone());

        let restored = match sessions.load() {
            Ok(Some(session)) => {
                debug!(user = %session.user.username, "restored session");
                client.restore_session(session);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable session file");
                false
            }
        };

        Ok(Self {
            client,
            profile,
            sessions,
            restored,
        })
    }

    /// Forget the stored session if the backend rejected it, then stop
    /// background work.
    pub async fn finish(&self) {
        if self.restored
            && self.client.session().is_none()
            && let Err(e) = self.sessions.clear()
        {
            warn!(error = %e, "failed to clear expired session");
        }
        self.client.shutdown().await;
    }
}

/// Dispatch a backend-bound command to its handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Stations(args) => stations::handle(ctx, args, global).await,
        Command::Requests(args) => requests::handle(ctx, args, global).await,
        Command::Auth(args) => auth::handle(ctx, args, global).await,
        Command::Feedback(args) => feedback::handle(ctx, args, global).await,
        Command::Route(args) => route::handle(ctx, args, global).await,
        Command::Watch(args) => watch::handle(ctx, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
