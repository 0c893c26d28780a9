// ── Application shell ──
//
// `AppShell` holds UI state and turns inputs into effects; `ShellDriver`
// executes those effects and feeds results back.

mod app;
mod driver;
mod state;

pub use app::{AppShell, Effects, ShellEffect};
pub use driver::{ShellDriver, ShellMessage};
pub use state::{Modal, ModalFlags, Notice, UiState};
