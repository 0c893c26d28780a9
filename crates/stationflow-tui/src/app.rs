//! Application core: event loop, key dispatch into the shell, layout.

use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use ratatui::{
    Frame,
    layout::{Constraint, Layout},
};
use tokio::sync::watch;
use tracing::{debug, info};

use stationflow_core::map::{MapEvent, PopupAction};
use stationflow_core::shell::{Modal, Notice};
use stationflow_core::{
    OccupancyPolicy, PushStatus, RoutingClient, ShellDriver, ShellMessage, StationId, SystemClock,
};

use crate::action::{Action, Mode, map_key};
use crate::event::{Event, EventReader};
use crate::forms::{Outcome, Prompt, StationForm, parse_report};
use crate::surface::{CELL_HEIGHT_PX, CELL_WIDTH_PX, Target, TuiSurface};
use crate::tui::Tui;
use crate::widgets::{dialog, map, popup, sidebar, status_bar};

pub type Driver = ShellDriver<TuiSurface, SystemClock, RoutingClient>;

const SIDEBAR_WIDTH: u16 = 34;
const NOTICE_TTL: Duration = Duration::from_secs(3);
/// How close (in map pixels) the crosshair must be to hit a marker.
const HIT_RADIUS_PX: f64 = 24.0;

enum Wake {
    Input(Option<Event>),
    Shell(Option<ShellMessage>),
}

pub struct App {
    driver: Driver,
    policy: OccupancyPolicy,
    push: Option<watch::Receiver<PushStatus>>,
    focus: Mode,
    prompt: Option<Prompt>,
    /// Highlighted row in the station list.
    highlighted: usize,
    notice: Option<(Notice, Instant)>,
    running: bool,
}

impl App {
    pub fn new(driver: Driver, policy: OccupancyPolicy, push: Option<watch::Receiver<PushStatus>>) -> Self {
        Self {
            driver,
            policy,
            push,
            focus: Mode::Map,
            prompt: None,
            highlighted: 0,
            notice: None,
            running: true,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        let (cols, rows) = tui.size().unwrap_or((80, 24));
        self.resize(cols, rows);
        self.driver.start();

        let mut events = EventReader::new(Duration::from_millis(250), Duration::from_millis(33));
        info!("TUI event loop started");

        while self.running {
            let wake = tokio::select! {
                event = events.next() => Wake::Input(event),
                msg = self.driver.next() => Wake::Shell(msg),
            };
            match wake {
                Wake::Input(None) => break,
                Wake::Input(Some(Event::Render)) => tui.draw(|frame| self.render(frame))?,
                Wake::Input(Some(event)) => self.handle_event(event),
                Wake::Shell(Some(msg)) => {
                    self.driver.apply(msg);
                    self.after_shell();
                }
                Wake::Shell(None) => {
                    debug!("shell sources closed");
                    break;
                }
            }
        }

        events.stop();
        info!("TUI event loop ended");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                let mode = if self.prompt.is_some() { Mode::Input } else { self.focus };
                if let Some(action) = map_key(mode, key) {
                    self.process_action(&action);
                    self.after_shell();
                }
            }
            Event::Resize(cols, rows) => {
                self.resize(cols, rows);
                self.after_shell();
            }
            Event::Tick => {
                if self.notice.as_ref().is_some_and(|(_, at)| at.elapsed() >= NOTICE_TTL) {
                    self.notice = None;
                }
            }
            Event::Render => {}
        }
    }

    /// Tell the map how many pixels the canvas covers.
    fn resize(&mut self, cols: u16, rows: u16) {
        let map_cols = cols.saturating_sub(SIDEBAR_WIDTH).saturating_sub(2).max(1);
        let map_rows = rows.saturating_sub(3).max(1);
        let event = MapEvent::Resized {
            width_px: u32::from(map_cols) * CELL_WIDTH_PX,
            height_px: u32::from(map_rows) * CELL_HEIGHT_PX,
        };
        self.driver.act(|shell| shell.map_event(event));
    }

    fn flash(&mut self, notice: Notice) {
        self.notice = Some((notice, Instant::now()));
    }

    // ── Action dispatch ──────────────────────────────────────────────

    fn process_action(&mut self, action: &Action) {
        if let Some(prompt) = self.prompt.as_mut() {
            let outcome = prompt.handle(action);
            self.prompt_outcome(outcome);
            return;
        }

        match action {
            Action::Quit => self.running = false,
            Action::Pan(dx, dy) => {
                let view = self.driver.shell().renderer().view();
                let dx = f64::from(*dx) * f64::from(view.width_px) / 4.0;
                let dy = f64::from(*dy) * f64::from(view.height_px) / 4.0;
                self.driver.act(|shell| {
                    shell.renderer_mut().pan_by(dx, dy);
                    Vec::new()
                });
            }
            Action::Zoom(delta) => {
                let delta = *delta;
                self.driver.act(|shell| {
                    shell.renderer_mut().zoom_by(delta);
                    Vec::new()
                });
            }
            Action::ToggleFocus => {
                self.focus = if self.focus == Mode::List { Mode::Map } else { Mode::List };
            }
            Action::ListMove(step) => self.move_highlight(*step),
            Action::Activate => self.activate(),
            Action::Dismiss => self.dismiss(),
            Action::ToggleRoute => self.popup_or(PopupAction::Route),
            Action::Report => self.popup_or(PopupAction::Report),
            Action::StartPicking => self.driver.act(|shell| {
                shell.start_picking();
                Vec::new()
            }),
            Action::CycleFilter => {
                self.highlighted = 0;
                self.driver.act(|shell| {
                    shell.cycle_filter();
                    Vec::new()
                });
            }
            Action::OpenSearch => {
                let query = self.driver.shell().state().search.clone();
                self.prompt = Some(Prompt::Search(query));
            }
            Action::Type(_)
            | Action::Backspace
            | Action::NextField
            | Action::Cycle(_)
            | Action::Submit
            | Action::Cancel => {}
        }
    }

    fn prompt_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Editing => {}
            Outcome::SearchChanged(query) => {
                self.highlighted = 0;
                self.driver.act(|shell| {
                    shell.set_search(query);
                    Vec::new()
                });
            }
            Outcome::Submitted => self.submit_prompt(),
            Outcome::Cancelled => match self.prompt.take() {
                Some(Prompt::Search(_)) => self.driver.act(|shell| {
                    shell.set_search("");
                    Vec::new()
                }),
                Some(Prompt::Report { .. }) => self.driver.act(|shell| {
                    shell.close_modal(Modal::ReportStatus);
                    Vec::new()
                }),
                Some(Prompt::AddStation(_)) => self.driver.act(|shell| {
                    shell.close_modal(Modal::AddStation);
                    Vec::new()
                }),
                None => {}
            },
        }
    }

    fn submit_prompt(&mut self) {
        if matches!(self.prompt, Some(Prompt::Search(_))) {
            self.prompt = None;
            return;
        }
        let rejected = match &self.prompt {
            Some(Prompt::Report { value, .. }) => match parse_report(value) {
                Ok(available) => {
                    self.driver.act(|shell| shell.submit_report(available));
                    None
                }
                Err(msg) => Some(msg),
            },
            Some(Prompt::AddStation(form)) => {
                let draft = self
                    .driver
                    .shell()
                    .state()
                    .picked_location
                    .ok_or_else(|| "pick a location on the map first".to_owned())
                    .and_then(|at| form.draft(at));
                match draft {
                    Ok(draft) => {
                        self.driver.act(|shell| shell.submit_station(draft));
                        None
                    }
                    Err(msg) => Some(msg),
                }
            }
            Some(Prompt::Search(_)) | None => None,
        };
        if let Some(msg) = rejected {
            self.flash(Notice::Error(msg));
        }
    }

    fn move_highlight(&mut self, step: i32) {
        let len = self.driver.shell().filtered().len();
        if len == 0 {
            self.highlighted = 0;
            return;
        }
        let max = i64::try_from(len - 1).unwrap_or(i64::MAX);
        let next = (i64::try_from(self.highlighted).unwrap_or(0) + i64::from(step)).clamp(0, max);
        self.highlighted = usize::try_from(next).unwrap_or(0);
    }

    fn activate(&mut self) {
        if self.focus == Mode::List {
            let Some(station) = self.driver.shell().filtered().get(self.highlighted).cloned() else {
                return;
            };
            self.driver.act(|shell| {
                let zoom = shell.renderer().view().zoom;
                shell.renderer_mut().move_view(station.location, zoom);
                shell.map_event(MapEvent::MarkerClicked(station.id.clone()))
            });
            return;
        }

        let shell = self.driver.shell();
        if shell.state().picking {
            let center = shell.renderer().view().center;
            self.driver.act(|shell| shell.map_event(MapEvent::MapClicked(center)));
            return;
        }
        let event = match shell.renderer().surface().target_at_center(HIT_RADIUS_PX) {
            Some(Target::Marker(id)) => MapEvent::MarkerClicked(id),
            Some(Target::Cluster(index)) => MapEvent::ClusterClicked(index),
            None => return,
        };
        self.driver.act(|shell| shell.map_event(event));
    }

    /// Esc peels one layer: popup, then picking, then list focus.
    fn dismiss(&mut self) {
        if self.driver.shell().renderer().surface().shown_popup().is_some() {
            self.driver.act(|shell| {
                let id = shell.renderer_mut().surface_mut().dismiss_popup();
                id.map_or_else(Vec::new, |id| shell.map_event(MapEvent::PopupClosed(id)))
            });
        } else if self.driver.shell().state().picking {
            self.driver.act(|shell| {
                shell.cancel_picking();
                Vec::new()
            });
        } else {
            self.focus = Mode::Map;
        }
    }

    /// Press a popup button when one is open; otherwise act on the
    /// selection directly.
    fn popup_or(&mut self, action: PopupAction) {
        let open = self
            .driver
            .shell()
            .renderer()
            .surface()
            .shown_popup()
            .map(|p| p.station.clone());
        if let Some(station) = open {
            self.driver
                .act(|shell| shell.map_event(MapEvent::PopupAction { station, action }));
            return;
        }
        match action {
            PopupAction::Route => self.driver.act(|shell| shell.toggle_route()),
            PopupAction::Report => {
                let selected: Option<StationId> = self.driver.shell().state().selected_id().cloned();
                if let Some(id) = selected {
                    self.driver.act(|shell| {
                        shell.open_report(&id);
                        Vec::new()
                    });
                }
            }
        }
    }

    // ── Shell follow-up ──────────────────────────────────────────────

    /// Pick up notices and mirror modal state into prompts.
    fn after_shell(&mut self) {
        let mut notice = None;
        let mut needs_sign_in = false;
        self.driver.act(|shell| {
            notice = shell.take_notice();
            if shell.state().modals.is_open(Modal::Auth) {
                shell.close_modal(Modal::Auth);
                needs_sign_in = true;
            }
            Vec::new()
        });
        if needs_sign_in {
            let text = notice.as_ref().map_or("Sign in required", Notice::text);
            notice = Some(Notice::Error(format!("{text}; run `stationflow auth login`")));
        }
        if let Some(notice) = notice {
            self.flash(notice);
        }

        let state = self.driver.shell().state();
        let report_open = state.modals.is_open(Modal::ReportStatus);
        let add_open = state.modals.is_open(Modal::AddStation);
        let report_name = state
            .report_target
            .as_ref()
            .and_then(|id| self.driver.shell().store().get(id))
            .map(|s| s.name.clone());

        match self.prompt {
            Some(Prompt::Report { .. }) if !report_open => self.prompt = None,
            Some(Prompt::AddStation(_)) if !add_open => self.prompt = None,
            Some(Prompt::Report { .. } | Prompt::AddStation(_)) => {}
            _ if report_open => {
                self.prompt = Some(Prompt::Report {
                    station: report_name.unwrap_or_default(),
                    value: String::new(),
                });
            }
            _ if add_open => self.prompt = Some(Prompt::AddStation(StationForm::default())),
            _ => {}
        }

        let len = self.driver.shell().filtered().len();
        if self.highlighted >= len {
            self.highlighted = len.saturating_sub(1);
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let [main, status] = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());
        let [map_area, list_area] =
            Layout::horizontal([Constraint::Min(10), Constraint::Length(SIDEBAR_WIDTH)]).areas(main);

        let shell = self.driver.shell();
        let state = shell.state();
        let surface = shell.renderer().surface();
        let stations = shell.filtered();

        map::render(
            frame,
            map_area,
            &map::MapProps {
                surface,
                focused: self.focus == Mode::Map,
                picking: state.picking,
            },
        );
        let filter = state.filter.label();
        sidebar::render(
            frame,
            list_area,
            &sidebar::SidebarProps {
                stations: &stations,
                highlighted: self.highlighted,
                selected: state.selected_id(),
                policy: &self.policy,
                filter,
                search: &state.search,
                focused: self.focus == Mode::List,
            },
        );

        if let Some(content) = surface.shown_popup() {
            let level = shell
                .store()
                .get(&content.station)
                .map(|s| self.policy.read(&s).level);
            popup::render(frame, map_area, content, level);
        }

        let search = match &self.prompt {
            Some(Prompt::Search(query)) => Some(query.as_str()),
            _ => None,
        };
        status_bar::render(
            frame,
            status,
            &status_bar::StatusProps {
                push: self.push.as_ref().map(|rx| *rx.borrow()),
                shown: stations.len(),
                total: shell.store().len(),
                on_map: surface.marker_count(),
                user: state.session.as_ref().map(|s| s.user.username.as_str()),
                pending_requests: if state.is_admin() { state.pending_requests } else { None },
                picking: state.picking,
                search,
            },
        );

        if let Some(prompt) = &self.prompt {
            dialog::render_prompt(frame, main, prompt);
        }
        if let Some((notice, _)) = &self.notice {
            dialog::render_notice(frame, main, notice);
        }
    }
}
