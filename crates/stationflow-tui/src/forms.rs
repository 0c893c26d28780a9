//! Text prompts: the search line, the report dialog, and the add-station
//! form.

use stationflow_core::{LatLng, StationDraft, TransportType};

use crate::action::Action;

const MAX_INPUT: usize = 64;

/// What a prompt wants after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Editing,
    /// Search text changed; apply it live.
    SearchChanged(String),
    Submitted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Search(String),
    Report { station: String, value: String },
    AddStation(StationForm),
}

impl Prompt {
    pub fn handle(&mut self, action: &Action) -> Outcome {
        match action {
            Action::Cancel => return Outcome::Cancelled,
            Action::Submit => return Outcome::Submitted,
            _ => {}
        }
        match self {
            Self::Search(query) => {
                if edit(query, action, |_| true) {
                    Outcome::SearchChanged(query.clone())
                } else {
                    Outcome::Editing
                }
            }
            Self::Report { value, .. } => {
                edit(value, action, |c| c.is_ascii_digit() || c == '-');
                Outcome::Editing
            }
            Self::AddStation(form) => {
                form.handle(action);
                Outcome::Editing
            }
        }
    }
}

/// Apply typing/backspace to `text`. Returns whether it changed.
fn edit(text: &mut String, action: &Action, accept: impl Fn(char) -> bool) -> bool {
    match action {
        Action::Type(c) if accept(*c) && text.chars().count() < MAX_INPUT => {
            text.push(*c);
            true
        }
        Action::Backspace => text.pop().is_some(),
        _ => false,
    }
}

/// Parse the report dialog's value.
pub fn parse_report(value: &str) -> Result<i64, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a whole number"))
}

// ── Add-station form ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Name,
    Transport,
    Capacity,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StationForm {
    pub name: String,
    /// Index into `TransportType::ALL`.
    pub transport: usize,
    pub capacity: String,
    pub field: Field,
}

impl StationForm {
    pub fn transport(&self) -> TransportType {
        TransportType::ALL
            .get(self.transport)
            .copied()
            .unwrap_or(TransportType::Bus)
    }

    fn handle(&mut self, action: &Action) {
        match (self.field, action) {
            (_, Action::NextField) => {
                self.field = match self.field {
                    Field::Name => Field::Transport,
                    Field::Transport => Field::Capacity,
                    Field::Capacity => Field::Name,
                };
            }
            (Field::Transport, Action::Cycle(step)) => {
                let n = TransportType::ALL.len();
                let step = if *step < 0 { n - 1 } else { 1 };
                self.transport = (self.transport + step) % n;
            }
            (Field::Name, _) => {
                edit(&mut self.name, action, |_| true);
            }
            (Field::Capacity, _) => {
                edit(&mut self.capacity, action, |c| c.is_ascii_digit());
            }
            (Field::Transport, _) => {}
        }
    }

    /// Build the draft; the shell validates the values.
    pub fn draft(&self, location: LatLng) -> Result<StationDraft, String> {
        let capacity = self
            .capacity
            .trim()
            .parse()
            .map_err(|_| "capacity must be a whole number".to_owned())?;
        Ok(StationDraft {
            name: self.name.clone(),
            transport: self.transport(),
            location,
            capacity,
            available: None,
            owner_id: None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn type_str(prompt: &mut Prompt, text: &str) -> Outcome {
        text.chars()
            .map(|c| prompt.handle(&Action::Type(c)))
            .last()
            .unwrap_or(Outcome::Editing)
    }

    #[test]
    fn search_reports_every_change() {
        let mut prompt = Prompt::Search(String::new());
        assert_eq!(type_str(&mut prompt, "mod"), Outcome::SearchChanged("mod".into()));
        assert_eq!(prompt.handle(&Action::Backspace), Outcome::SearchChanged("mo".into()));
        assert_eq!(prompt.handle(&Action::NextField), Outcome::Editing);
        assert_eq!(prompt.handle(&Action::Cancel), Outcome::Cancelled);
    }

    #[test]
    fn report_accepts_digits_and_sign_only() {
        let mut prompt = Prompt::Report {
            station: "Moda".into(),
            value: String::new(),
        };
        type_str(&mut prompt, "-1x2");
        let Prompt::Report { value, .. } = &prompt else { unreachable!() };
        assert_eq!(value, "-12");
        assert_eq!(parse_report(value), Ok(-12));
        assert!(parse_report("").is_err());
    }

    #[test]
    fn form_moves_between_fields_and_builds_a_draft() {
        let mut prompt = Prompt::AddStation(StationForm::default());
        type_str(&mut prompt, "Moda");
        prompt.handle(&Action::NextField);
        prompt.handle(&Action::Cycle(1));
        prompt.handle(&Action::NextField);
        type_str(&mut prompt, "2a0");

        let Prompt::AddStation(form) = &prompt else { unreachable!() };
        assert_eq!(form.transport(), TransportType::Metro);
        let draft = form.draft(LatLng::new(40.98, 29.03)).unwrap();
        assert_eq!(draft.name, "Moda");
        assert_eq!(draft.capacity, 20);
        assert_eq!(draft.effective_available(), 10);
    }

    #[test]
    fn transport_cycles_backwards_through_the_list() {
        let mut form = StationForm {
            field: Field::Transport,
            ..StationForm::default()
        };
        form.handle(&Action::Cycle(-1));
        assert_eq!(form.transport(), TransportType::Dolmus);
        assert!(form.draft(LatLng::new(0.0, 0.0)).is_err());
    }
}
