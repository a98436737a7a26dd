// 🎞️ Session & Screen State
// Input → Viewing → Completed, with Viewing → Input (back) and
// Completed → Input (reset) as the only ways back.

use crate::entry::ImprovementEntry;
use crate::month::Month;
use crate::workflow::RegistrationResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SESSION
// ============================================================================

/// One viewing attempt over a month's entries
///
/// Never empty, so `position < len()` always holds.
#[derive(Debug, Clone)]
pub struct Session {
    id_number: String,
    month: Month,
    entries: Vec<ImprovementEntry>,
    position: usize,
}

/// Result of moving forward one slide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(usize),
    /// Already on the last slide; the caller completes the session
    AtEnd,
}

impl Session {
    /// None when there is nothing to show
    pub fn new(id_number: impl Into<String>, month: Month, entries: Vec<ImprovementEntry>) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        Some(Self {
            id_number: id_number.into(),
            month,
            entries,
            position: 0,
        })
    }

    pub fn id_number(&self) -> &str {
        &self.id_number
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn entries(&self) -> &[ImprovementEntry] {
        &self.entries
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> &ImprovementEntry {
        &self.entries[self.position]
    }

    pub fn is_first(&self) -> bool {
        self.position == 0
    }

    pub fn is_last(&self) -> bool {
        self.position + 1 == self.entries.len()
    }

    /// Share of slides seen, current one included (0.0 - 1.0)
    pub fn progress(&self) -> f64 {
        (self.position + 1) as f64 / self.entries.len() as f64
    }

    pub fn step_forward(&mut self) -> Step {
        if self.position + 1 < self.entries.len() {
            self.position += 1;
            Step::Moved(self.position)
        } else {
            Step::AtEnd
        }
    }

    /// No-op on the first slide; returns whether the position changed
    pub fn retreat(&mut self) -> bool {
        if self.position > 0 {
            self.position -= 1;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// COMPLETED VIEWING
// ============================================================================

/// Summary of a finished viewing, shown on the completion screen
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSession {
    pub id: Uuid,
    pub id_number: String,
    pub month: Month,
    pub entries_viewed: usize,
    pub completed_at: DateTime<Utc>,
    pub registration: RegistrationResult,
}

impl ViewSession {
    pub fn from_session(session: &Session, registration: RegistrationResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            id_number: session.id_number.clone(),
            month: session.month,
            entries_viewed: session.len(),
            completed_at: Utc::now(),
            registration,
        }
    }
}

// ============================================================================
// SCREEN STATE MACHINE
// ============================================================================

/// Input form contents plus the error overlay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputForm {
    pub id_number: String,
    pub month: Option<Month>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Screen {
    Input(InputForm),
    Viewing(Session),
    Completed(ViewSession),
}

impl Default for Screen {
    fn default() -> Self {
        Screen::Input(InputForm::default())
    }
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Input(_) => "input",
            Screen::Viewing(_) => "viewing",
            Screen::Completed(_) => "completed",
        }
    }

    /// Input → Viewing
    pub fn begin(&mut self, session: Session) -> bool {
        if matches!(self, Screen::Input(_)) {
            *self = Screen::Viewing(session);
            true
        } else {
            false
        }
    }

    /// Viewing → Completed
    pub fn complete(&mut self, summary: ViewSession) -> bool {
        if matches!(self, Screen::Viewing(_)) {
            *self = Screen::Completed(summary);
            true
        } else {
            false
        }
    }

    /// Viewing → Input; the session is discarded
    pub fn back(&mut self) -> bool {
        if matches!(self, Screen::Viewing(_)) {
            *self = Screen::default();
            true
        } else {
            false
        }
    }

    /// Completed → Input
    pub fn reset(&mut self) -> bool {
        if matches!(self, Screen::Completed(_)) {
            *self = Screen::default();
            true
        } else {
            false
        }
    }

    /// Show an error over the input form; ignored on other screens
    pub fn show_error(&mut self, message: impl Into<String>) {
        if let Screen::Input(form) = self {
            form.error = Some(message.into());
        }
    }

    pub fn clear_error(&mut self) {
        if let Screen::Input(form) = self {
            form.error = None;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
