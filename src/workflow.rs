// 🔁 Session Workflow
// Validation, registration check, month loading, slide navigation and the
// completion commit. Every remote fault is turned into a domain outcome here;
// only entry loading hands a store error back (inside LoadError).

use crate::entry::{filter_entries_by_month, map_rows, ImprovementEntry};
use crate::error::LoadError;
use crate::month::Month;
use crate::row::{keys, RowRecord};
use crate::session::{Session, Step};
use crate::store::{fail_open, EntryStore, RegistrationOutcome};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub const IDENTIFIER_LEN: usize = 8;

lazy_static! {
    static ref IDENTIFIER_PATTERN: Regex = Regex::new(r"^\d{8}$").unwrap();
}

// ============================================================================
// IDENTIFIER
// ============================================================================

/// Exactly eight ASCII digits, nothing else
pub fn validate_identifier(raw: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(raw)
}

/// What the input field keeps of typed text: digits only, at most eight
pub fn sanitize_identifier_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(IDENTIFIER_LEN)
        .collect()
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Recorded identifier/month pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub id: String,
    pub month: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a completion commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Registration>,
}

impl RegistrationResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Registration lookup for status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub is_registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,
    pub message: String,
}

/// Why the input form could not start a session
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid identifier")]
    InvalidIdentifier,

    #[error("no month selected")]
    MonthRequired,

    #[error("ID {id} already completed {month}")]
    AlreadyCompleted { id: String, month: Month },

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl SubmitError {
    /// Message shown over the input form
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::InvalidIdentifier => "ID Number must be exactly 8 digits.".to_string(),
            SubmitError::MonthRequired => "Please select a month.".to_string(),
            SubmitError::AlreadyCompleted { id, month } => format!(
                "ID {} has already completed viewing entries for {}. Each ID can only view entries once per month.",
                id, month
            ),
            SubmitError::Load(e) => e.user_message(),
        }
    }
}

/// Result of pressing "next"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    /// The last slide was passed and completion was committed
    Completed(RegistrationResult),
}

// ============================================================================
// WORKFLOW
// ============================================================================

/// Workflow operations over an injected entry store
#[derive(Clone)]
pub struct Workflow {
    store: Arc<dyn EntryStore>,
}

impl Workflow {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    /// Whether the pair is on record; store faults count as "no"
    pub async fn check_already_registered(&self, id: &str, month: Month) -> bool {
        fail_open(self.store.is_registered(id, month.name()).await, id, month.name())
    }

    /// The month's entries in sheet order
    ///
    /// `LoadError::NoEntries` when the store answered but nothing matched;
    /// `LoadError::Unavailable` when the store could not be read.
    pub async fn load_entries(&self, month: Month) -> Result<Vec<ImprovementEntry>, LoadError> {
        let rows = self.store.fetch_rows().await.map_err(|e| {
            error!(month = %month, error = %e, "Error fetching entries from sheet");
            LoadError::Unavailable(e)
        })?;

        let entries = filter_entries_by_month(&map_rows(&rows), month.name());
        info!(month = %month, rows = rows.len(), matched = entries.len(), "Entries loaded");

        if entries.is_empty() {
            return Err(LoadError::NoEntries(month));
        }
        Ok(entries)
    }

    /// Input form submit: validate, check registration, load the month
    pub async fn start_session(&self, raw_id: &str, month: Option<Month>) -> Result<Session, SubmitError> {
        if !validate_identifier(raw_id) {
            return Err(SubmitError::InvalidIdentifier);
        }
        let month = month.ok_or(SubmitError::MonthRequired)?;

        if self.check_already_registered(raw_id, month).await {
            warn!(id = %raw_id, month = %month, "ID already completed this month");
            return Err(SubmitError::AlreadyCompleted {
                id: raw_id.to_string(),
                month,
            });
        }

        let entries = self.load_entries(month).await?;
        Session::new(raw_id, month, entries).ok_or(SubmitError::Load(LoadError::NoEntries(month)))
    }

    /// Next slide, or commit completion when already on the last one
    pub async fn advance(&self, session: &mut Session) -> Advance {
        match session.step_forward() {
            Step::Moved(position) => Advance::Moved(position),
            Step::AtEnd => {
                let result = self
                    .commit_completion(session.id_number(), session.month().name())
                    .await;
                Advance::Completed(result)
            }
        }
    }

    /// Previous slide; no-op on the first
    pub fn retreat(&self, session: &mut Session) -> bool {
        session.retreat()
    }

    /// Record that `id` finished `month`, unless it already did
    ///
    /// Never errors: failures come back as `success == false`.
    pub async fn commit_completion(&self, id: &str, month: &str) -> RegistrationResult {
        let id = id.trim();
        let month = month.trim();
        if id.is_empty() || month.is_empty() {
            return RegistrationResult::failure("ID Number and Month are required.");
        }

        info!(id = %id, month = %month, "Attempting to register");

        match self.store.register_if_absent(id, month).await {
            Ok(RegistrationOutcome::AlreadyRegistered) => {
                warn!(id = %id, month = %month, "Registration denied: already registered");
                RegistrationResult::failure(format!(
                    "This ID has already been registered for {}. Duplicate registrations are not allowed.",
                    month
                ))
            }
            Ok(RegistrationOutcome::Recorded { recorded_at }) => {
                info!(id = %id, month = %month, "Registration successful");
                RegistrationResult {
                    success: true,
                    message: format!("Registration successful for ID {} in {}.", id, month),
                    data: Some(Registration {
                        id: id.to_string(),
                        month: month.to_string(),
                        timestamp: recorded_at,
                    }),
                }
            }
            Err(e) => {
                error!(id = %id, month = %month, error = %e, "Registration failed");
                RegistrationResult::failure(format!("Registration failed: {}", e))
            }
        }
    }

    /// Every row whose canonical `id` column equals `id`
    pub async fn registrations_by_id(&self, id: &str) -> crate::error::Result<Vec<RowRecord>> {
        let id = id.trim();
        let rows = self.store.fetch_rows().await?;
        Ok(rows.into_iter().filter(|r| r.get(keys::ID) == Some(id)).collect())
    }

    /// Every row whose canonical `month` column equals `month`
    pub async fn registrations_by_month(&self, month: &str) -> crate::error::Result<Vec<RowRecord>> {
        let month = month.trim();
        let rows = self.store.fetch_rows().await?;
        Ok(rows.into_iter().filter(|r| r.get(keys::MONTH) == Some(month)).collect())
    }

    /// Registration state with the recorded date when available; never errors
    pub async fn registration_status(&self, id: &str, month: Month) -> RegistrationStatus {
        let id = id.trim();

        if !self.check_already_registered(id, month).await {
            return RegistrationStatus {
                is_registered: false,
                registration_date: None,
                message: format!("ID {} is available for registration in {}", id, month),
            };
        }

        let registration_date = match self.registrations_by_id(id).await {
            Ok(rows) => rows
                .iter()
                .find(|r| r.get(keys::MONTH) == Some(month.name()))
                .and_then(|r| r.get(keys::TIMESTAMP))
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            Err(e) => {
                warn!(id = %id, error = %e, "Could not look up registration date");
                None
            }
        };

        RegistrationStatus {
            is_registered: true,
            registration_date,
            message: format!("ID {} is already registered for {}", id, month),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result as StoreResult, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory store counting every remote call
    #[derive(Default)]
    struct FakeStore {
        rows: Vec<RowRecord>,
        registered: Mutex<Vec<(String, String)>>,
        fetch_fails: bool,
        check_fails: bool,
        write_fails: bool,
        fetch_calls: AtomicUsize,
        check_calls: AtomicUsize,
        write_calls: AtomicUsize,
    }

    impl FakeStore {
        fn with_rows(rows: Vec<RowRecord>) -> Self {
            Self {
                rows,
                ..Default::default()
            }
        }

        fn register(self, id: &str, month: &str) -> Self {
            self.registered.lock().unwrap().push((id.to_string(), month.to_string()));
            self
        }
    }

    #[async_trait]
    impl EntryStore for FakeStore {
        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }

        async fn fetch_rows(&self) -> StoreResult<Vec<RowRecord>> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fetch_fails {
                return Err(StoreError::Transport("connection refused".to_string()));
            }
            Ok(self.rows.clone())
        }

        async fn is_registered(&self, id: &str, month: &str) -> StoreResult<bool> {
            self.check_calls.fetch_add(1, Ordering::SeqCst);
            if self.check_fails {
                return Err(StoreError::Timeout("checkId".to_string()));
            }
            Ok(self
                .registered
                .lock()
                .unwrap()
                .iter()
                .any(|(i, m)| i == id && m == month))
        }

        async fn record_timestamp(&self, id: &str, month: &str) -> StoreResult<()> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            if self.write_fails {
                return Err(StoreError::Remote("Sheet is locked".to_string()));
            }
            self.registered.lock().unwrap().push((id.to_string(), month.to_string()));
            Ok(())
        }
    }

    fn entry_row(title: &str, date_time: &str) -> RowRecord {
        RowRecord::from_pairs([("Entry Title", title), ("Date and Time", date_time)])
    }

    /// Five May rows and one June row, June in the middle
    fn may_june_rows() -> Vec<RowRecord> {
        vec![
            entry_row("m1", "05-01-2025"),
            entry_row("m2", "2025-05-02"),
            entry_row("j1", "06-10-2025"),
            entry_row("m3", "May audit"),
            entry_row("m4", "5/20/2025 09:00:00"),
            entry_row("m5", "05/31/2025"),
        ]
    }

    fn workflow(store: FakeStore) -> (Workflow, Arc<FakeStore>) {
        let store = Arc::new(store);
        (Workflow::new(store.clone()), store)
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("12345678"));
        assert!(!validate_identifier("1234567"));
        assert!(!validate_identifier("1234567a"));
        assert!(!validate_identifier("123456789"));
        assert!(!validate_identifier(" 12345678"));
        assert!(!validate_identifier(""));
    }

    #[test]
    fn test_sanitize_identifier_input() {
        assert_eq!(sanitize_identifier_input("12-34 56a78"), "12345678");
        assert_eq!(sanitize_identifier_input("1234567890"), "12345678");
        assert_eq!(sanitize_identifier_input("abc"), "");
    }

    #[tokio::test]
    async fn test_load_entries_filters_month_in_order() {
        let (wf, _) = workflow(FakeStore::with_rows(may_june_rows()));

        let may = wf.load_entries(Month::May).await.unwrap();
        let titles: Vec<&str> = may.iter().map(|e| e.entry_title.as_str()).collect();

        assert_eq!(titles, vec!["m1", "m2", "m3", "m4", "m5"]);
        assert_eq!(may[0].id, "entry-1");
        assert_eq!(may[2].id, "entry-4");
    }

    #[tokio::test]
    async fn test_load_entries_is_repeatable() {
        let (wf, store) = workflow(FakeStore::with_rows(may_june_rows()));

        let first = wf.load_entries(Month::May).await.unwrap();
        let second = wf.load_entries(Month::May).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_entries_empty_vs_unavailable() {
        let (wf, _) = workflow(FakeStore::with_rows(may_june_rows()));
        let empty = wf.load_entries(Month::July).await.unwrap_err();
        assert!(matches!(empty, LoadError::NoEntries(Month::July)));

        let (wf, _) = workflow(FakeStore {
            fetch_fails: true,
            ..Default::default()
        });
        let down = wf.load_entries(Month::May).await.unwrap_err();
        assert!(matches!(down, LoadError::Unavailable(StoreError::Transport(_))));
    }

    #[tokio::test]
    async fn test_check_fails_open() {
        let (wf, store) = workflow(
            FakeStore {
                check_fails: true,
                ..Default::default()
            }
            .register("12345678", "May"),
        );

        assert!(!wf.check_already_registered("12345678", Month::May).await);
        assert_eq!(store.check_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_commit_refuses_duplicate_without_write() {
        let (wf, store) = workflow(FakeStore::default().register("12345678", "May"));

        assert!(wf.check_already_registered("12345678", Month::May).await);
        let result = wf.commit_completion("12345678", "May").await;

        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(
            result.message,
            "This ID has already been registered for May. Duplicate registrations are not allowed."
        );
        assert_eq!(store.write_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_records_and_trims() {
        let (wf, store) = workflow(FakeStore::default());

        let result = wf.commit_completion(" 12345678 ", "May ").await;

        assert!(result.success);
        assert_eq!(result.message, "Registration successful for ID 12345678 in May.");
        let data = result.data.unwrap();
        assert_eq!(data.id, "12345678");
        assert_eq!(data.month, "May");
        assert_eq!(
            store.registered.lock().unwrap().as_slice(),
            &[("12345678".to_string(), "May".to_string())]
        );
    }

    #[tokio::test]
    async fn test_commit_requires_id_and_month() {
        let (wf, store) = workflow(FakeStore::default());

        let result = wf.commit_completion("  ", "May").await;

        assert!(!result.success);
        assert_eq!(result.message, "ID Number and Month are required.");
        assert_eq!(store.check_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_write_failure_is_observable() {
        let (wf, _) = workflow(FakeStore {
            write_fails: true,
            ..Default::default()
        });

        let result = wf.commit_completion("12345678", "May").await;

        assert!(!result.success);
        assert!(result.message.starts_with("Registration failed:"));
        assert!(result.message.contains("Sheet is locked"));
    }

    #[tokio::test]
    async fn test_start_session_validation_before_remote() {
        let (wf, store) = workflow(FakeStore::with_rows(may_june_rows()));

        let err = wf.start_session("1234567", Some(Month::May)).await.unwrap_err();
        assert!(matches!(err, SubmitError::InvalidIdentifier));

        let err = wf.start_session("12345678", None).await.unwrap_err();
        assert!(matches!(err, SubmitError::MonthRequired));

        assert_eq!(store.check_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_session_already_completed() {
        let (wf, store) = workflow(FakeStore::with_rows(may_june_rows()).register("12345678", "May"));

        let err = wf.start_session("12345678", Some(Month::May)).await.unwrap_err();

        assert!(err.user_message().starts_with("ID 12345678 has already completed viewing entries for May."));
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_advance_at_last_commits() {
        let (wf, store) = workflow(FakeStore::with_rows(may_june_rows()));
        let mut session = wf.start_session("12345678", Some(Month::June)).await.unwrap();
        assert_eq!(session.len(), 1);

        match wf.advance(&mut session).await {
            Advance::Completed(result) => assert!(result.success),
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(session.position(), 0);
        assert_eq!(store.write_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_advance_and_retreat_walk_slides() {
        let (wf, store) = workflow(FakeStore::with_rows(may_june_rows()));
        let mut session = wf.start_session("12345678", Some(Month::May)).await.unwrap();

        assert_eq!(wf.advance(&mut session).await, Advance::Moved(1));
        assert!(wf.retreat(&mut session));
        assert!(!wf.retreat(&mut session));
        assert_eq!(session.position(), 0);
        assert_eq!(store.write_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registration_history_and_status() {
        let rows = vec![
            RowRecord::from_pairs([("ID", "12345678"), ("Month", "May"), ("Timestamp", "2025-05-31T10:00:00Z")]),
            RowRecord::from_pairs([("idNumber", "12345678"), ("monthData", "June"), ("Date", "2025-06-30")]),
            RowRecord::from_pairs([("id", "87654321"), ("month", "May")]),
        ];
        let (wf, _) = workflow(FakeStore::with_rows(rows).register("12345678", "May"));

        assert_eq!(wf.registrations_by_id("12345678").await.unwrap().len(), 2);
        assert_eq!(wf.registrations_by_month("May").await.unwrap().len(), 2);

        let status = wf.registration_status("12345678", Month::May).await;
        assert!(status.is_registered);
        assert_eq!(status.registration_date.as_deref(), Some("2025-05-31T10:00:00Z"));

        let status = wf.registration_status("87654321", Month::June).await;
        assert!(!status.is_registered);
        assert_eq!(status.message, "ID 87654321 is available for registration in June");
    }
}
