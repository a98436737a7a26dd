// Improvement Viewer - Core Library
// Exposes all modules for use in the interactive viewer, CLI queries, and tests

pub mod config;
pub mod entry;    // Data Mapper: rows → entries, month derivation
pub mod error;
pub mod images;
pub mod month;
pub mod row;      // Store boundary: key normalization
pub mod session;  // Session cursor + screen state machine
pub mod sheets;   // HTTP EntryStore
pub mod store;    // EntryStore trait + registration race isolation
pub mod workflow;

// Re-export commonly used types
pub use config::{Cli, Command, StoreConfig};
pub use entry::{
    derive_month, filter_entries_by_month, format_date_time, map_rows,
    month_from_calendar, month_from_name_scan, month_from_numeric_pattern,
    ImprovementEntry,
};
pub use error::{LoadError, Result as StoreResult, StoreError};
pub use images::direct_image_url;
pub use month::Month;
pub use row::RowRecord;
pub use session::{InputForm, Screen, Session, Step, ViewSession};
pub use sheets::SheetsStore;
pub use store::{fail_open, EntryStore, RegistrationOutcome};
pub use workflow::{
    sanitize_identifier_input, validate_identifier, Advance, Registration,
    RegistrationResult, RegistrationStatus, SubmitError, Workflow, IDENTIFIER_LEN,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
