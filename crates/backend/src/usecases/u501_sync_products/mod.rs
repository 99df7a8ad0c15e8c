pub mod error;
pub mod executor;
pub mod raw_row;
pub mod row_mapper;
pub mod sheets_api_client;
pub mod status_tracker;

pub use error::{RejectionReason, SyncError};
pub use executor::{SyncExecutor, SyncOutcome, SyncSettings};
pub use raw_row::{CellValue, RawRow};
pub use row_mapper::{ColumnLayout, MappingSummary, RowMapper};
pub use sheets_api_client::{SheetsApiClient, SourceReader};
pub use status_tracker::StatusTracker;
