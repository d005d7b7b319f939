pub mod export_service;
pub mod failure_writer;
pub mod lookup_service;
pub mod response_parser;
pub mod row_matcher;
pub mod row_merger;
pub mod sheet_service;

pub use export_service::{bulk_copy_payload, export_grid, export_to_path, BulkCopyEntry};
pub use failure_writer::FailureWriter;
pub use lookup_service::{CompanyLookup, LookupService, RetryPolicy};
pub use row_matcher::{find_insertion_point, find_match, MatchIndex};
pub use row_merger::{merge, reconcile, RowChange};
pub use sheet_service::{import_sheet, load_reference_table, SheetFetch, SheetImport, SheetService};
