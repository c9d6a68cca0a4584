//! CQL statement generation.
//!
//! Pure text builders: every function takes already-validated schema data
//! and returns a [`Statement`](siren_commons::Statement). Nothing here
//! touches a session; the client crate decides what to execute.

pub mod ddl;
pub mod dml;
