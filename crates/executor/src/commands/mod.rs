//! Generic commands, grouped by what they do to rows
//!
//! | Module | Commands | Effect |
//! |--------|----------|--------|
//! | `create` | `DbCreate` | insert a row |
//! | `modify` | `DbSet`, `DbAdd`, `DbClear` | write columns |
//! | `destroy` | `DbDestroy` | delete a row |
//! | `query` | `DbGet`, `DbFind`, `DbList` | read rows |
//!
//! Every command addresses rows through the record resolver and filters
//! through `row_match`, so none of them knows any particular schema.

pub mod create;
pub mod destroy;
pub mod modify;
pub mod query;

pub use create::DbCreate;
pub use destroy::DbDestroy;
pub use modify::{DbAdd, DbClear, DbSet};
pub use query::{row_view, DbFind, DbGet, DbList};
