//! Reading the mirror: conditions, record resolution and row events
//!
//! - [`condition`]: materialized column values and `=` / `!=` matching
//! - [`resolver`]: turning uuids and names into rows via per-table strategies
//! - [`event`]: watching row changes and dispatching them off-thread

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod condition;
pub mod event;
pub mod resolver;

pub use condition::{condition_match, get_column_value, row_match, Condition, Operator};
pub use event::{ConditionalRowEvent, RowEvent, RowEventHandler};
pub use resolver::{resolve, row_by_value, try_row_by_value, LookupTable, Record, Resolver, RowLookup};
