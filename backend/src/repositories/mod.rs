pub mod criteria;
pub mod pg_store;
pub mod repository;
pub mod transaction;

pub use criteria::{Condition, Criteria, Direction, Scope, Value};
pub use pg_store::PgStore;
pub use repository::*;
pub use transaction::*;
