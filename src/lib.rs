//! Query compilation and polling-based live queries over an embedded SQL store.

pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod expression;
pub mod query;
pub mod reactive;
pub mod row;
pub mod value;

pub use builder::{JoinTarget, QueryBuilder};
pub use config::LiveConfig;
pub use error::{QueryError, Result};
pub use executor::{
    ConditionResolver, Executor, JoinKeys, JoinResolver, QueryContext, RelatedLoader, RelatedRows,
    RevisionSource,
};
pub use expression::{Expression, ExpressionBuilder};
pub use query::{Criteria, QueryObject, SortDirection};
pub use reactive::{PollSnapshot, RevisionCounter, Subscription};
pub use row::Row;
pub use value::Value;
