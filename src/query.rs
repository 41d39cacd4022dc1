//! Intermediate query representation and its compiler.

pub mod compile;
pub mod condition;
pub mod criteria;
pub mod iqo;

pub use compile::{
    compile, compile_count, compile_fingerprint, compile_incremental, CompiledQuery,
    WATERMARK_ALIAS,
};
pub use condition::{Condition, FilterValue, JoinSpec, OrGroup, OrderBy, RangeOp, SortDirection};
pub use criteria::{Criteria, CriteriaValue, ResolvedCriteria};
pub use iqo::QueryObject;
