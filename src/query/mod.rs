//! Query-side paging stages layered over a `PageSource`.

mod offset_limit;

pub use offset_limit::{OffsetLimit, OffsetLimitPager};
