//! 按版本号批量生成增量包

mod batch;
mod source;
mod version;

pub use batch::{BatchReport, PairFailure, ReleaseDiff};
pub use source::{HttpSource, LocalSource, PackageSource};
pub use version::PackageVersion;
