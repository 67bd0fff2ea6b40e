//! 新旧目录树比较、空目录清理与增量包生成流程

mod compare;
mod pipeline;
mod prune;

pub use compare::{CompareSummary, DirectoryPair, TreeComparator};
pub use pipeline::{DeltaPipeline, DeltaReport, PipelineError, Stage};
pub use prune::prune_empty_dirs;
