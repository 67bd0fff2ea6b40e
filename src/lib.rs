//! # Extract Diff
//!
//! 发布包增量生成工具库
//!
//! ## 功能
//!
//! - 对比新旧两个版本解压后的目录，只保留新增或内容发生变化的文件
//! - 清理增量目录中不含任何文件的空目录
//! - 流式解压与打包 zip，单个条目的内存占用受固定缓冲区限制
//! - 按版本号为同一 minor 系列的每个旧补丁版本批量生成增量包
//!
//! ## 使用示例
//!
//! ```no_run
//! use extract_diff::delta::DeltaPipeline;
//! use std::path::Path;
//!
//! let report = DeltaPipeline::default()
//!     .run(
//!         Path::new("UmbracoCms.7.12.1.zip"),
//!         Path::new("UmbracoCms.7.12.2.zip"),
//!         Path::new("UmbracoCms.Diff.7.12.1-7.12.2.zip"),
//!     )
//!     .unwrap();
//! println!("{} 个文件", report.copied_files);
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod delta;
pub mod error;
pub mod release;
pub mod utils;

// 重新导出常用类型
pub use archive::{ArchiveCodec, ArchiveEntry};
pub use delta::{DeltaPipeline, DeltaReport, TreeComparator, prune_empty_dirs};
pub use error::{Error, Result};
pub use release::{PackageVersion, ReleaseDiff};
