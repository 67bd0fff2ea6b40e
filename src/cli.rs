use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 发布包增量生成工具
#[derive(Parser)]
#[command(name = "extract-diff")]
#[command(about = "对比两个版本的发布包，只打包新增或修改过的文件", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 为新版本生成与同一 minor 系列所有旧补丁版本之间的增量包
    Release {
        /// 新版本号或新版本的包文件名
        new_version: String,
        /// 工作目录，存放发布包与生成的增量包
        #[arg(short, long)]
        working_dir: Option<PathBuf>,
        /// 包名，例如 UmbracoCms
        #[arg(short, long)]
        package_name: Option<String>,
        /// 包文件名中版本号之前的部分，默认为 "<包名>."
        #[arg(long)]
        package_name_part: Option<String>,
        /// 下载地址模板，`{version}` 会被替换为版本号
        #[arg(long)]
        download_url: Option<String>,
        /// 配置文件路径
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// 对比两个版本的压缩包，生成增量包
    Diff {
        /// 旧版本压缩包
        old_archive: PathBuf,
        /// 新版本压缩包
        new_archive: PathBuf,
        /// 输出增量包路径
        #[arg(short, long)]
        output: PathBuf,
    },
    /// 将目录打包为 zip
    Pack {
        /// 源目录
        source_dir: PathBuf,
        /// 输出压缩包路径
        #[arg(short, long)]
        output: PathBuf,
    },
    /// 解压 zip 到目录
    Unpack {
        /// 压缩包路径
        archive: PathBuf,
        /// 输出目录
        #[arg(short, long)]
        output: PathBuf,
    },
}
