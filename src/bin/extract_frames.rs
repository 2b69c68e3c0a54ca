//! ディレクトリ内の動画からフレームを抽出する
//!
//! # 使用方法
//! ```bash
//! # 全フレームを抽出
//! cargo run --bin extract_frames -- data/videos data/frames
//!
//! # 3フレームごとに抽出し、横長フレームは回転しない
//! cargo run --bin extract_frames -- data/videos data/frames --interval 3 --no-reorient
//! ```

use clap::Parser;
use dataset_prep::cli::{ConfigArgs, ExtractArgs};
use dataset_prep::logging;

#[derive(Debug, Parser)]
#[command(about = "動画からフレームを抽出")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    args: ExtractArgs,
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = cli.config.load()?;
    cli.args.run(&config)?;

    Ok(())
}
