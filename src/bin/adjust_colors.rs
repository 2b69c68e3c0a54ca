//! 画像の明るさ・彩度を調整して別ディレクトリに保存する
//!
//! # 使用方法
//! ```bash
//! cargo run --bin adjust_colors -- data/frames data/enhanced --saturation 1.4
//! ```

use clap::Parser;
use dataset_prep::cli::{AdjustArgs, ConfigArgs};
use dataset_prep::logging;

#[derive(Debug, Parser)]
#[command(about = "画像の明るさ・彩度を調整")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    args: AdjustArgs,
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = cli.config.load()?;
    cli.args.run(&config)?;

    Ok(())
}
