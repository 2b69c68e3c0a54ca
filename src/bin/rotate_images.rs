//! ディレクトリ内の画像を180度回転して上書き保存する
//!
//! # 使用方法
//! ```bash
//! cargo run --bin rotate_images -- data/frames
//! ```

use clap::Parser;
use dataset_prep::cli::{ConfigArgs, RotateArgs};
use dataset_prep::logging;

#[derive(Debug, Parser)]
#[command(about = "ディレクトリ内の画像を180度回転（上書き）")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    args: RotateArgs,
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = cli.config.load()?;
    cli.args.run(&config)?;

    Ok(())
}
