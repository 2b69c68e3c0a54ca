//! LabelMe アノテーションからマスクを合成し、元画像・マスク・重ね合わせを
//! 横に並べた画像を保存する
//!
//! # 使用方法
//! ```bash
//! # 1ファイル
//! cargo run --bin visualize_mask -- data/mask_json/IMG_0001.json --image data/IMG_0001.jpg
//!
//! # ディレクトリ内の全 JSON
//! cargo run --bin visualize_mask -- --annotation-dir data/mask_json --save-mask
//! ```

use clap::Parser;
use dataset_prep::cli::{ConfigArgs, VisualizeArgs};
use dataset_prep::logging;

#[derive(Debug, Parser)]
#[command(about = "LabelMe アノテーションのマスクを可視化")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    args: VisualizeArgs,
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = cli.config.load()?;
    cli.args.run(&config)?;

    Ok(())
}
