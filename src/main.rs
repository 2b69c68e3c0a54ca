use clap::{Parser, Subcommand};
use dataset_prep::cli::{AdjustArgs, ConfigArgs, ExtractArgs, RotateArgs, VisualizeArgs};
use dataset_prep::config::AppConfig;
use dataset_prep::logging;
use std::path::PathBuf;

/// 画像・動画データセット準備ツール
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// ディレクトリ内の画像を180度回転（上書き）
    Rotate(RotateArgs),
    /// 明るさ・彩度を調整して別ディレクトリに保存
    Adjust(AdjustArgs),
    /// 動画からフレームを抽出
    Extract(ExtractArgs),
    /// LabelMe アノテーションのマスクを可視化
    Visualize(VisualizeArgs),
    /// デフォルト設定ファイルを生成
    InitConfig {
        /// 出力先（省略時は dataset_prep.toml）
        path: Option<PathBuf>,
    },
    /// 現在の設定を表示
    ShowConfig,
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig { path } => {
            let path = path.unwrap_or_else(AppConfig::default_path);
            AppConfig::default().save(&path)?;
            println!("✓ デフォルト設定ファイルを生成しました: {}", path.display());
        }
        Command::ShowConfig => cli.config.load()?.display(),
        Command::Rotate(args) => {
            args.run(&cli.config.load()?)?;
        }
        Command::Adjust(args) => {
            args.run(&cli.config.load()?)?;
        }
        Command::Extract(args) => {
            args.run(&cli.config.load()?)?;
        }
        Command::Visualize(args) => {
            args.run(&cli.config.load()?)?;
        }
    }

    Ok(())
}
