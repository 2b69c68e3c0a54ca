//! デフォルト設定ファイル（dataset_prep.toml）を生成するユーティリティ
//!
//! ツールごとに `[rotate]` `[adjust]` `[extract]` `[visualize]` の
//! セクションが書き出される。
//!
//! # 使用方法
//! ```bash
//! cargo run --bin create_default_config
//! DATASET_PREP_CONFIG=conf/prep.toml cargo run --bin create_default_config
//! ```

use dataset_prep::config::AppConfig;

fn main() -> anyhow::Result<()> {
    println!("=== デフォルト設定ファイル生成 ===\n");

    let config = AppConfig::default();

    // 設定内容を表示
    config.display();

    // 設定ファイルを保存
    let path = AppConfig::default_path();
    config.save(&path)?;

    println!("✓ デフォルト設定ファイルを生成しました: {}", path.display());
    println!();
    println!("各セクションの内容:");
    println!("  [rotate]    画像回転（対象ディレクトリ、拡張子、JPEG品質）");
    println!("  [adjust]    明るさ・彩度調整（入出力ディレクトリ、係数）");
    println!("  [extract]   動画フレーム抽出（動画・出力ディレクトリ、抽出間隔、縦長回転）");
    println!("  [visualize] アノテーション可視化（JSON・出力ディレクトリ、色、重ね合わせの強さ）");
    println!();
    println!("設定ファイルを編集して、各ツールの入出力ディレクトリや係数を変更できます。");
    println!("コマンドライン引数を指定した場合はそちらが優先されます。");

    Ok(())
}
