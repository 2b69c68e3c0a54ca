use std::path::PathBuf;

/// ライブラリ全体のエラー型
///
/// ディレクトリ単位の中断が必要なもの（a）と、1ファイル単位で
/// 記録して続行するもの（b）の両方をここで表す。
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    #[error("ディレクトリが存在しません: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("指定されたパスはディレクトリではありません: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("設定値が不正です: {0}")]
    InvalidConfig(String),

    #[error("設定ファイルの読み込みに失敗しました: {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("アノテーションの読み込みに失敗しました: {path}: {message}")]
    Annotation { path: PathBuf, message: String },

    #[error("画像ファイルが見つかりません: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("画像のデコードに失敗しました: {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("動画の処理に失敗しました: {0}")]
    Video(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type PrepResult<T> = std::result::Result<T, PrepError>;
