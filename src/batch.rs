use crate::error::{PrepError, PrepResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 1ファイルの処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Processed,
    /// 失敗理由
    Failed(String),
}

/// 1ファイル分の記録
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// バッチ全体の処理結果
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// 成功したファイル数
    pub fn processed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == FileStatus::Processed)
            .count()
    }

    /// 失敗したファイル数
    pub fn failed(&self) -> usize {
        self.total() - self.processed()
    }

    /// 失敗したファイルとその理由
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            FileStatus::Failed(reason) => Some((o.path.as_path(), reason.as_str())),
            FileStatus::Processed => None,
        })
    }

    /// 最終サマリーをログに出力
    pub fn log_summary(&self, title: &str) {
        info!(
            total = self.total(),
            processed = self.processed(),
            failed = self.failed(),
            "{}: 処理完了",
            title
        );
        if self.failed() > 0 {
            warn!("{}: {}個のファイルでエラーが発生しました", title, self.failed());
        }
    }
}

/// 拡張子が許可リストに含まれるか（大文字小文字を区別しない）
pub fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// ディレクトリ直下の対象ファイルを列挙（パス順）
pub fn collect_files(dir: &Path, extensions: &[String]) -> PrepResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(PrepError::DirectoryNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(PrepError::NotADirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_allowed_extension(&path, extensions) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// 出力ディレクトリを作成（既に存在する場合は何もしない）
pub fn ensure_dir(dir: &Path) -> PrepResult<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// 各ファイルに処理を1回ずつ適用する
///
/// 失敗したファイルはログに残してカウントし、次のファイルへ進む。
pub fn run_batch<F>(files: &[PathBuf], mut process: F) -> BatchReport
where
    F: FnMut(&Path) -> anyhow::Result<()>,
{
    let mut report = BatchReport::default();

    for path in files {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let status = match process(path) {
            Ok(()) => {
                info!("処理済み: {}", name);
                FileStatus::Processed
            }
            Err(e) => {
                warn!("{} の処理中にエラー: {:#}", name, e);
                FileStatus::Failed(format!("{:#}", e))
            }
        };

        report.outcomes.push(FileOutcome {
            path: path.clone(),
            status,
        });
    }

    report
}
