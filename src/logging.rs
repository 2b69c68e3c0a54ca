use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 既定のログレベル（このクレートは info、依存クレートは warn）
const DEFAULT_FILTER: &str = "warn,dataset_prep=info";

/// tracing の出力先を初期化（`RUST_LOG` で上書き可能）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    // 二重初期化は無視する
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
