// Логирование

use std::sync::Once;

static INIT: Once = Once::new();

/// Установить fmt-подписчик `tracing` с фильтром из `RUST_LOG`
///
/// Повторные вызовы ничего не делают. Если хост уже установил свой
/// подписчик, он остаётся на месте.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("veilchat=info")),
            )
            .try_init();
    });
}
