// Время

use chrono::Utc;

/// Текущее время в миллисекундах с эпохи Unix
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}
