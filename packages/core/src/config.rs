//! Централизованная конфигурация для VeilChat Core
//!
//! Все константы и настройки ядра определены здесь, чтобы избежать
//! хардкода по всему проекту. Сервисы принимают `&Config` явно;
//! `Config::global()` нужен только для boundary-функций из [`crate::api::crypto`].

use std::sync::OnceLock;

/// Глобальная конфигурация приложения (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // RSA / HYBRID
    // ============================================

    /// Размер модуля RSA для новых identity (в битах)
    pub rsa_key_bits: usize,

    /// Максимальное время генерации пары ключей (в миллисекундах)
    pub keygen_timeout_ms: u64,

    // ============================================
    // VAULT (Argon2id)
    // ============================================

    /// Длина случайной соли, сохраняемой в wrapped blob (в байтах)
    pub vault_salt_length: usize,

    /// Argon2id: память в KiB
    pub argon2_m_cost: u32,

    /// Argon2id: количество итераций
    pub argon2_t_cost: u32,

    /// Argon2id: параллелизм
    pub argon2_p_cost: u32,

    /// Длина escrow-секрета для анонимных identity (в байтах, до hex)
    pub escrow_secret_length: usize,

    // ============================================
    // CREDENTIALS
    // ============================================

    /// Соль хоста для детерминированного хэша пароля
    pub password_salt: String,

    /// Шаг TOTP (в секундах)
    pub totp_step_secs: u64,

    /// Количество цифр TOTP кода
    pub totp_digits: u32,

    /// Сколько окон допускается до и после текущего
    pub totp_skew_windows: u64,

    /// Длина TOTP секрета (в байтах, до hex)
    pub totp_secret_length: usize,

    /// Issuer в otpauth:// URI
    pub totp_issuer: String,

    // ============================================
    // ВАЛИДАЦИЯ
    // ============================================

    /// Минимальная длина username
    pub username_min_length: usize,

    /// Максимальная длина username
    pub username_max_length: usize,

    /// Минимальная длина пароля
    pub password_min_length: usize,

    // ============================================
    // ОТОБРАЖЕНИЕ
    // ============================================

    /// Текст, который показывается вместо удалённого сообщения
    pub deleted_placeholder: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // RSA / hybrid
            rsa_key_bits: 2048,
            keygen_timeout_ms: 30_000,

            // Vault
            vault_salt_length: 16,
            argon2_m_cost: 19_456, // 19 MiB
            argon2_t_cost: 2,
            argon2_p_cost: 1,
            escrow_secret_length: 32,

            // Credentials
            password_salt: "veilchat.credential.v1".to_string(),
            totp_step_secs: 30,
            totp_digits: 6,
            totp_skew_windows: 1,
            totp_secret_length: 20,
            totp_issuer: "VeilChat".to_string(),

            // Валидация
            username_min_length: 3,
            username_max_length: 32,
            password_min_length: 8,

            deleted_placeholder: "This message was deleted".to_string(),
        }
    }
}

impl Config {
    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Переопределяем значения из env, если они заданы
        if let Ok(val) = std::env::var("VEILCHAT_PASSWORD_SALT") {
            if !val.is_empty() {
                config.password_salt = val;
            }
        }

        if let Ok(val) = std::env::var("VEILCHAT_KEYGEN_TIMEOUT_MS") {
            if let Ok(parsed) = val.parse() {
                config.keygen_timeout_ms = parsed;
            }
        }

        if let Ok(val) = std::env::var("VEILCHAT_ARGON2_M_COST") {
            if let Ok(parsed) = val.parse() {
                config.argon2_m_cost = parsed;
            }
        }

        if let Ok(val) = std::env::var("VEILCHAT_ARGON2_T_COST") {
            if let Ok(parsed) = val.parse() {
                config.argon2_t_cost = parsed;
            }
        }

        if let Ok(val) = std::env::var("VEILCHAT_TOTP_SKEW_WINDOWS") {
            if let Ok(parsed) = val.parse() {
                config.totp_skew_windows = parsed;
            }
        }

        if let Ok(val) = std::env::var("VEILCHAT_DELETED_PLACEHOLDER") {
            config.deleted_placeholder = val;
        }

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию со значениями по умолчанию
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::default())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }

    /// Конфигурация с облегчёнными параметрами Argon2 для тестов
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            argon2_m_cost: 256,
            argon2_t_cost: 1,
            ..Self::default()
        }
    }
}
