use crate::config::Config;
use crate::utils::error::{Result, VeilError};

/// Валидация username: длина в пределах конфигурации, только `[A-Za-z0-9_.-]`
pub fn validate_username(username: &str, config: &Config) -> Result<()> {
    let len = username.chars().count();
    if len < config.username_min_length || len > config.username_max_length {
        return Err(VeilError::ValidationError(format!(
            "Username must be between {} and {} characters",
            config.username_min_length, config.username_max_length
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(VeilError::ValidationError(
            "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }

    Ok(())
}

/// Валидация силы пароля
///
/// Минимальные требования:
/// - Длина >= конфигурируемый минимум (по умолчанию 8 символов)
/// - Содержит буквы и цифры
pub fn validate_password(password: &str, config: &Config) -> Result<()> {
    let min_length = config.password_min_length;
    if password.chars().count() < min_length {
        return Err(VeilError::ValidationError(format!(
            "Password must be at least {} characters long",
            min_length
        )));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_numeric());

    if !has_letter || !has_digit {
        return Err(VeilError::ValidationError(
            "Password must contain both letters and numbers".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        let config = Config::default();

        // Валидные пароли
        assert!(validate_password("password123", &config).is_ok());
        assert!(validate_password("MyPass123", &config).is_ok());

        // Невалидные пароли
        assert!(validate_password("short1", &config).is_err()); // Слишком короткий
        assert!(validate_password("onlyletters", &config).is_err()); // Только буквы
        assert!(validate_password("12345678", &config).is_err()); // Только цифры
        assert!(validate_password("", &config).is_err());
    }

    #[test]
    fn test_validate_username() {
        let config = Config::default();

        assert!(validate_username("alice", &config).is_ok());
        assert!(validate_username("bob_the.builder-2", &config).is_ok());

        assert!(validate_username("al", &config).is_err());
        assert!(validate_username(&"x".repeat(33), &config).is_err());
        assert!(validate_username("alice smith", &config).is_err());
        assert!(validate_username("алиса", &config).is_err());
    }
}
