//! Аутентификация по паролю и TOTP
//!
//! Логин проходит три проверки по очереди: пароль, затем (если включено)
//! код второго фактора, затем разворачивание приватного ключа из vault.
//! Старые форматы (SHA-256 хэш, scrypt blob) мигрируют сразу после
//! успешного логина.
//!
//! Любой сбой разворачивания ключа наружу выглядит как
//! `AuthenticationFailed`: неверный пароль и повреждённый blob неотличимы.

use crate::config::Config;
use crate::crypto::password::{hash_password, is_legacy_hash, verify_password};
use crate::crypto::totp::{self, TotpParams};
use crate::crypto::vault::PrivateKeyVault;
use crate::state::UnlockedSession;
use crate::storage::models::{Credential, Identity};
use crate::storage::{CredentialStore, UserDirectory};
use crate::utils::error::{Result, VeilError};
use crate::utils::validation::validate_password;
use std::sync::OnceLock;
use zeroize::Zeroizing;

/// Пароль для хэша-заглушки, против которого проверяются неизвестные username
const DUMMY_PASSWORD: &str = "veilchat.dummy.password";

#[derive(Debug, Clone)]
pub struct CredentialAuth {
    config: Config,
    vault: PrivateKeyVault,
    totp: TotpParams,
    /// Хэш с параметрами конфигурации; считается при первом промахе
    dummy_hash: OnceLock<String>,
}

impl CredentialAuth {
    pub fn new(config: Config) -> Self {
        Self {
            vault: PrivateKeyVault::from_config(&config),
            totp: TotpParams::from(&config),
            config,
            dummy_hash: OnceLock::new(),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        Ok(hash_password(password, &self.config)?)
    }

    pub fn verify_totp(&self, code: &str, secret_hex: &str) -> bool {
        totp::verify_totp(code, secret_hex, &self.totp)
    }

    pub fn generate_totp_secret(&self) -> Result<String> {
        Ok(totp::generate_totp_secret(self.config.totp_secret_length)?)
    }

    pub fn totp_uri(&self, secret_hex: &str, username: &str) -> Result<String> {
        Ok(totp::totp_uri(
            secret_hex,
            username,
            &self.config.totp_issuer,
            &self.totp,
        )?)
    }

    /// Проверить пару username/пароль; неизвестный пользователь даёт `false`
    pub fn verify_credentials<S>(&self, store: &S, username: &str, password: &str) -> Result<bool>
    where
        S: UserDirectory + CredentialStore,
    {
        Ok(self.check_password(store, username, password)?.is_some())
    }

    /// Полная проверка с учётом второго фактора
    pub fn authenticate<S>(
        &self,
        store: &S,
        username: &str,
        password: &str,
        two_factor_code: Option<&str>,
    ) -> Result<Identity>
    where
        S: UserDirectory + CredentialStore,
    {
        use tracing::{info, warn};

        let (identity, credential) = match self.check_password(store, username, password)? {
            Some(found) => found,
            None => {
                warn!(target: "veilchat::auth", "Authentication failed");
                return Err(VeilError::AuthenticationFailed);
            }
        };

        if let Some(secret) = credential.two_factor_secret.as_deref() {
            let code = match two_factor_code.map(str::trim) {
                Some(code) if !code.is_empty() => code,
                _ => return Err(VeilError::TwoFactorRequired),
            };
            if !self.verify_totp(code, secret) {
                warn!(target: "veilchat::auth", user_id = %identity.id, "Invalid two-factor code");
                return Err(VeilError::InvalidTwoFactorCode);
            }
        }

        info!(target: "veilchat::auth", user_id = %identity.id, "Authenticated");
        Ok(identity)
    }

    /// Аутентифицировать и развернуть приватный ключ
    pub fn login<S>(
        &self,
        store: &mut S,
        username: &str,
        password: &str,
        two_factor_code: Option<&str>,
    ) -> Result<UnlockedSession>
    where
        S: UserDirectory + CredentialStore,
    {
        let identity = self.authenticate(&*store, username, password, two_factor_code)?;
        let private_key_pem = self.unwrap_for(&identity, password)?;

        self.migrate_legacy_formats(store, &identity, &private_key_pem, password);

        Ok(UnlockedSession::new(identity.id, private_key_pem)?)
    }

    /// Развернуть ключ анонимной identity escrow-секретом
    pub fn unlock_anonymous<S: UserDirectory>(
        &self,
        store: &S,
        user_id: &str,
        escrow_secret: &str,
    ) -> Result<UnlockedSession> {
        let identity = store
            .load_identity(user_id)?
            .filter(|identity| identity.is_anonymous)
            .ok_or(VeilError::AuthenticationFailed)?;
        let private_key_pem = self.unwrap_for(&identity, escrow_secret)?;

        Ok(UnlockedSession::new(identity.id, private_key_pem)?)
    }

    /// Сменить пароль: ключ перезаворачивается, хэш пересчитывается
    ///
    /// Сначала пишется credential, потом blob. Если blob записать не
    /// удалось, credential откатывается, и старый пароль продолжает работать.
    pub fn change_password<S>(
        &self,
        store: &mut S,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()>
    where
        S: UserDirectory + CredentialStore,
    {
        use tracing::{error, info, warn};

        validate_password(new_password, &self.config)?;

        let identity = store
            .load_identity(user_id)?
            .ok_or_else(|| VeilError::NotFound(format!("identity {}", user_id)))?;
        let mut credential = store
            .load_credential(user_id)?
            .ok_or_else(|| VeilError::NotFound(format!("credential {}", user_id)))?;

        let stored_hash = credential
            .password_hash
            .as_deref()
            .ok_or(VeilError::AuthenticationFailed)?;
        if !verify_password(old_password, stored_hash) {
            return Err(VeilError::AuthenticationFailed);
        }

        let private_key_pem = self.unwrap_for(&identity, old_password)?;
        let wrapped = self.vault.wrap(&private_key_pem, new_password)?;
        let previous = credential.clone();
        credential.password_hash = Some(self.hash_password(new_password)?);

        store.update_credential(credential)?;
        if let Err(e) = store.update_wrapped_key(user_id, wrapped) {
            warn!(target: "veilchat::auth", user_id, error = %e, "Failed to store rewrapped key, restoring credential");
            if let Err(restore) = store.update_credential(previous) {
                error!(target: "veilchat::auth", user_id, error = %restore, "Failed to restore credential");
            }
            return Err(e);
        }

        info!(target: "veilchat::auth", user_id, "Password changed");
        Ok(())
    }

    /// Включить 2FA; `code` должен совпасть с новым секретом
    pub fn enable_two_factor<S: CredentialStore>(
        &self,
        store: &mut S,
        user_id: &str,
        secret_hex: &str,
        code: &str,
    ) -> Result<()> {
        use tracing::info;

        let mut credential = self.load_credential(&*store, user_id)?;
        if !self.verify_totp(code, secret_hex) {
            return Err(VeilError::InvalidTwoFactorCode);
        }

        credential.two_factor_secret = Some(secret_hex.to_string());
        store.update_credential(credential)?;

        info!(target: "veilchat::auth", user_id, "Two-factor enabled");
        Ok(())
    }

    /// Выключить 2FA; нужен текущий валидный код
    pub fn disable_two_factor<S: CredentialStore>(
        &self,
        store: &mut S,
        user_id: &str,
        code: &str,
    ) -> Result<()> {
        use tracing::info;

        let mut credential = self.load_credential(&*store, user_id)?;
        let secret = credential
            .two_factor_secret
            .as_deref()
            .ok_or_else(|| VeilError::ValidationError("two-factor is not enabled".to_string()))?;
        if !self.verify_totp(code, secret) {
            return Err(VeilError::InvalidTwoFactorCode);
        }

        credential.two_factor_secret = None;
        store.update_credential(credential)?;

        info!(target: "veilchat::auth", user_id, "Two-factor disabled");
        Ok(())
    }

    /// Развернуть ключ identity; причина сбоя только в лог
    fn unwrap_for(&self, identity: &Identity, secret: &str) -> Result<Zeroizing<String>> {
        use tracing::warn;

        self.vault
            .unwrap(&identity.private_key_wrapped, secret)
            .map_err(|e| {
                warn!(target: "veilchat::auth", user_id = %identity.id, error = %e, "Private key unwrap failed");
                VeilError::AuthenticationFailed
            })
    }

    /// Прогнать Argon2 впустую, чтобы промах по username стоил столько же
    fn burn_password_check(&self, password: &str) {
        let dummy = self.dummy_hash.get_or_init(|| {
            hash_password(DUMMY_PASSWORD, &self.config).unwrap_or_default()
        });
        let _ = verify_password(password, dummy);
    }

    fn load_credential<S: CredentialStore>(&self, store: &S, user_id: &str) -> Result<Credential> {
        store
            .load_credential(user_id)?
            .ok_or_else(|| VeilError::NotFound(format!("credential {}", user_id)))
    }

    fn check_password<S>(
        &self,
        store: &S,
        username: &str,
        password: &str,
    ) -> Result<Option<(Identity, Credential)>>
    where
        S: UserDirectory + CredentialStore,
    {
        let identity = match store.find_by_username(username)? {
            Some(identity) => identity,
            None => {
                self.burn_password_check(password);
                return Ok(None);
            }
        };
        let credential = match store.load_credential(&identity.id)? {
            Some(credential) => credential,
            None => {
                self.burn_password_check(password);
                return Ok(None);
            }
        };

        let verified = match credential.password_hash.as_deref() {
            Some(hash) => verify_password(password, hash),
            None => {
                self.burn_password_check(password);
                false
            }
        };

        Ok(verified.then_some((identity, credential)))
    }

    /// Перевести blob и хэш на текущие форматы
    ///
    /// Оба шага сохраняют тот же пароль, поэтому каждый независим: сбой
    /// одного только логируется, и миграция повторится при следующем логине.
    fn migrate_legacy_formats<S>(
        &self,
        store: &mut S,
        identity: &Identity,
        private_key_pem: &str,
        password: &str,
    ) where
        S: UserDirectory + CredentialStore,
    {
        use tracing::{info, warn};

        if PrivateKeyVault::needs_rewrap(&identity.private_key_wrapped) {
            let result = self
                .vault
                .wrap(private_key_pem, password)
                .map_err(VeilError::from)
                .and_then(|wrapped| store.update_wrapped_key(&identity.id, wrapped));
            match result {
                Ok(()) => info!(target: "veilchat::auth", user_id = %identity.id, "Rewrapped legacy vault blob"),
                Err(e) => warn!(target: "veilchat::auth", user_id = %identity.id, error = %e, "Legacy vault blob left in place"),
            }
        }

        let credential = match store.load_credential(&identity.id) {
            Ok(Some(credential)) => credential,
            Ok(None) => return,
            Err(e) => {
                warn!(target: "veilchat::auth", user_id = %identity.id, error = %e, "Could not load credential for migration");
                return;
            }
        };
        if credential.password_hash.as_deref().is_some_and(is_legacy_hash) {
            let mut updated = credential;
            let result = self.hash_password(password).and_then(|hash| {
                updated.password_hash = Some(hash);
                store.update_credential(updated)
            });
            match result {
                Ok(()) => info!(target: "veilchat::auth", user_id = %identity.id, "Rehashed legacy password hash"),
                Err(e) => warn!(target: "veilchat::auth", user_id = %identity.id, error = %e, "Legacy password hash left in place"),
            }
        }
    }
}
