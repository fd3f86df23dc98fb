use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::User;

/// インメモリのユーザーストア（ユーザー名がキー）
#[derive(Clone, Default)]
pub struct UserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl UserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// ユーザー名でユーザーを検索
    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        self.users.read().await.get(username).cloned()
    }

    /// 新しいユーザーを作成
    ///
    /// # Errors
    /// - 同名ユーザーが存在する場合: `AppError::UsernameAlreadyExists`
    pub async fn create(&self, user: User) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(AppError::UsernameAlreadyExists);
        }
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    /// OTPシークレットを保存し、OTPを有効化
    ///
    /// # Note
    /// 既にシークレットがある場合は上書きしない（再生成は既存デバイスを無効化するため）
    pub async fn set_otp_secret(&self, username: &str, secret: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(username).ok_or(AppError::UserNotFound)?;
        if user.otp_base32.is_some() {
            return Err(AppError::OtpAlreadyEnrolled);
        }
        user.otp_base32 = Some(secret.to_string());
        user.otp_enabled = true;
        user.otp_verified = false;
        Ok(())
    }

    /// OTPの初回検証完了をマーク
    pub async fn mark_otp_verified(&self, username: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(username).ok_or(AppError::UserNotFound)?;
        user.otp_verified = true;
        Ok(())
    }
}
