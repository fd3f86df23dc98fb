use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::Serialize;

use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserRepository;
use crate::services::auth::{hash_password, verify_password};
use crate::services::email::{EmailError, EmailService};
use crate::services::totp::{TotpService, unix_time};

/// OTP登録結果
///
/// シークレット平文を含むため、ユーザーへの表示以外で扱わないこと
#[derive(Debug, Serialize)]
pub struct Enrollment {
    pub secret: String,
    pub provisioning_url: String,
}

/// OTPフロー（生成 → 保存 → 配送 → 検証）
///
/// 1. `register` でユーザー作成
/// 2. `enroll` でシークレットを生成・保存（1ユーザー1回のみ）
/// 3. `send_code` で現在ステップのコードをメール送信
/// 4. `verify` で提出されたコードを検証（初回成功で otp_verified）
#[derive(Clone)]
pub struct OtpService<T = AsyncSmtpTransport<Tokio1Executor>> {
    user_repo: UserRepository,
    totp_service: TotpService,
    email_service: Option<EmailService<T>>,
}

impl<T> OtpService<T> {
    pub fn new(
        user_repo: UserRepository,
        totp_service: TotpService,
        email_service: Option<EmailService<T>>,
    ) -> Self {
        Self {
            user_repo,
            totp_service,
            email_service,
        }
    }

    /// ユーザーを登録
    ///
    /// # Security
    /// パスワードは即座にハッシュ化し、ログに出力しない
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        validate_register_input(username, email, password)?;

        let hashed_password = hash_password(password)?;
        let user = self
            .user_repo
            .create(User::new(
                username.to_string(),
                email.to_string(),
                hashed_password,
            ))
            .await?;

        tracing::info!(username = %username, "ユーザー登録成功");

        Ok(user)
    }

    /// OTPを設定（シークレット生成・保存）
    ///
    /// # Security
    /// - パスワード確認必須
    /// - 既にシークレットがある場合は再生成しない
    pub async fn enroll(&self, username: &str, password: &str) -> Result<Enrollment, AppError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await
            .ok_or(AppError::UserNotFound)?;

        if !verify_password(password, &user.hashed_password)? {
            tracing::warn!(username = %username, "OTP設定: パスワード不一致");
            return Err(AppError::Authentication);
        }

        if user.otp_base32.is_some() {
            return Err(AppError::OtpAlreadyEnrolled);
        }

        let secret = TotpService::generate_secret();
        let provisioning_url = self.totp_service.provisioning_url(&user.email, &secret)?;
        self.user_repo.set_otp_secret(username, &secret).await?;

        tracing::info!(username = %username, "OTP設定完了");

        Ok(Enrollment {
            secret,
            provisioning_url,
        })
    }

    /// 提出されたコードを現在時刻で検証
    pub async fn verify(&self, username: &str, code: &str) -> bool {
        match unix_time() {
            Ok(now) => self.verify_at(username, code, now).await,
            Err(_) => false,
        }
    }

    /// 提出されたコードを指定時刻で検証
    ///
    /// ユーザー不在・未設定・コード不一致はいずれも `false`（区別しない）
    pub async fn verify_at(&self, username: &str, code: &str, time: u64) -> bool {
        let Some(user) = self.user_repo.find_by_username(username).await else {
            tracing::warn!(username = %username, "OTP検証失敗");
            return false;
        };
        let Some(secret) = user.otp_base32.as_deref() else {
            tracing::warn!(username = %username, "OTP検証失敗");
            return false;
        };

        if !self.totp_service.verify_code(secret, code, time) {
            tracing::warn!(username = %username, "OTP検証失敗");
            return false;
        }

        if !user.otp_verified && self.user_repo.mark_otp_verified(username).await.is_ok() {
            tracing::info!(username = %username, "OTP初回検証完了");
        }

        true
    }
}

impl<T> OtpService<T>
where
    T: AsyncTransport + Sync,
    T::Error: std::fmt::Display,
{
    /// 現在ステップのコードをメール送信
    pub async fn send_code(&self, username: &str) -> Result<(), AppError> {
        self.send_code_at(username, unix_time()?).await
    }

    /// 指定時刻のステップのコードをメール送信
    ///
    /// # Errors
    /// - 送信失敗は `AppError::EmailDelivery`（検証成功として扱わないこと）
    pub async fn send_code_at(&self, username: &str, time: u64) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await
            .ok_or(AppError::UserNotFound)?;
        let secret = user.otp_base32.as_deref().ok_or(AppError::OtpNotEnrolled)?;
        let email_service = self
            .email_service
            .as_ref()
            .ok_or(AppError::EmailDelivery(EmailError::NotConfigured))?;

        let code = self.totp_service.generate_code(secret, time)?;
        email_service.send_code(&user.email, &code).await?;

        Ok(())
    }
}

/// 登録入力のバリデーション
fn validate_register_input(username: &str, email: &str, password: &str) -> Result<(), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("ユーザー名は必須です".to_string()));
    }
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    if password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    Ok(())
}
