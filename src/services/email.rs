use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;

use crate::config::{Config, SmtpTlsMode};

const OTP_SUBJECT: &str = "Your Authentication Code";

/// メール送信エラー
///
/// 宛先不正・接続失敗・認証失敗はいずれも送信失敗として呼び出し側へ返す
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("SMTPが設定されていません")]
    NotConfigured,

    #[error("無効なメールアドレス: {0}")]
    InvalidAddress(String),

    #[error("SMTP設定エラー: {0}")]
    Setup(#[from] lettre::transport::smtp::Error),

    #[error("メッセージ構築エラー: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("メール送信に失敗しました: {0}")]
    DeliveryFailed(String),
}

/// メール送信サービス
///
/// トランスポートは `lettre::AsyncTransport` を実装する任意の型（既定は SMTP）。
/// リトライは行わない。
#[derive(Clone)]
pub struct EmailService<T = AsyncSmtpTransport<Tokio1Executor>> {
    transport: T,
    from: Mailbox,
}

impl EmailService {
    /// 設定から SMTP リレー経由の EmailService を作成
    ///
    /// # Returns
    /// `smtp_host` 未設定の場合は `Ok(None)`
    ///
    /// # Note
    /// 接続は送信時に確立される（ここでは接続しない）
    pub fn from_config(config: &Config) -> Result<Option<Self>, EmailError> {
        let Some(host) = config.smtp_host.as_deref() else {
            return Ok(None);
        };

        let builder = match config.smtp_tls {
            SmtpTlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
            SmtpTlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
            SmtpTlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };
        let mut builder = builder.port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(
                username.expose_secret().clone(),
                password.expose_secret().clone(),
            ));
        } else {
            tracing::warn!("SMTP認証情報が未設定（認証なしで送信）");
        }

        let from = parse_mailbox(&config.smtp_from_address)?;

        tracing::info!(
            smtp_host = %host,
            smtp_port = config.smtp_port,
            tls = ?config.smtp_tls,
            "SMTPトランスポート初期化"
        );

        Ok(Some(Self::with_transport(builder.build(), from)))
    }
}

impl<T> EmailService<T> {
    /// 任意のトランスポートで EmailService を作成
    pub fn with_transport(transport: T, from: Mailbox) -> Self {
        Self { transport, from }
    }
}

impl<T> EmailService<T>
where
    T: AsyncTransport + Sync,
    T::Error: std::fmt::Display,
{
    /// 認証コードをメール送信
    ///
    /// # Security
    /// コードはログに出力しない
    pub async fn send_code(&self, to: &str, code: &str) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(OTP_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(format!("Your OTP code is: {code}"))?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!(to = %to, error = %e, "認証コードメール送信失敗");
            EmailError::DeliveryFailed(e.to_string())
        })?;

        tracing::info!(to = %to, "認証コードメール送信完了");

        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))
}
