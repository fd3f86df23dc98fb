use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{ItemRepository, UserRepository};
use crate::services::{EmailService, OtpService, TotpService};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// アイテムストア（初期データ2件）
    pub item_repo: ItemRepository,
    /// OTPフロー（HTTPには公開しない）
    pub otp_service: OtpService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let item_repo = ItemRepository::seeded();

        let totp_service = TotpService::new(
            config.totp_issuer.clone(),
            config.totp_digits,
            config.totp_step_secs,
            config.totp_skew_steps,
        )?;

        if config.totp_skew_steps == 0 {
            tracing::info!("TOTP許容ウィンドウ: 現在ステップのみ（時刻同期が必要）");
        }

        // SMTP が設定されている場合のみ初期化
        let email_service = EmailService::from_config(&config)?;
        if email_service.is_none() {
            tracing::info!("SMTP 未設定（メール送信無効）");
        }

        let otp_service = OtpService::new(UserRepository::new(), totp_service, email_service);

        Ok(Self {
            config,
            item_repo,
            otp_service,
        })
    }
}
