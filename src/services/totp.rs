use data_encoding::{BASE32, BASE32_NOPAD};
use rand::RngCore;
use totp_rs::{Algorithm, TOTP};

use crate::error::AppError;

/// シークレットのバイト長（160ビット、Base32で32文字）
const SECRET_LEN: usize = 20;

/// TOTP (Time-based One-Time Password) サービス
///
/// 時刻は呼び出し側から渡す（UNIX秒）。設定は全て構築時に明示する。
///
/// # Security
/// - シークレット平文・コードはログに出力しない
/// - コード比較は定数時間（totp-rs 内部）
/// - 試行回数制限は未実装。公開する場合は呼び出し側でロックアウトを行うこと
#[derive(Debug, Clone)]
pub struct TotpService {
    issuer: String,
    digits: usize,
    step: u64,
    skew: u8,
}

impl TotpService {
    /// 新しい TotpService を作成
    ///
    /// # Arguments
    /// * `issuer` - TOTP発行者名（アプリ名）
    /// * `digits` - コード桁数（6〜8）
    /// * `step` - 時間ステップ（秒）
    /// * `skew` - 現在ステップの前後に許容するステップ数
    pub fn new(issuer: String, digits: usize, step: u64, skew: u8) -> Result<Self, AppError> {
        if !(6..=8).contains(&digits) {
            tracing::error!(digits, "TOTP桁数が不正");
            return Err(AppError::Internal(anyhow::anyhow!(
                "totp digits must be between 6 and 8"
            )));
        }
        if step == 0 {
            tracing::error!("TOTPステップが0");
            return Err(AppError::Internal(anyhow::anyhow!(
                "totp step must be greater than 0"
            )));
        }

        Ok(Self {
            issuer,
            digits,
            step,
            skew,
        })
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// 20バイトのランダムシークレットを生成し、Base32でエンコード
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32.encode(&bytes)
    }

    /// 指定時刻のTOTPコードを生成
    pub fn generate_code(&self, secret: &str, time: u64) -> Result<String, AppError> {
        let secret_bytes = decode_secret(secret).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("invalid base32 secret"))
        })?;
        Ok(self.create_totp_for_verify(secret_bytes).generate(time))
    }

    /// TOTPコードを検証
    ///
    /// 不正な入力（空・桁数違い・数字以外・デコード不能なシークレット）は
    /// エラーにせず `false` を返す。
    ///
    /// # Note
    /// 許容ウィンドウは `skew` ステップ（既定 0 = 現在ステップのみ）。
    /// skew 0 ではサーバーと端末の時刻が厳密に一致している必要がある。
    pub fn verify_code(&self, secret: &str, code: &str, time: u64) -> bool {
        if code.len() != self.digits || !code.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }

        // totp-rs は `(time / step ± skew) * step` を計算するため上下限を確認
        let counter = time / self.step;
        let skew = u64::from(self.skew);
        if counter < skew
            || counter
                .checked_add(skew)
                .and_then(|c| c.checked_mul(self.step))
                .is_none()
        {
            return false;
        }

        let Some(secret_bytes) = decode_secret(secret) else {
            return false;
        };

        self.create_totp_for_verify(secret_bytes).check(code, time)
    }

    /// 現在時刻でTOTPコードを検証
    pub fn verify_code_now(&self, secret: &str, code: &str) -> bool {
        match unix_time() {
            Ok(now) => self.verify_code(secret, code, now),
            Err(_) => false,
        }
    }

    /// 認証アプリ登録用の otpauth:// URI を生成
    ///
    /// # Arguments
    /// * `account` - アカウント識別子（メールアドレス等）
    /// * `secret` - Base32エンコードされたシークレット
    pub fn provisioning_url(&self, account: &str, secret: &str) -> Result<String, AppError> {
        Ok(self.create_totp(account, secret)?.get_url())
    }

    /// QRコードを生成（PNG形式、Base64エンコード）
    pub fn generate_qr_code(&self, account: &str, secret: &str) -> Result<String, AppError> {
        let totp = self.create_totp(account, secret)?;

        let qr_code = totp.get_qr_base64().map_err(|e| {
            tracing::error!(error = %e, "QRコード生成エラー");
            AppError::Internal(anyhow::anyhow!("qr code generation error"))
        })?;

        Ok(qr_code)
    }

    /// TOTP オブジェクトを作成（URI・QRコード生成用）
    fn create_totp(&self, account: &str, secret: &str) -> Result<TOTP, AppError> {
        let secret_bytes = decode_secret(secret).ok_or_else(|| {
            tracing::error!("シークレットのBase32デコードエラー");
            AppError::Internal(anyhow::anyhow!("invalid base32 secret"))
        })?;

        TOTP::new(
            Algorithm::SHA1,
            self.digits,
            self.skew,
            self.step,
            secret_bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "TOTP作成エラー");
            AppError::Internal(anyhow::anyhow!("totp creation error"))
        })
    }

    /// TOTP オブジェクトを作成（検証用）
    ///
    /// 短いシークレットも受け付けるため長さ検査はしない
    fn create_totp_for_verify(&self, secret_bytes: Vec<u8>) -> TOTP {
        TOTP::new_unchecked(
            Algorithm::SHA1,
            self.digits,
            self.skew,
            self.step,
            secret_bytes,
            None,
            String::new(),
        )
    }
}

/// 現在のUNIX時刻（秒）
pub fn unix_time() -> Result<u64, AppError> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| {
            tracing::error!(error = ?e, "システム時刻取得エラー");
            AppError::Internal(anyhow::anyhow!("system time error"))
        })
}

/// Base32シークレットをデコード（空白・パディング除去、大文字化）
fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if normalized.is_empty() {
        return None;
    }
    BASE32_NOPAD.decode(normalized.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 6238 付録B の SHA1 シークレット（"12345678901234567890"）
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
    const NOW: u64 = 1_700_000_000;

    fn create_test_service() -> TotpService {
        TotpService::new("TestApp".to_string(), 6, 30, 0).unwrap()
    }

    #[test]
    fn test_generate_secret() {
        let secret = TotpService::generate_secret();
        // Base32エンコードされた20バイト = 32文字
        assert_eq!(secret.len(), 32);
        assert!(
            secret
                .chars()
                .all(|c| "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567".contains(c))
        );
    }

    #[test]
    fn test_generate_secret_is_random() {
        assert_ne!(TotpService::generate_secret(), TotpService::generate_secret());
    }

    #[test]
    fn test_rfc6238_vectors() {
        let service = TotpService::new("TestApp".to_string(), 8, 30, 0).unwrap();
        assert_eq!(service.generate_code(RFC_SECRET, 59).unwrap(), "94287082");
        assert_eq!(
            service.generate_code(RFC_SECRET, 1_111_111_109).unwrap(),
            "07081804"
        );
        assert_eq!(
            service.generate_code(RFC_SECRET, 20_000_000_000).unwrap(),
            "65353130"
        );
    }

    #[test]
    fn test_verify_current_step() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();
        let code = service.generate_code(&secret, NOW).unwrap();

        assert!(service.verify_code(&secret, &code, NOW));
        // 同一ステップ内の別時刻
        let step_start = NOW - NOW % 30;
        assert!(service.verify_code(&secret, &code, step_start + 29));
    }

    #[test]
    fn test_verify_outside_window() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();
        let code = service.generate_code(&secret, NOW).unwrap();

        assert!(!service.verify_code(&secret, &code, NOW + service.step() * 2));
    }

    #[test]
    fn test_skew_zero_rejects_adjacent_step() {
        let service = create_test_service();
        let code = service.generate_code(RFC_SECRET, NOW).unwrap();
        assert!(!service.verify_code(RFC_SECRET, &code, NOW + 30));
    }

    #[test]
    fn test_skew_one_accepts_adjacent_step() {
        let service = TotpService::new("TestApp".to_string(), 6, 30, 1).unwrap();
        let code = service.generate_code(RFC_SECRET, NOW).unwrap();

        assert!(service.verify_code(RFC_SECRET, &code, NOW + 30));
        assert!(service.verify_code(RFC_SECRET, &code, NOW - 30));
        assert!(!service.verify_code(RFC_SECRET, &code, NOW + 60));
    }

    #[test]
    fn test_verify_code_now() {
        // ステップ境界をまたいでも通るよう skew 1
        let service = TotpService::new("TestApp".to_string(), 6, 30, 1).unwrap();
        let secret = TotpService::generate_secret();
        let code = service.generate_code(&secret, unix_time().unwrap()).unwrap();
        assert!(service.verify_code_now(&secret, &code));
    }

    #[test]
    fn test_verify_empty_code() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();
        assert!(!service.verify_code(&secret, "", NOW));
    }

    #[test]
    fn test_verify_invalid_code_format() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();

        // 6桁でない
        assert!(!service.verify_code(&secret, "12345", NOW));
        // 数字以外を含む
        assert!(!service.verify_code(&secret, "12345a", NOW));
    }

    #[test]
    fn test_verify_invalid_secret() {
        let service = create_test_service();
        assert!(!service.verify_code("not base32!", "123456", NOW));
        assert!(!service.verify_code("", "123456", NOW));
    }

    #[test]
    fn test_verify_at_max_time_is_false() {
        let service = TotpService::new("TestApp".to_string(), 6, 30, 1).unwrap();
        let secret = TotpService::generate_secret();
        assert!(!service.verify_code(&secret, "123456", u64::MAX));
        assert!(!service.verify_code(&secret, "123456", 0));
    }

    #[test]
    fn test_secret_normalization() {
        let service = create_test_service();
        let code = service.generate_code(RFC_SECRET, NOW).unwrap();
        let lower_spaced = "gezd gnbv gy3t qojq gezd gnbv gy3t qojq";
        assert!(service.verify_code(lower_spaced, &code, NOW));
    }

    #[test]
    fn test_provisioning_url() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();

        let url = service
            .provisioning_url("test@example.com", &secret)
            .unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains(&secret));
        assert!(url.contains("issuer=TestApp"));
    }

    #[test]
    fn test_generate_qr_code() {
        let service = create_test_service();
        let secret = TotpService::generate_secret();

        let qr_base64 = service
            .generate_qr_code("test@example.com", &secret)
            .unwrap();
        assert!(!qr_base64.is_empty());
    }

    #[test]
    fn test_new_with_invalid_digits() {
        assert!(TotpService::new("TestApp".to_string(), 4, 30, 0).is_err());
        assert!(TotpService::new("TestApp".to_string(), 9, 30, 0).is_err());
    }

    #[test]
    fn test_new_with_zero_step() {
        assert!(TotpService::new("TestApp".to_string(), 6, 0, 0).is_err());
    }
}
