use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// ビルド済みドキュメントサイトのディレクトリ（`/` に配信）
    #[serde(default = "default_site_dir")]
    pub site_dir: String,

    // SMTP設定（smtp_host 未設定時はメール送信無効）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_tls: SmtpTlsMode,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default = "default_smtp_from_address")]
    pub smtp_from_address: String,

    // 2FA (TOTP) 設定
    /// TOTP発行者名（認証アプリに表示される）
    #[serde(default = "default_totp_issuer")]
    pub totp_issuer: String,
    #[serde(default = "default_totp_step_secs")]
    pub totp_step_secs: u64,
    #[serde(default = "default_totp_digits")]
    pub totp_digits: usize,
    /// 現在ステップの前後に許容するステップ数（0 = 現在ステップのみ）
    #[serde(default)]
    pub totp_skew_steps: u8,
}

/// SMTP接続の暗号化方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTlsMode {
    /// 平文接続後に STARTTLS でアップグレード（587番ポート）
    #[default]
    Starttls,
    /// 接続時から TLS（465番ポート）
    Tls,
    /// 暗号化なし（ローカル開発用リレーのみ）
    None,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SITE_DIR: &str = "site";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_FROM_ADDRESS: &str = "noreply@example.com";
const DEFAULT_TOTP_ISSUER: &str = "itembox";
const DEFAULT_TOTP_STEP_SECS: u64 = 30;
const DEFAULT_TOTP_DIGITS: usize = 6;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_site_dir() -> String {
    DEFAULT_SITE_DIR.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_smtp_from_address() -> String {
    DEFAULT_SMTP_FROM_ADDRESS.to_string()
}

fn default_totp_issuer() -> String {
    DEFAULT_TOTP_ISSUER.to_string()
}

fn default_totp_step_secs() -> u64 {
    DEFAULT_TOTP_STEP_SECS
}

fn default_totp_digits() -> usize {
    DEFAULT_TOTP_DIGITS
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// 任意のキー/値ペアから設定を構築（テスト・埋め込み用）
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        envy::from_iter(pairs.into_iter().map(|(k, v)| (k.into(), v.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_pairs(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.site_dir, "site");
        assert!(config.smtp_host.is_none());
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.smtp_tls, SmtpTlsMode::Starttls);
        assert_eq!(config.totp_step_secs, 30);
        assert_eq!(config.totp_digits, 6);
        assert_eq!(config.totp_skew_steps, 0);
    }

    #[test]
    fn test_smtp_settings_from_pairs() {
        let config = Config::from_pairs([
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_TLS", "tls"),
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_PASSWORD", "hunter2"),
            ("TOTP_SKEW_STEPS", "1"),
        ])
        .unwrap();
        assert_eq!(config.smtp_host.as_deref(), Some("smtp.example.com"));
        assert_eq!(config.smtp_port, 465);
        assert_eq!(config.smtp_tls, SmtpTlsMode::Tls);
        assert!(config.smtp_username.is_some());
        assert_eq!(config.totp_skew_steps, 1);
    }

    #[test]
    fn test_invalid_tls_mode() {
        let result = Config::from_pairs([("SMTP_TLS", "ssl3")]);
        assert!(result.is_err());
    }
}
