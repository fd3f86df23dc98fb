use serde::Serialize;

/// ユーザーアカウント
///
/// OTPシークレットはユーザーごとに1つ。一度生成したら暗黙に再生成しない。
/// パスワードハッシュとシークレット平文はシリアライズ・ログ出力禁止
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub hashed_password: String,
    pub otp_enabled: bool,
    pub otp_verified: bool,
    #[serde(skip)]
    pub otp_base32: Option<String>,
    pub passkey_registered: bool,
}

impl User {
    /// OTP未設定の新規ユーザーを作成
    pub fn new(username: String, email: String, hashed_password: String) -> Self {
        Self {
            username,
            email,
            hashed_password,
            otp_enabled: false,
            otp_verified: false,
            otp_base32: None,
            passkey_registered: false,
        }
    }
}
