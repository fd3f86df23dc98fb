pub mod auth;
pub mod email;
pub mod otp;
pub mod totp;

pub use email::EmailService;
pub use otp::OtpService;
pub use totp::TotpService;
