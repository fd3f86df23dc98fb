use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::services::email::EmailError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("認証エラー")]
    Authentication,

    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("メール送信エラー")]
    EmailDelivery(#[from] EmailError),

    #[error("このユーザー名は既に使用されています")]
    UsernameAlreadyExists,

    #[error("ユーザーが見つかりません")]
    UserNotFound,

    #[error("二要素認証は既に設定済みです")]
    OtpAlreadyEnrolled,

    #[error("二要素認証が設定されていません")]
    OtpNotEnrolled,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Authentication => (
                StatusCode::UNAUTHORIZED,
                "ユーザー名またはパスワードが正しくありません".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::EmailDelivery(e) => {
                tracing::error!(error = %e, "メール送信エラー");
                (
                    StatusCode::BAD_GATEWAY,
                    "メールの送信に失敗しました".to_string(),
                )
            }
            Self::UsernameAlreadyExists => (
                StatusCode::CONFLICT,
                "このユーザー名は既に使用されています".to_string(),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "ユーザーが見つかりません".to_string(),
            ),
            Self::OtpAlreadyEnrolled => (
                StatusCode::CONFLICT,
                "二要素認証は既に設定済みです".to_string(),
            ),
            Self::OtpNotEnrolled => (
                StatusCode::BAD_REQUEST,
                "二要素認証が設定されていません".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
