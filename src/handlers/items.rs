use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use garde::Validate;
use serde::Serialize;

use crate::error::AppError;
use crate::models::Item;
use crate::state::AppState;

const ITEM_CREATED: &str = "Item created";

#[derive(Debug, Serialize)]
pub struct CreateItemResponse {
    pub message: &'static str,
    pub item: Item,
}

/// GET /api/items
///
/// 全アイテムを追加順で返す
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<Item>> {
    Json(state.item_repo.list().await)
}

/// POST /api/items
///
/// アイテムを末尾に追加
///
/// 不正なJSON・フィールド欠落・型不一致・空の name はストアに触れる前に 422
pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<Item>, JsonRejection>,
) -> Result<Json<CreateItemResponse>, AppError> {
    let Json(item) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "アイテムのデシリアライズ失敗");
        AppError::Validation(rejection.body_text())
    })?;

    // バリデーション
    validate_item(&item)?;

    let item = state.item_repo.create(item).await;

    tracing::info!(name = %item.name, value = item.value, "アイテム追加");

    Ok(Json(CreateItemResponse {
        message: ITEM_CREATED,
        item,
    }))
}

/// アイテムのバリデーション
fn validate_item(item: &Item) -> Result<(), AppError> {
    item.validate()
        .map_err(|report| AppError::Validation(report.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_name() {
        let result = validate_item(&Item::new("", 1));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_valid_item() {
        assert!(validate_item(&Item::new("Widget", 5)).is_ok());
    }

    #[test]
    fn test_response_shape() {
        let response = CreateItemResponse {
            message: ITEM_CREATED,
            item: Item::new("Widget", 5),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"message": "Item created", "item": {"name": "Widget", "value": 5}})
        );
    }
}
