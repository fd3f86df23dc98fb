use garde::Validate;
use serde::{Deserialize, Serialize};

/// アイテム（名前と整数値のペア）
///
/// 識別子・一意制約はなし。追加のみで更新・削除は行わない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Item {
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(skip)]
    pub value: i64,
}

impl Item {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
