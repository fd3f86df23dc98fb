use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::Item;

/// インメモリのアイテムストア
///
/// プロセス終了時に内容は失われる（永続化なし）。
/// 追加は書き込みロックで直列化されるが、並行呼び出し間の順序は不定。
#[derive(Clone, Default)]
pub struct ItemRepository {
    items: Arc<RwLock<Vec<Item>>>,
}

impl ItemRepository {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// 初期データ（2件）入りのストアを作成
    pub fn seeded() -> Self {
        Self::new(vec![Item::new("Item 1", 10), Item::new("Item 2", 20)])
    }

    /// 全アイテムを追加順で返す
    pub async fn list(&self) -> Vec<Item> {
        self.items.read().await.clone()
    }

    /// アイテムを末尾に追加
    ///
    /// # Note
    /// バリデーション済みの値を渡すこと
    pub async fn create(&self, item: Item) -> Item {
        self.items.write().await.push(item.clone());
        item
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}
