//! 会話単位の排他制御
//!
//! 送信・アーカイブ・交渉の遷移は、読み込みから publish までこのロックを保持する。
//! 同じ会話への書き込みが直列化され、チャンネル上のイベント順がコミット順と一致する。

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::ConversationId;

#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 会話のロックを取得する。ガードを drop すると解放される。
    ///
    /// 保持中・待機中のロックは map 以外からも参照されている。参照が map だけになった
    /// エントリは取得のたびに取り除くので、map の大きさは使用中の会話数 + 1 で抑えられる。
    pub async fn acquire(&self, conversation_id: ConversationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(conversation_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
