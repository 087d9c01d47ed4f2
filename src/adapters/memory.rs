use crate::domain::model::AccessToken;
use crate::domain::ports::{Clock, TokenStore};
use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// 行程內的單一權杖快取。冷啟動時為空，刷新時原地覆寫，不會被清除
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    slot: RwLock<Option<AccessToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self, now: DateTime<Utc>) -> Option<AccessToken> {
        // lock 被污染時視為快取未命中，重新取得權杖即可
        let slot = self.slot.read().ok()?;
        slot.as_ref().filter(|token| token.is_valid_at(now)).cloned()
    }

    fn store(&self, token: AccessToken) {
        match self.slot.write() {
            Ok(mut slot) => *slot = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
