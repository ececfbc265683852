//! In-process client backed directly by the database.
//!
//! Lets `parish intentions edit --local` work without a running server and
//! gives the edit session a real store in tests.

use super::{IntentionsApi, MessagesApi};
use crate::error::{Error, Result};
use crate::model::{IntentionMonth, MonthPayload};
use crate::storage::SqliteStorage;
use std::sync::{Arc, Mutex, MutexGuard};

/// [`IntentionsApi`] over a shared [`SqliteStorage`].
#[derive(Debug, Clone)]
pub struct LocalApi {
    storage: Arc<Mutex<SqliteStorage>>,
    actor: String,
}

impl LocalApi {
    #[must_use]
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, actor: &str) -> Self {
        Self {
            storage,
            actor: actor.to_string(),
        }
    }

    fn storage(&self) -> Result<MutexGuard<'_, SqliteStorage>> {
        self.storage
            .lock()
            .map_err(|_| Error::Other("storage lock poisoned".to_string()))
    }
}

impl IntentionsApi for LocalApi {
    async fn list_months(&self, year: i32) -> Result<Vec<IntentionMonth>> {
        self.storage()?.list_intention_months(Some(year))
    }

    async fn create_month(&self, payload: &MonthPayload) -> Result<IntentionMonth> {
        self.storage()?.create_intention_month(payload, &self.actor)
    }

    async fn update_month(&self, id: i64, payload: &MonthPayload) -> Result<IntentionMonth> {
        self.storage()?.replace_intention_month(id, payload, &self.actor)
    }
}

impl MessagesApi for LocalApi {
    async fn unread_count(&self) -> Result<i64> {
        self.storage()?.unread_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IntentionInput;

    #[tokio::test]
    async fn test_local_round_trip_uses_actor() {
        let storage = Arc::new(Mutex::new(SqliteStorage::open_memory().unwrap()));
        let api = LocalApi::new(Arc::clone(&storage), "sacristan");

        let created = api
            .create_month(&MonthPayload {
                year: 2026,
                month: 5,
                intentions: vec![IntentionInput {
                    date: "2026-05-03".to_string(),
                    time: "07:00".to_string(),
                    intention: "For vocations".to_string(),
                }],
            })
            .await
            .unwrap();

        let months = api.list_months(2026).await.unwrap();
        assert_eq!(months, vec![created.clone()]);

        let guard = storage.lock().unwrap();
        let events = crate::storage::audit::get_events(
            guard.conn(),
            "intention_month",
            &created.id.to_string(),
            None,
        )
        .unwrap();
        assert_eq!(events[0].actor, "sacristan");
    }
}
