use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::core::answer::{StoredResponse, decode_responses, encode_responses};
use crate::core::db::{AnswerKey, AnswerRepository, LocationCache};
use crate::models::Location;

/// In-process store. Answers are kept as serialized JSON so reads go through
/// the same decoding path as the durable store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    answers: Arc<RwLock<HashMap<AnswerKey, String>>>,
    location: Arc<RwLock<Option<Location>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(location: Location) -> Self {
        Self {
            location: Arc::new(RwLock::new(Some(location))),
            ..Self::default()
        }
    }

    /// Put raw text into an answer slot, bypassing encoding.
    pub async fn insert_raw(&self, key: AnswerKey, raw: impl Into<String>) {
        self.answers.write().await.insert(key, raw.into());
    }

    pub async fn raw(&self, key: &AnswerKey) -> Option<String> {
        self.answers.read().await.get(key).cloned()
    }
}

impl AnswerRepository for MemoryStore {
    async fn get_responses(&self, key: &AnswerKey) -> anyhow::Result<Vec<StoredResponse>> {
        match self.answers.read().await.get(key) {
            Some(raw) => Ok(decode_responses(raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn set_responses(&self, key: &AnswerKey, responses: &[StoredResponse]) -> anyhow::Result<()> {
        let raw = encode_responses(responses)?;
        self.answers.write().await.insert(key.clone(), raw);
        Ok(())
    }
}

impl LocationCache for MemoryStore {
    async fn get_location(&self) -> anyhow::Result<Option<Location>> {
        Ok(*self.location.read().await)
    }

    async fn set_location(&self, location: &Location) -> anyhow::Result<()> {
        *self.location.write().await = Some(*location);
        Ok(())
    }
}
