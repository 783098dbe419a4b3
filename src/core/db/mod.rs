mod memory;
mod state;

use std::{fmt, future::Future, path::Path, sync::Arc};

use anyhow::Context;
use state::StoreState;

use crate::core::answer::{StoredResponse, decode_responses, encode_responses};
use crate::models::Location;

pub use memory::MemoryStore;

const LOCATION_KEY: &str = "location";

/// Identifies the answer slot of one question within one survey.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnswerKey {
    pub survey_id: String,
    pub question_id: String,
}

impl AnswerKey {
    pub fn new(survey_id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self {
            survey_id: survey_id.into(),
            question_id: question_id.into(),
        }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.survey_id, self.question_id)
    }
}

/// Durable per-question response lists.
///
/// `set_responses` replaces the whole list; there is no partial patch.
/// A key that was never written reads back as an empty list.
pub trait AnswerRepository {
    fn get_responses(&self, key: &AnswerKey) -> impl Future<Output = anyhow::Result<Vec<StoredResponse>>>;
    fn set_responses(
        &self,
        key: &AnswerKey,
        responses: &[StoredResponse],
    ) -> impl Future<Output = anyhow::Result<()>>;
}

/// The single last-known worker location shared by every question of a session.
pub trait LocationCache {
    fn get_location(&self) -> impl Future<Output = anyhow::Result<Option<Location>>>;
    fn set_location(&self, location: &Location) -> impl Future<Output = anyhow::Result<()>>;
}

/// SQLite-backed answer store and location cache.
#[derive(Debug, Clone)]
pub struct SurveyDb {
    state: Arc<StoreState>,
}

impl SurveyDb {
    pub async fn new<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::new(db_file).await?),
        })
    }

    pub fn path(&self) -> &Path {
        self.state.db_file()
    }

    /// Flush the write-ahead log into the database file and release it.
    /// The store is unusable afterwards.
    pub async fn close(&self) -> anyhow::Result<()> {
        self.state.checkpoint(false).await
    }

    /// Flush the write-ahead log but keep the store open.
    pub async fn flush(&self) -> anyhow::Result<()> {
        self.state.checkpoint(true).await
    }
}

impl AnswerRepository for SurveyDb {
    async fn get_responses(&self, key: &AnswerKey) -> anyhow::Result<Vec<StoredResponse>> {
        let mut conn = self.state.conn().await?;
        let record: Option<(String,)> = sqlx::query_as(
            r#"SELECT responses FROM answer WHERE survey_id = ?1 AND question_id = ?2"#,
        )
        .bind(&key.survey_id)
        .bind(&key.question_id)
        .fetch_optional(&mut **conn)
        .await?;
        match record {
            Some((raw,)) => Ok(decode_responses(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn set_responses(&self, key: &AnswerKey, responses: &[StoredResponse]) -> anyhow::Result<()> {
        let raw = encode_responses(responses)?;
        let mut conn = self.state.conn().await?;
        sqlx::query(
            r#"INSERT INTO answer (survey_id, question_id, responses) VALUES (?1, ?2, ?3)
            ON CONFLICT (survey_id, question_id) DO UPDATE SET responses = EXCLUDED.responses"#,
        )
        .bind(&key.survey_id)
        .bind(&key.question_id)
        .bind(raw)
        .execute(&mut **conn)
        .await
        .with_context(|| format!("Failed to store answer for {}", key))?;
        Ok(())
    }
}

impl LocationCache for SurveyDb {
    async fn get_location(&self) -> anyhow::Result<Option<Location>> {
        let mut conn = self.state.conn().await?;
        let record: Option<(String,)> =
            sqlx::query_as(r#"SELECT value FROM session_cache WHERE key = ?1"#)
                .bind(LOCATION_KEY)
                .fetch_optional(&mut **conn)
                .await?;
        match record {
            Some((raw,)) => Ok(Some(
                serde_json::from_str(&raw).context("Cached location is not valid JSON")?,
            )),
            None => Ok(None),
        }
    }

    async fn set_location(&self, location: &Location) -> anyhow::Result<()> {
        let raw = serde_json::to_string(location)?;
        let mut conn = self.state.conn().await?;
        sqlx::query(
            r#"INSERT INTO session_cache (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value"#,
        )
        .bind(LOCATION_KEY)
        .bind(raw)
        .execute(&mut **conn)
        .await?;
        Ok(())
    }
}
