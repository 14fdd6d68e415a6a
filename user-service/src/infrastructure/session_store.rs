use async_trait::async_trait;
use redis::AsyncCommands;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::MemoryStore;

/// Session records stored as JSON under `<prefix><session id>`, expiring
/// together with the session.
#[derive(Debug, Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    fn key(&self, id: &Id) -> String {
        format!("{}{id}", self.prefix)
    }

    async fn connection(&self) -> session_store::Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| session_store::Error::Backend(format!("connection failed: {e}")))
    }

    /// Writes the record; with `only_if_absent` the write is skipped when the
    /// key already exists and `false` is returned.
    async fn put(&self, record: &Record, only_if_absent: bool) -> session_store::Result<bool> {
        let data = serde_json::to_string(record)
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;
        let ttl_secs = seconds_until(record.expiry_date);

        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(&record.id)).arg(data).arg("EX").arg(ttl_secs);
        if only_if_absent {
            cmd.arg("NX");
        }

        let mut conn = self.connection().await?;
        let written: Option<String> = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| session_store::Error::Backend(format!("SET failed: {e}")))?;
        Ok(written.is_some())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while !self.put(record, true).await? {
            record.id = Id::default();
        }
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.put(record, false).await?;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(self.key(session_id))
            .await
            .map_err(|e| session_store::Error::Backend(format!("GET failed: {e}")))?;

        raw.map(|data| {
            serde_json::from_str(&data).map_err(|e| session_store::Error::Decode(e.to_string()))
        })
        .transpose()
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(self.key(session_id))
            .await
            .map_err(|e| session_store::Error::Backend(format!("DEL failed: {e}")))?;
        Ok(())
    }
}

/// Redis when configured, process memory otherwise.
#[derive(Debug, Clone)]
pub enum AppSessionStore {
    Redis(RedisSessionStore),
    Memory(MemoryStore),
}

#[async_trait]
impl SessionStore for AppSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        match self {
            AppSessionStore::Redis(store) => store.create(record).await,
            AppSessionStore::Memory(store) => store.create(record).await,
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            AppSessionStore::Redis(store) => store.save(record).await,
            AppSessionStore::Memory(store) => store.save(record).await,
        }
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            AppSessionStore::Redis(store) => store.load(session_id).await,
            AppSessionStore::Memory(store) => store.load(session_id).await,
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        match self {
            AppSessionStore::Redis(store) => store.delete(session_id).await,
            AppSessionStore::Memory(store) => store.delete(session_id).await,
        }
    }
}

fn seconds_until(expiry: OffsetDateTime) -> i64 {
    (expiry - OffsetDateTime::now_utc()).whole_seconds().max(1)
}
