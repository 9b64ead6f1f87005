//! Pending-input storage for chat conversations.
//!
//! A conversation that is halfway through a multi step flow (picking a date,
//! then a slot, ...) keeps its position here, keyed by conversation id.
//! Redis is used when a url is configured, otherwise entries live in process.
//! Lookups never fail: a broken backend reads as "nothing pending".
#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::time::{Duration, Instant};

use deadpool_redis::cmd;
use deadpool_redis::Connection;
use deadpool_redis::Pool as RedisPool;
use redis::RedisError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error};

mod stats;

pub use stats::{LoadedStats, Stats};

/// pending input is dropped after half an hour of silence
const DEFAULT_TTL: u64 = 60 * 30;

lazy_static! {
    static ref SESSIONS: RwLock<Sessions> = RwLock::new(Sessions::default());
}

pub struct Sessions {
    backend: Backend,
    ttl: u64,
}

enum Backend {
    Redis(RedisPool),
    Local(HashMap<String, LocalEntry>),
}

struct LocalEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl LocalEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

#[derive(Serialize, Debug)]
pub struct SessionStatus {
    /// "redis" or "local"
    backend: &'static str,
    /// false when redis is configured but no connection can be retrieved
    healthy: bool,
    ttl: u64,
}

pub trait SessionKey {
    fn session_key<T: Display>(id: T) -> String;
}

impl Sessions {
    fn default() -> Self {
        Sessions {
            backend: Backend::Local(HashMap::new()),
            ttl: DEFAULT_TTL,
        }
    }

    /// Switch the session backend, `None` keeps everything in process.
    /// Entries stored before the switch are lost.
    pub async fn init(url: Option<String>, ttl: u64) -> Result<(), RedisError> {
        let backend = match url {
            Some(url) => {
                let cfg = deadpool_redis::Config {
                    url: Some(url),
                    ..Default::default()
                };
                Backend::Redis(cfg.create_pool()?)
            }
            None => Backend::Local(HashMap::new()),
        };

        let mut sessions = SESSIONS.write().await;
        *sessions = Sessions { backend, ttl };

        Ok(())
    }

    async fn redis_pool() -> Option<RedisPool> {
        let sessions = SESSIONS.read().await;
        match &sessions.backend {
            Backend::Redis(pool) => Some(pool.clone()),
            Backend::Local(_) => None,
        }
    }

    #[tracing::instrument(skip(pool))]
    async fn connection(pool: &RedisPool) -> Option<Connection> {
        match pool.get().await {
            Ok(connection) => Some(connection),
            Err(err) => {
                error!("unable to get session connection: {}", err);
                None
            }
        }
    }

    #[tracing::instrument(name = "sessions::get")]
    pub async fn get<T: DeserializeOwned + SessionKey, I: Display + Debug>(id: I) -> Option<T> {
        let key: String = T::session_key(id);

        let raw = match Sessions::redis_pool().await {
            Some(pool) => {
                let mut conn = Sessions::connection(&pool).await?;
                let res: Result<Option<Vec<u8>>, RedisError> =
                    cmd("GET").arg(&key).query_async(&mut conn).await;

                match res {
                    Ok(raw) => raw,
                    Err(err) => {
                        error!("unable to fetch {} from sessions: {}", &key, err);
                        return None;
                    }
                }
            }
            None => {
                let sessions = SESSIONS.read().await;
                let raw = match &sessions.backend {
                    Backend::Local(entries) => entries
                        .get(&key)
                        .filter(|entry| !entry.is_expired(Instant::now()))
                        .map(|entry| entry.value.clone()),
                    Backend::Redis(_) => None,
                };
                raw
            }
        };

        let restored = raw.and_then(|raw| serde_json::from_slice::<T>(&raw).ok());

        if restored.is_some() {
            Stats::restored();
            debug!("restored {} from sessions", &key);
        } else {
            Stats::missing();
        }

        restored
    }

    #[tracing::instrument(name = "sessions::set", skip(object))]
    pub async fn set<T: Serialize + SessionKey, I: Display + Debug>(object: &T, id: I) {
        let key: String = T::session_key(id);

        let value = match serde_json::to_vec(object) {
            Ok(res) => res,
            Err(err) => {
                error!("unable to serialize session {}: {}", &key, err);
                return;
            }
        };

        if let Some(pool) = Sessions::redis_pool().await {
            let mut conn = match Sessions::connection(&pool).await {
                Some(conn) => conn,
                None => return,
            };
            let ttl = SESSIONS.read().await.ttl;

            let res = cmd("SETEX")
                .arg(&key)
                .arg(ttl)
                .arg(value)
                .execute_async(&mut conn)
                .await;

            if let Err(err) = res {
                error!("unable to store session {}: {}", &key, err);
            }
            return;
        }

        let mut sessions = SESSIONS.write().await;
        let ttl = Duration::from_secs(sessions.ttl);
        if let Backend::Local(entries) = &mut sessions.backend {
            let now = Instant::now();
            entries.retain(|_, entry| !entry.is_expired(now));
            entries.insert(
                key,
                LocalEntry {
                    value,
                    expires_at: now + ttl,
                },
            );
        }
    }

    #[tracing::instrument(name = "sessions::delete")]
    pub async fn delete<T: SessionKey, I: Display + Debug>(id: I) {
        let key: String = T::session_key(id);

        if let Some(pool) = Sessions::redis_pool().await {
            let mut conn = match Sessions::connection(&pool).await {
                Some(conn) => conn,
                None => return,
            };

            let res = cmd("DEL").arg(&key).execute_async(&mut conn).await;

            if let Err(err) = res {
                error!("unable to delete session {}: {}", &key, err);
            }
            return;
        }

        let mut sessions = SESSIONS.write().await;
        if let Backend::Local(entries) = &mut sessions.backend {
            entries.remove(&key);
        }
    }

    pub async fn status() -> SessionStatus {
        let ttl = SESSIONS.read().await.ttl;

        match Sessions::redis_pool().await {
            Some(pool) => SessionStatus {
                backend: "redis",
                healthy: Sessions::connection(&pool).await.is_some(),
                ttl,
            },
            None => SessionStatus {
                backend: "local",
                healthy: true,
                ttl,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Marker {
        step: String,
    }

    impl SessionKey for Marker {
        fn session_key<T: Display>(id: T) -> String {
            format!("test.marker.{}", id)
        }
    }

    #[test]
    fn local_set_get_delete() {
        block_on(async {
            let marker = Marker {
                step: "awaiting_date".to_string(),
            };

            Sessions::set(&marker, 1).await;
            assert_eq!(Sessions::get::<Marker, _>(1).await, Some(marker));

            Sessions::delete::<Marker, _>(1).await;
            assert_eq!(Sessions::get::<Marker, _>(1).await, None);
        });
    }

    #[test]
    fn keys_are_scoped_per_conversation() {
        block_on(async {
            let marker = Marker {
                step: "awaiting_slot".to_string(),
            };

            Sessions::set(&marker, 10).await;

            assert!(Sessions::get::<Marker, _>(11).await.is_none());
            assert!(Sessions::get::<Marker, _>(10).await.is_some());
        });
    }

    #[test]
    fn entries_expire() {
        let now = Instant::now();
        let entry = LocalEntry {
            value: vec![],
            expires_at: now + Duration::from_secs(5),
        };

        assert!(!entry.is_expired(now));
        assert!(entry.is_expired(now + Duration::from_secs(5)));
    }

    #[test]
    fn local_status_is_healthy() {
        let status = block_on(Sessions::status());

        assert_eq!(status.backend, "local");
        assert!(status.healthy);
    }
}
