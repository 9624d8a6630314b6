// ============================================================================
// STOCKAGE OTP (clé/valeur avec expiration)
// ============================================================================
//
// Description:
//   Petites valeurs à durée de vie courte pour le flux OTP:
//     - otp:<email>       → code à 6 chiffres (TTL 600s)
//     - verified:<email>  → "true" après vérification (TTL 600s)
//
// Implémentations:
//   - RedisOtpStore : production (ConnectionManager, reconnexion auto)
//   - MemoryOtpStore : quand REDIS_URL n'est pas défini (dev) et en tests
//
// Points d'attention:
//   - take_if_eq est atomique (script Lua côté Redis, Mutex en mémoire):
//     un même code ne peut être consommé qu'une seule fois.
//
// ============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{AsyncCommands, Client, Script, aio::ConnectionManager};
use tokio::sync::Mutex;

use crate::error::ApiError;

#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ApiError>;

    async fn get(&self, key: &str) -> Result<Option<String>, ApiError>;

    async fn del(&self, key: &str) -> Result<(), ApiError>;

    /// Supprime la clé seulement si sa valeur vaut `expected`.
    /// Retourne true si la clé a été supprimée.
    async fn take_if_eq(&self, key: &str, expected: &str) -> Result<bool, ApiError>;
}

const TAKE_IF_EQ_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

pub struct RedisOtpStore {
    connection: ConnectionManager,
    take_if_eq: Script,
}

impl RedisOtpStore {
    pub async fn connect(redis_url: &str) -> Result<Self, ApiError> {
        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;

        Ok(Self {
            connection,
            take_if_eq: Script::new(TAKE_IF_EQ_SCRIPT),
        })
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ApiError> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<(), ApiError> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn take_if_eq(&self, key: &str, expected: &str) -> Result<bool, ApiError> {
        let mut conn = self.connection.clone();
        let removed: i64 = self
            .take_if_eq
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }
}

#[derive(Default)]
pub struct MemoryOtpStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ApiError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        // Purge des codes expirés jamais relus
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get(key).cloned();
        match entry {
            Some((value, expires_at)) if expires_at > Instant::now() => Ok(Some(value)),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<(), ApiError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn take_if_eq(&self, key: &str, expected: &str) -> Result<bool, ApiError> {
        let mut entries = self.entries.lock().await;
        let matches = matches!(
            entries.get(key),
            Some((value, expires_at)) if value == expected && *expires_at > Instant::now()
        );
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }
}
