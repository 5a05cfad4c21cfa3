use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{seats_key, SeatCache};
use crate::error::{CacheError, StoreError};
use crate::models::Seat;
use crate::redis_client::RedisClient;
use crate::stores::SeatStore;

// 24 часа, инвалидация происходит при каждом изменении
const SEATS_TTL_SECS: u64 = 86400;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
}

impl CacheService {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SeatCache for CacheService {
    async fn invalidate_seats(&self, event_id: Uuid) -> Result<(), CacheError> {
        let mut conn = self.redis.conn.clone();
        conn.del::<_, ()>(seats_key(event_id)).await?;
        info!(%event_id, "Invalidated seats cache");
        Ok(())
    }

    async fn get_seats(&self, event_id: Uuid) -> Result<Option<Vec<Seat>>, CacheError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(seats_key(event_id)).await?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn save_seats(&self, event_id: Uuid, seats: &[Seat]) -> Result<(), CacheError> {
        let data = serde_json::to_string(seats)?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex::<_, _, ()>(seats_key(event_id), data, SEATS_TTL_SECS)
            .await?;
        Ok(())
    }
}

/// Свободные места: сначала кеш, при промахе или ошибке кеша идём в хранилище
pub async fn load_available_seats(
    cache: &dyn SeatCache,
    store: &dyn SeatStore,
    event_id: Uuid,
) -> Result<Vec<Seat>, StoreError> {
    match cache.get_seats(event_id).await {
        Ok(Some(seats)) => return Ok(seats),
        Ok(None) => {}
        Err(e) => warn!(%event_id, error = %e, "seats cache read failed, falling back to store"),
    }

    let seats = store.get_available_by_event(event_id).await?;

    if let Err(e) = cache.save_seats(event_id, &seats).await {
        warn!(%event_id, error = %e, "failed to save seats to cache");
    }

    Ok(seats)
}
