use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CacheError;
use crate::models::Seat;

pub mod seats;

pub use seats::{load_available_seats, CacheService};

/// Ключ кеша свободных мест события
pub fn seats_key(event_id: Uuid) -> String {
    format!("seats:{}", event_id)
}

/// Кеш списка свободных мест. Ядру нужна только инвалидация,
/// чтение используют обработчики HTTP.
#[async_trait]
pub trait SeatCache: Send + Sync {
    async fn invalidate_seats(&self, event_id: Uuid) -> Result<(), CacheError>;

    async fn get_seats(&self, event_id: Uuid) -> Result<Option<Vec<Seat>>, CacheError>;

    async fn save_seats(&self, event_id: Uuid, seats: &[Seat]) -> Result<(), CacheError>;
}

/// Заглушка, когда Redis не настроен
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl SeatCache for NoopCache {
    async fn invalidate_seats(&self, _event_id: Uuid) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get_seats(&self, _event_id: Uuid) -> Result<Option<Vec<Seat>>, CacheError> {
        Ok(None)
    }

    async fn save_seats(&self, _event_id: Uuid, _seats: &[Seat]) -> Result<(), CacheError> {
        Ok(())
    }
}
