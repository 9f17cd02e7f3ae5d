use std::time::Duration;

use crate::error::BatchConfigError;

/// Пороги агрегатора; все поля обязательны и проверяются при
/// создании [`Batcher`](super::Batcher).
///
/// Сброс пакета происходит по первому из условий: набралось
/// `max_messages` элементов, объём пакета достиг `max_buffered_bytes`
/// или самый старый элемент прождал `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Максимум элементов в одном пакете.
    pub max_messages: usize,
    /// Максимальное ожидание элемента до принудительного сброса.
    pub max_delay: Duration,
    /// Максимальный размер одного элемента в байтах.
    pub max_item_size: usize,
    /// Потолок суммарного объёма неразрешённых элементов (backpressure).
    pub max_buffered_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_messages: 100,
            max_delay: Duration::from_millis(10),
            max_item_size: 10 << 20,
            max_buffered_bytes: 100 << 20,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), BatchConfigError> {
        if self.max_messages == 0 {
            return Err(BatchConfigError::ZeroMessages);
        }
        if self.max_delay.is_zero() {
            return Err(BatchConfigError::ZeroDelay);
        }
        if self.max_item_size == 0 {
            return Err(BatchConfigError::ZeroItemSize);
        }
        if self.max_item_size > self.max_buffered_bytes {
            return Err(BatchConfigError::ItemLargerThanBuffer {
                item: self.max_item_size,
                buffered: self.max_buffered_bytes,
            });
        }
        Ok(())
    }
}
