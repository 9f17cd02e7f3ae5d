use std::collections::HashMap;

use thiserror::Error;

/// Ошибка, с которой разрешается отдельный элемент пакета,
/// либо синхронный отказ при постановке в очередь.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Элемент больше допустимого размера; никогда не буферизуется.
    #[error("item of {size} bytes exceeds the per-item limit of {limit} bytes")]
    OversizedItem { size: usize, limit: usize },

    /// Суммарный объём ожидающих элементов упёрся в потолок.
    #[error("buffered bytes would exceed the ceiling of {limit} bytes")]
    BufferOverflow { limit: usize },

    /// Агрегатор закрыт: новые элементы не принимаются, а слот
    /// результата уже не может быть записан.
    #[error("batcher is closed")]
    Closed,

    /// Отправка пакета целиком завершилась неудачей.
    #[error("batch dispatch failed: {0}")]
    DispatchFailed(String),

    /// Коллаборатор отклонил именно этот элемент.
    #[error("item rejected by the dispatcher: {0}")]
    ItemFailed(String),
}

/// Ошибка, возвращаемая коллаборатором пакетной отправки.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Пакет не доставлен целиком, без поэлементных деталей.
    #[error("batch dispatch failed: {0}")]
    Batch(String),

    /// Часть элементов отклонена; ключ — позиция элемента в пакете.
    #[error("{n} item(s) of the batch failed", n = .0.len())]
    Items(HashMap<usize, String>),
}

/// Ошибка валидации конфигурации агрегатора.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchConfigError {
    #[error("max_messages must be greater than zero")]
    ZeroMessages,

    #[error("max_delay must be greater than zero")]
    ZeroDelay,

    #[error("max_item_size must be greater than zero")]
    ZeroItemSize,

    #[error("max_item_size ({item}) must not exceed max_buffered_bytes ({buffered})")]
    ItemLargerThanBuffer { item: usize, buffered: usize },
}
