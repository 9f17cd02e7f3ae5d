//! Адаптивная пакетная отправка.
//!
//! Развязывает продюсеров, ставящих отдельные элементы и ждущих
//! индивидуального результата, и коллаборатора, которому выгодно
//! обрабатывать элементы пакетами:
//!
//! - `config`: пороги сброса (количество, задержка, размеры) и их
//!   валидация.
//! - `batcher`: агрегатор с фоновой задачей сброса и слотом результата
//!   на каждый принятый элемент.
//! - `dispatch`: контракт коллаборатора отправки и реализация поверх
//!   публикации в тему.

pub mod batcher;
pub mod config;
pub mod dispatch;

pub use batcher::{BatchHandle, Batcher};
pub use config::BatchConfig;
pub use dispatch::{BatchDispatcher, TopicDispatcher};
