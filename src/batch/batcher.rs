use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{timeout_at, Instant},
};

use super::{BatchConfig, BatchDispatcher};
use crate::error::{BatchConfigError, BatchError, DispatchError};

/// Принятый элемент: содержимое, учтённый размер и слот результата,
/// который записывается ровно один раз — тем сбросом, который элемент
/// обработал.
struct PendingItem {
    payload: Bytes,
    size: usize,
    enqueued_at: Instant,
    done: oneshot::Sender<Result<(), BatchError>>,
}

/// Handle принятого элемента; разрешается ровно один раз.
#[derive(Debug)]
pub struct BatchHandle {
    result: oneshot::Receiver<Result<(), BatchError>>,
}

impl BatchHandle {
    /// Ожидает результат элемента: успех, ошибку его пакета или
    /// ошибку именно этого элемента.
    ///
    /// Потерянный слот (агрегатор уничтожен, не успев записать
    /// результат) наблюдается как [`BatchError::Closed`], а не как
    /// вечное ожидание.
    pub async fn wait(self) -> Result<(), BatchError> {
        self.result.await.unwrap_or(Err(BatchError::Closed))
    }
}

/// Агрегатор: копит элементы от конкурентных продюсеров и сбрасывает
/// их пакетами коллаборатору отправки.
///
/// Сбросы выполняет единственная фоновая задача, поэтому сбросы
/// одного агрегатора не перекрываются, пакеты уходят в порядке
/// закрытия, а порядок элементов внутри пакета — порядок постановки.
pub struct Batcher {
    sender: Mutex<Option<mpsc::UnboundedSender<PendingItem>>>,
    flusher: Mutex<Option<JoinHandle<()>>>,
    buffered: Arc<AtomicUsize>,
    config: BatchConfig,
}

impl Batcher {
    /// Проверяет конфигурацию и запускает фоновую задачу сброса.
    /// Должен вызываться внутри рантайма Tokio.
    pub fn new(
        config: BatchConfig,
        dispatcher: Arc<dyn BatchDispatcher>,
    ) -> Result<Self, BatchConfigError> {
        config.validate()?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let buffered = Arc::new(AtomicUsize::new(0));
        let flusher = tokio::spawn(flush_loop(
            receiver,
            dispatcher,
            config.clone(),
            buffered.clone(),
        ));

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            flusher: Mutex::new(Some(flusher)),
            buffered,
            config,
        })
    }

    /// Ставит элемент в текущий открытый пакет.
    ///
    /// Отклоняет без буферизации: элемент больше `max_item_size`,
    /// превышение потолка `max_buffered_bytes`, закрытый агрегатор.
    /// Принятый элемент получает handle, который разрешится ровно
    /// один раз.
    pub fn enqueue(&self, payload: impl Into<Bytes>) -> Result<BatchHandle, BatchError> {
        let payload = payload.into();
        let size = payload.len();

        if size > self.config.max_item_size {
            return Err(BatchError::OversizedItem {
                size,
                limit: self.config.max_item_size,
            });
        }

        // Резервируем байты под потолком одной атомарной операцией;
        // освобождает их сброс, обработавший элемент.
        let ceiling = self.config.max_buffered_bytes;
        if self
            .buffered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current + size <= ceiling).then_some(current + size)
            })
            .is_err()
        {
            return Err(BatchError::BufferOverflow { limit: ceiling });
        }

        let (done, result) = oneshot::channel();
        let item = PendingItem {
            payload,
            size,
            enqueued_at: Instant::now(),
            done,
        };

        let sender = self.sender.lock();
        let accepted = match sender.as_ref() {
            Some(tx) => tx.send(item).is_ok(),
            None => false,
        };
        drop(sender);

        if !accepted {
            self.buffered.fetch_sub(size, Ordering::AcqRel);
            return Err(BatchError::Closed);
        }

        Ok(BatchHandle { result })
    }

    /// Суммарный объём принятых, но ещё не разрешённых элементов.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Закрывает агрегатор: новые элементы отклоняются, всё ещё
    /// буферизованное принудительно сбрасывается коллаборатору, после
    /// чего фоновая задача завершается.
    pub async fn close(&self) {
        let sender = self.sender.lock().take();
        drop(sender);

        let flusher = self.flusher.lock().take();
        if let Some(flusher) = flusher {
            if let Err(err) = flusher.await {
                tracing::error!(error = %err, "flush loop panicked");
            }
        }
    }
}

/// Единственная задача сброса: копит элементы до первого из порогов
/// и передаёт закрытый пакет коллаборатору.
async fn flush_loop(
    mut receiver: mpsc::UnboundedReceiver<PendingItem>,
    dispatcher: Arc<dyn BatchDispatcher>,
    config: BatchConfig,
    buffered: Arc<AtomicUsize>,
) {
    loop {
        // Пакет открывается первым пришедшим элементом.
        let Some(first) = receiver.recv().await else {
            break;
        };

        let deadline = first.enqueued_at + config.max_delay;
        let mut bytes = first.size;
        let mut batch = vec![first];
        let mut closed = false;

        while batch.len() < config.max_messages && bytes < config.max_buffered_bytes {
            match timeout_at(deadline, receiver.recv()).await {
                Ok(Some(item)) => {
                    bytes += item.size;
                    batch.push(item);
                }
                // Продюсеров больше нет: сбрасываем остаток и выходим.
                Ok(None) => {
                    closed = true;
                    break;
                }
                // Самый старый элемент прождал max_delay.
                Err(_) => break,
            }
        }

        flush(dispatcher.as_ref(), batch, bytes, &buffered).await;

        if closed {
            break;
        }
    }
}

/// Передаёт закрытый пакет коллаборатору и разрешает слот каждого
/// элемента согласно исходу.
async fn flush(
    dispatcher: &dyn BatchDispatcher,
    batch: Vec<PendingItem>,
    bytes: usize,
    buffered: &AtomicUsize,
) {
    tracing::debug!(items = batch.len(), bytes, "flushing batch");

    let payloads: Vec<Bytes> = batch.iter().map(|item| item.payload.clone()).collect();
    let outcome = dispatcher.dispatch(payloads).await;
    buffered.fetch_sub(bytes, Ordering::AcqRel);

    match outcome {
        Ok(()) => {
            for item in batch {
                let _ = item.done.send(Ok(()));
            }
        }
        Err(DispatchError::Batch(reason)) => {
            tracing::warn!(items = batch.len(), %reason, "batch dispatch failed");
            for item in batch {
                let _ = item.done.send(Err(BatchError::DispatchFailed(reason.clone())));
            }
        }
        Err(DispatchError::Items(failures)) => {
            tracing::warn!(
                items = batch.len(),
                failed = failures.len(),
                "batch dispatch partially failed"
            );
            for (position, item) in batch.into_iter().enumerate() {
                let result = match failures.get(&position) {
                    Some(reason) => Err(BatchError::ItemFailed(reason.clone())),
                    None => Ok(()),
                };
                let _ = item.done.send(result);
            }
        }
    }
}
