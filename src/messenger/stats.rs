use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Счётчики рассылки мессенджера.
#[derive(Debug, Default)]
pub struct MessengerStats {
    /// Общее количество вызовов `send`
    sends: AtomicU64,
    /// Количество успешно вызванных обработчиков
    deliveries: AtomicU64,
    /// Сколько раз при рассылке встречен мёртвый получатель
    skipped_dead: AtomicU64,
    /// Количество обработчиков, вернувших ошибку
    handler_failures: AtomicU64,
    /// Количество выполненных `cleanup`
    compactions: AtomicU64,
    /// Мёртвые получатели, встреченные после последней очистки
    dead_since_compaction: AtomicUsize,
}

/// Снимок счётчиков на момент вызова.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessengerStatsSnapshot {
    pub sends: u64,
    pub deliveries: u64,
    pub skipped_dead: u64,
    pub handler_failures: u64,
    pub compactions: u64,
}

impl MessengerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&self) {
        self.sends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Учитывает мёртвых получателей и возвращает их количество с момента
    /// последней очистки.
    pub fn record_dead(
        &self,
        count: usize,
    ) -> usize {
        if count == 0 {
            return self.dead_since_compaction.load(Ordering::Relaxed);
        }
        self.skipped_dead.fetch_add(count as u64, Ordering::Relaxed);
        self.dead_since_compaction.fetch_add(count, Ordering::Relaxed) + count
    }

    pub fn record_compaction(&self) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
        self.dead_since_compaction.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MessengerStatsSnapshot {
        MessengerStatsSnapshot {
            sends: self.sends.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            skipped_dead: self.skipped_dead.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
        }
    }
}
