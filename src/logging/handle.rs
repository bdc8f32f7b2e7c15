use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use tracing_appender::non_blocking::WorkerGuard;

/// Метрики для LoggingHandle.
#[derive(Debug, Default)]
pub struct LoggingMetrics {
    /// Кол-во запрошенных flush
    pub flush_count: AtomicU64,
    /// Флаг активного shutdown
    pub shutdown_in_progress: AtomicBool,
}

/// Статистика логирования.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingStats {
    pub flush_count: u64,
    pub shutdown_in_progress: bool,
    pub file_sink: bool,
}

/// Handle для управления lifecycle логирования.
///
/// Держит `WorkerGuard` файлового приёмника: пока handle жив, фоновый поток
/// `tracing-appender` пишет в файл; при `shutdown` или drop буфер
/// сбрасывается.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    pub metrics: Arc<LoggingMetrics>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            metrics: Arc::new(LoggingMetrics::default()),
        }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Запрос flush. `WorkerGuard` сбрасывает буфер только при drop, так
    /// что здесь запрос лишь учитывается.
    pub fn flush(&self) {
        let count = self.metrics.flush_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(flush_count = count, "Logging flush requested");
    }

    /// Сбрасывает буфер файлового приёмника и завершает его фоновый поток.
    pub fn shutdown(mut self) {
        self.metrics
            .shutdown_in_progress
            .store(true, Ordering::Release);
        tracing::info!(
            total_flushes = self.metrics.flush_count.load(Ordering::Relaxed),
            "Initiating logging shutdown"
        );

        let start = Instant::now();
        drop(self.file_guard.take());
        tracing::info!(
            shutdown_duration_ms = start.elapsed().as_millis() as u64,
            "Logging shutdown completed"
        );
    }

    pub fn stats(&self) -> LoggingStats {
        LoggingStats {
            flush_count: self.metrics.flush_count.load(Ordering::Relaxed),
            shutdown_in_progress: self.metrics.shutdown_in_progress.load(Ordering::Acquire),
            file_sink: self.has_file_sink(),
        }
    }
}
