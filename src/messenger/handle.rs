//! Ссылки на получателей: сильная (владеющая) и слабая (не продлевающая
//! жизнь объекта).
//!
//! Реестр хранит получателя только через [`RecipientHandle`]; политика
//! ([`ReferencePolicy`]) решает, какой тип ссылки создаётся при регистрации.

use std::{
    any::Any,
    fmt,
    sync::{Arc, Weak},
};

/// Получатель в стёртом виде.
pub type AnyRecipient = dyn Any + Send + Sync;

/// Идентичность получателя: адрес значения внутри `Arc`.
///
/// Не зависит от того, жив ли получатель. Пока реестр держит `Weak`,
/// аллокация не освобождается, поэтому адрес умершего получателя не может
/// достаться новому объекту.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipientId(usize);

impl RecipientId {
    /// Идентичность получателя по ссылке на него.
    ///
    /// Для `&*arc` совпадает с идентичностью, вычисленной при регистрации
    /// через `Arc`.
    pub fn of<R: ?Sized>(recipient: &R) -> Self {
        Self((recipient as *const R).cast::<()>() as usize)
    }
}

impl fmt::Debug for RecipientId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "RecipientId({:#x})", self.0)
    }
}

impl fmt::Display for RecipientId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Всё, по чему можно определить идентичность получателя: `Arc` и `Weak`
/// на него или готовый [`RecipientId`].
///
/// Обработчик, которому доступен только `&R`, передаёт
/// `&RecipientId::of(recipient)`.
pub trait AsRecipientId {
    fn recipient_id(&self) -> RecipientId;
}

impl<R: ?Sized> AsRecipientId for Arc<R> {
    fn recipient_id(&self) -> RecipientId {
        RecipientId(Arc::as_ptr(self).cast::<()>() as usize)
    }
}

impl<R: ?Sized> AsRecipientId for Weak<R> {
    fn recipient_id(&self) -> RecipientId {
        RecipientId(self.as_ptr().cast::<()>() as usize)
    }
}

impl AsRecipientId for RecipientId {
    fn recipient_id(&self) -> RecipientId {
        *self
    }
}

/// Единый контракт ссылки на получателя.
///
/// Любое чтение слабой ссылки должно допускать, что получатель умер после
/// предыдущей проверки: `is_alive() == true` не гарантирует `get().is_some()`
/// при следующем вызове.
pub trait RecipientHandle: Clone + Send + Sync + 'static {
    fn is_alive(&self) -> bool;

    /// Сильная ссылка на получателя, если он ещё жив.
    fn get(&self) -> Option<Arc<AnyRecipient>>;

    fn identity(&self) -> RecipientId;
}

/// Политика хранения получателей в реестре.
pub trait ReferencePolicy: Send + Sync + 'static {
    type Handle: RecipientHandle;

    /// Имя политики для логов.
    const NAME: &'static str;

    fn wrap(recipient: Arc<AnyRecipient>) -> Self::Handle;
}

/// Сильная ссылка: получатель живёт, пока существует регистрация.
#[derive(Clone)]
pub struct StrongHandle(Arc<AnyRecipient>);

impl RecipientHandle for StrongHandle {
    fn is_alive(&self) -> bool {
        true
    }

    fn get(&self) -> Option<Arc<AnyRecipient>> {
        Some(Arc::clone(&self.0))
    }

    fn identity(&self) -> RecipientId {
        self.0.recipient_id()
    }
}

/// Слабая ссылка: регистрация не мешает освобождению получателя.
#[derive(Clone)]
pub struct WeakHandle {
    inner: Weak<AnyRecipient>,
    id: RecipientId,
}

impl WeakHandle {
    pub(crate) fn from_weak(inner: Weak<AnyRecipient>) -> Self {
        let id = inner.recipient_id();
        Self { inner, id }
    }
}

impl RecipientHandle for WeakHandle {
    fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    fn get(&self) -> Option<Arc<AnyRecipient>> {
        self.inner.upgrade()
    }

    fn identity(&self) -> RecipientId {
        self.id
    }
}

/// Политика сильных ссылок.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrongRefs;

impl ReferencePolicy for StrongRefs {
    type Handle = StrongHandle;

    const NAME: &'static str = "strong";

    fn wrap(recipient: Arc<AnyRecipient>) -> StrongHandle {
        StrongHandle(recipient)
    }
}

/// Политика слабых ссылок.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeakRefs;

impl ReferencePolicy for WeakRefs {
    type Handle = WeakHandle;

    const NAME: &'static str = "weak";

    fn wrap(recipient: Arc<AnyRecipient>) -> WeakHandle {
        WeakHandle::from_weak(Arc::downgrade(&recipient))
    }
}
