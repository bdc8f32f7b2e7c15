use std::{
    any::{Any, TypeId},
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use ahash::AHashMap;
use herald_error::MessengerError;
use parking_lot::Mutex;

use super::{AnyRecipient, HandlerResult, RecipientHandle, RecipientId, Token};

/// Обработчик в стёртом виде: получатель и сообщение приходят как `Any` и
/// приводятся к конкретным типам внутри замыкания, созданного при
/// регистрации.
pub(crate) type ErasedHandler = dyn Fn(&AnyRecipient, &dyn Any) -> HandlerResult + Send + Sync;

/// Ключ маршрута: тип сообщения и токен канала.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    message: TypeId,
    message_name: &'static str,
    token: Token,
}

impl RouteKey {
    pub fn of<M: 'static>(token: Token) -> Self {
        Self {
            message: TypeId::of::<M>(),
            message_name: std::any::type_name::<M>(),
            token,
        }
    }

    pub fn message_name(&self) -> &'static str {
        self.message_name
    }

    pub fn token(&self) -> &Token {
        &self.token
    }
}

impl fmt::Debug for RouteKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}@{:?}", self.message_name, self.token)
    }
}

/// Какие регистрации получателя затрагивает отписка.
///
/// `None` в поле означает "любой": `Scope::default()` снимает все
/// регистрации получателя.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub message: Option<TypeId>,
    pub token: Option<Token>,
}

impl Scope {
    pub fn route(key: &RouteKey) -> Self {
        Self {
            message: Some(key.message),
            token: Some(key.token.clone()),
        }
    }

    fn matches(
        &self,
        key: &RouteKey,
    ) -> bool {
        self.message.map_or(true, |m| m == key.message)
            && self.token.as_ref().map_or(true, |t| *t == key.token)
    }
}

/// Результат попытки доставки одной записи снимка.
pub(crate) enum Delivery {
    Delivered(HandlerResult),
    /// Запись снята с регистрации после того, как снимок был сделан.
    Unregistered,
    /// Получатель (слабая ссылка) уже освобождён.
    Dead,
}

/// Запись реестра: ссылка на получателя и его обработчик.
pub(crate) struct Entry<H> {
    handle: H,
    recipient_type: &'static str,
    handler: Arc<ErasedHandler>,
    active: AtomicBool,
}

impl<H: RecipientHandle> Entry<H> {
    /// Вызывает обработчик, если запись всё ещё зарегистрирована и
    /// получатель жив. Живость проверяется в момент вызова, а не в момент
    /// снятия снимка.
    ///
    /// Проверка и вызов не атомарны относительно отписки из другого
    /// потока: вызов, уже прошедший проверку, может начаться после
    /// возврата `unregister`. Отписка в том же потоке (в том числе из
    /// обработчика) подавляет все последующие вызовы.
    pub(crate) fn invoke(
        &self,
        message: &dyn Any,
    ) -> Delivery {
        if !self.active.load(Ordering::Acquire) {
            return Delivery::Unregistered;
        }
        match self.handle.get() {
            Some(recipient) => Delivery::Delivered((self.handler)(recipient.as_ref(), message)),
            None => Delivery::Dead,
        }
    }

    pub(crate) fn recipient_type(&self) -> &'static str {
        self.recipient_type
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

struct Routes<H> {
    /// (тип сообщения, токен) → записи в порядке регистрации.
    routes: AHashMap<RouteKey, Vec<Arc<Entry<H>>>>,
    /// Получатель → его записи, для отписки и проверки дубликатов за O(1).
    recipients: AHashMap<RecipientId, AHashMap<RouteKey, Arc<Entry<H>>>>,
}

/// Записи, снятые под блокировкой. Освобождаются только после неё: drop
/// получателя или замыкания обработчика может снова обратиться к
/// мессенджеру.
type Garbage<H> = Vec<Arc<Entry<H>>>;

impl<H: RecipientHandle> Routes<H> {
    fn remove_entry(
        &mut self,
        key: &RouteKey,
        entry: Arc<Entry<H>>,
        garbage: &mut Garbage<H>,
    ) {
        entry.deactivate();
        if let Some(list) = self.routes.get_mut(key) {
            if let Some(pos) = list.iter().position(|e| Arc::ptr_eq(e, &entry)) {
                garbage.push(list.remove(pos));
            }
            if list.is_empty() {
                self.routes.remove(key);
            }
        }
        garbage.push(entry);
    }
}

/// Потокобезопасный индекс регистраций.
///
/// Все структурные изменения и снятие снимка выполняются под одним
/// мьютексом; обработчики вызываются вне блокировки, поэтому могут
/// обращаться к мессенджеру повторно.
pub struct Registry<H> {
    inner: Mutex<Routes<H>>,
}

impl<H: RecipientHandle> Registry<H> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Routes {
                routes: AHashMap::new(),
                recipients: AHashMap::new(),
            }),
        }
    }

    /// Добавляет запись. Повторная регистрация той же тройки
    /// (получатель, тип, токен) — ошибка, а не перезапись.
    pub(crate) fn register(
        &self,
        handle: H,
        recipient_type: &'static str,
        key: RouteKey,
        handler: Arc<ErasedHandler>,
    ) -> Result<(), MessengerError> {
        let id = handle.identity();
        let mut garbage = Garbage::new();
        let mut inner = self.inner.lock();

        let existing = inner.recipients.get_mut(&id).and_then(|m| m.remove(&key));
        if let Some(existing) = existing {
            if existing.handle.is_alive() {
                inner
                    .recipients
                    .entry(id)
                    .or_default()
                    .insert(key.clone(), existing);
                return Err(MessengerError::DuplicateRegistration {
                    recipient: format!("{recipient_type}({id})"),
                    message_type: key.message_name,
                    token: format!("{:?}", key.token),
                });
            }
            // Мёртвая запись логически отсутствует: заменяем её.
            inner.remove_entry(&key, existing, &mut garbage);
        }

        let entry = Arc::new(Entry {
            handle,
            recipient_type,
            handler,
            active: AtomicBool::new(true),
        });

        inner
            .routes
            .entry(key.clone())
            .or_default()
            .push(Arc::clone(&entry));
        inner.recipients.entry(id).or_default().insert(key, entry);

        drop(inner);
        drop(garbage);
        Ok(())
    }

    /// Снимает записи получателя, попадающие в `scope`.
    ///
    /// Идемпотентна; возвращает количество снятых записей.
    pub fn unregister(
        &self,
        id: RecipientId,
        scope: &Scope,
    ) -> usize {
        let mut garbage = Garbage::new();
        let mut inner = self.inner.lock();

        let Some(mut owned) = inner.recipients.remove(&id) else {
            return 0;
        };

        let keys: Vec<RouteKey> = owned.keys().filter(|k| scope.matches(k)).cloned().collect();
        for key in &keys {
            if let Some(entry) = owned.remove(key) {
                inner.remove_entry(key, entry, &mut garbage);
            }
        }

        if !owned.is_empty() {
            inner.recipients.insert(id, owned);
        }

        drop(inner);
        drop(garbage);
        keys.len()
    }

    /// Зарегистрирован ли получатель на маршрут. Мёртвый получатель
    /// считается незарегистрированным.
    pub fn is_registered(
        &self,
        id: RecipientId,
        key: &RouteKey,
    ) -> bool {
        self.inner
            .lock()
            .recipients
            .get(&id)
            .and_then(|m| m.get(key))
            .is_some_and(|e| e.handle.is_alive())
    }

    /// Копия текущего набора записей маршрута (не живое представление).
    pub(crate) fn snapshot(
        &self,
        key: &RouteKey,
    ) -> Vec<Arc<Entry<H>>> {
        self.inner
            .lock()
            .routes
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Физически удаляет записи с мёртвыми получателями.
    ///
    /// Не меняет наблюдаемого состояния: такие записи уже логически
    /// отсутствуют. Возвращает количество удалённых записей.
    pub fn compact(&self) -> usize {
        let mut garbage = Garbage::new();
        let mut inner = self.inner.lock();

        let dead: Vec<(RecipientId, RouteKey)> = inner
            .recipients
            .iter()
            .flat_map(|(id, entries)| {
                entries
                    .iter()
                    .filter(|(_, e)| !e.handle.is_alive())
                    .map(move |(key, _)| (*id, key.clone()))
            })
            .collect();

        for (id, key) in &dead {
            let removed = inner.recipients.get_mut(id).and_then(|m| m.remove(key));
            if let Some(entry) = removed {
                inner.remove_entry(key, entry, &mut garbage);
            }
            if inner.recipients.get(id).is_some_and(|m| m.is_empty()) {
                inner.recipients.remove(id);
            }
        }

        inner.routes.shrink_to_fit();
        inner.recipients.shrink_to_fit();

        drop(inner);
        drop(garbage);
        dead.len()
    }

    /// Удаляет все записи. Возвращает количество удалённых записей.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let routes = std::mem::take(&mut inner.routes);
        let recipients = std::mem::take(&mut inner.recipients);

        let mut removed = 0;
        for entry in routes.values().flatten() {
            entry.deactivate();
            removed += 1;
        }

        drop(inner);
        drop((routes, recipients));
        removed
    }

    /// Количество записей, включая ещё не убранные мёртвые.
    pub fn len(&self) -> usize {
        self.inner.lock().routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().routes.is_empty()
    }

    /// Количество различных маршрутов (тип сообщения × токен).
    pub fn route_count(&self) -> usize {
        self.inner.lock().routes.len()
    }
}

impl<H: RecipientHandle> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}
