use std::{
    any::{type_name, Any, TypeId},
    marker::PhantomData,
    sync::{Arc, Weak},
};

use herald_error::{GenericError, MessengerError, StackError, StatusCode};
use once_cell::sync::Lazy;
use tracing::{debug, trace, warn};

use super::{
    registry::{Delivery, ErasedHandler},
    AnyRecipient, AsRecipientId, HandlerResult, MessengerStats, MessengerStatsSnapshot,
    ReferencePolicy, Registry, RouteKey, Scope, StrongRefs, Token, WeakRefs,
};
use crate::config::MessengerConfig;

static STRONG_MESSENGER: Lazy<Messenger<StrongRefs>> =
    Lazy::new(|| Messenger::with_config(MessengerConfig::load_or_default()));

static WEAK_MESSENGER: Lazy<Messenger<WeakRefs>> =
    Lazy::new(|| Messenger::with_config(MessengerConfig::load_or_default()));

struct Shared<P: ReferencePolicy> {
    registry: Registry<P::Handle>,
    stats: MessengerStats,
    config: MessengerConfig,
}

/// Мессенджер: регистрация обработчиков и синхронная рассылка сообщений.
///
/// Сильный и слабый варианты отличаются только политикой `P`; вся логика
/// рассылки общая. Клонирование дешёвое: клоны разделяют реестр и
/// счётчики.
///
/// `send` берёт снимок обработчиков под блокировкой реестра и вызывает их
/// уже без неё, поэтому обработчик может повторно вызывать любой метод
/// мессенджера.
pub struct Messenger<P: ReferencePolicy> {
    shared: Arc<Shared<P>>,
}

impl<P: ReferencePolicy> Clone for Messenger<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: ReferencePolicy> Default for Messenger<P> {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<P: ReferencePolicy> Messenger<P> {
    pub fn new() -> Self {
        Self::with_config(MessengerConfig::default())
    }

    pub fn with_config(config: MessengerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Registry::new(),
                stats: MessengerStats::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.shared.config
    }

    /// Регистрирует обработчик сообщений `M` на канале без токена.
    pub fn register<M, R, F>(
        &self,
        recipient: &Arc<R>,
        handler: F,
    ) -> Result<(), MessengerError>
    where
        M: 'static,
        R: Send + Sync + 'static,
        F: Fn(&R, &M) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_with_token::<M, R, F>(recipient, Token::DEFAULT, handler)
    }

    /// Регистрирует обработчик сообщений `M` на канале `token`.
    ///
    /// Повторная регистрация той же тройки (получатель, тип, токен)
    /// возвращает `DuplicateRegistration`.
    pub fn register_with_token<M, R, F>(
        &self,
        recipient: &Arc<R>,
        token: impl Into<Token>,
        handler: F,
    ) -> Result<(), MessengerError>
    where
        M: 'static,
        R: Send + Sync + 'static,
        F: Fn(&R, &M) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert::<M, R>(Arc::clone(recipient), token.into(), erase(handler))
    }

    /// Регистрация по слабой ссылке на получателя.
    ///
    /// Если получатель уже освобождён, возвращает `NullArgument`.
    pub fn register_weak<M, R, F>(
        &self,
        recipient: &Weak<R>,
        token: impl Into<Token>,
        handler: F,
    ) -> Result<(), MessengerError>
    where
        M: 'static,
        R: Send + Sync + 'static,
        F: Fn(&R, &M) -> HandlerResult + Send + Sync + 'static,
    {
        let recipient = recipient
            .upgrade()
            .ok_or(MessengerError::null_argument("recipient"))?;
        self.insert::<M, R>(recipient, token.into(), erase(handler))
    }

    /// Пошаговая регистрация, в которой получатель и обработчик задаются
    /// отдельно и проверяются в момент `register()`.
    pub fn registration<M, R>(&self) -> RegistrationBuilder<'_, M, R, P>
    where
        M: 'static,
        R: Send + Sync + 'static,
    {
        RegistrationBuilder {
            messenger: self,
            recipient: None,
            token: Token::DEFAULT,
            handler: None,
            _message: PhantomData,
        }
    }

    fn insert<M: 'static, R: Send + Sync + 'static>(
        &self,
        recipient: Arc<R>,
        token: Token,
        handler: Arc<ErasedHandler>,
    ) -> Result<(), MessengerError> {
        let key = RouteKey::of::<M>(token);
        let erased: Arc<AnyRecipient> = recipient;
        let handle = P::wrap(erased);

        self.shared
            .registry
            .register(handle, type_name::<R>(), key.clone(), handler)?;

        debug!(
            policy = P::NAME,
            recipient = type_name::<R>(),
            message = key.message_name(),
            token = ?key.token(),
            "Handler registered"
        );
        Ok(())
    }

    /// Снимает регистрацию получателя для `M` на канале без токена.
    ///
    /// Идемпотентна; возвращает количество снятых записей.
    pub fn unregister<M: 'static>(
        &self,
        recipient: &impl AsRecipientId,
    ) -> usize {
        self.unregister_with_token::<M>(recipient, &Token::DEFAULT)
    }

    pub fn unregister_with_token<M: 'static>(
        &self,
        recipient: &impl AsRecipientId,
        token: &Token,
    ) -> usize {
        self.remove(
            recipient,
            Scope {
                message: Some(TypeId::of::<M>()),
                token: Some(token.clone()),
            },
        )
    }

    /// Снимает регистрации получателя для `M` на всех каналах.
    pub fn unregister_any_token<M: 'static>(
        &self,
        recipient: &impl AsRecipientId,
    ) -> usize {
        self.remove(
            recipient,
            Scope {
                message: Some(TypeId::of::<M>()),
                token: None,
            },
        )
    }

    /// Снимает все регистрации получателя: все типы и все токены.
    pub fn unregister_all(
        &self,
        recipient: &impl AsRecipientId,
    ) -> usize {
        self.remove(recipient, Scope::default())
    }

    /// Снимает регистрации получателя на канале `token` для всех типов.
    pub fn unregister_all_with_token(
        &self,
        recipient: &impl AsRecipientId,
        token: &Token,
    ) -> usize {
        self.remove(
            recipient,
            Scope {
                message: None,
                token: Some(token.clone()),
            },
        )
    }

    fn remove(
        &self,
        recipient: &impl AsRecipientId,
        scope: Scope,
    ) -> usize {
        let id = recipient.recipient_id();
        let removed = self.shared.registry.unregister(id, &scope);
        if removed > 0 {
            debug!(policy = P::NAME, recipient = %id, removed, "Handlers unregistered");
        }
        removed
    }

    pub fn is_registered<M: 'static>(
        &self,
        recipient: &impl AsRecipientId,
    ) -> bool {
        self.is_registered_with_token::<M>(recipient, &Token::DEFAULT)
    }

    pub fn is_registered_with_token<M: 'static>(
        &self,
        recipient: &impl AsRecipientId,
        token: &Token,
    ) -> bool {
        self.shared
            .registry
            .is_registered(recipient.recipient_id(), &RouteKey::of::<M>(token.clone()))
    }

    /// Рассылает сообщение на канал без токена.
    pub fn send<M: 'static>(
        &self,
        message: M,
    ) -> Result<M, StackError> {
        self.send_with_token(message, &Token::DEFAULT)
    }

    /// Рассылает сообщение всем живым получателям `(M, token)` в порядке
    /// снимка и возвращает то же сообщение.
    ///
    /// Первая ошибка обработчика прерывает рассылку: оставшиеся
    /// обработчики снимка не вызываются, а ошибка возвращается без
    /// изменений. Мёртвые получатели пропускаются молча.
    pub fn send_with_token<M: 'static>(
        &self,
        message: M,
        token: &Token,
    ) -> Result<M, StackError> {
        let key = RouteKey::of::<M>(token.clone());
        let entries = self.shared.registry.snapshot(&key);
        self.shared.stats.record_send();

        trace!(
            policy = P::NAME,
            message = key.message_name(),
            token = ?key.token(),
            handlers = entries.len(),
            "Dispatching message"
        );

        let mut dead = 0;
        let mut outcome = Ok(());
        for entry in &entries {
            match entry.invoke(&message) {
                Delivery::Delivered(Ok(())) => self.shared.stats.record_delivery(),
                Delivery::Delivered(Err(err)) => {
                    self.shared.stats.record_handler_failure();
                    warn!(
                        message = key.message_name(),
                        recipient = entry.recipient_type(),
                        error = %err,
                        "Handler failed, dispatch stopped"
                    );
                    outcome = Err(err);
                    break;
                }
                Delivery::Unregistered => {}
                Delivery::Dead => dead += 1,
            }
        }
        drop(entries);

        self.note_dead(dead);
        outcome.map(|()| message)
    }

    /// Учитывает мёртвых получателей и при достижении порога запускает
    /// очистку реестра.
    fn note_dead(
        &self,
        dead: usize,
    ) {
        if dead == 0 {
            return;
        }
        let since_compaction = self.shared.stats.record_dead(dead);
        let threshold = self.shared.config.auto_cleanup_threshold;
        if threshold > 0 && since_compaction >= threshold {
            let reclaimed = self.cleanup();
            debug!(
                policy = P::NAME,
                threshold, reclaimed, "Automatic cleanup after dead recipients"
            );
        }
    }

    /// Удаляет все регистрации.
    pub fn reset(&self) {
        let removed = self.shared.registry.clear();
        debug!(policy = P::NAME, removed, "Messenger reset");
    }

    /// Физически удаляет записи освобождённых получателей. Набор
    /// зарегистрированных получателей при этом не меняется.
    pub fn cleanup(&self) -> usize {
        let reclaimed = self.shared.registry.compact();
        self.shared.stats.record_compaction();
        debug!(policy = P::NAME, reclaimed, "Registry compacted");
        reclaimed
    }

    pub fn stats(&self) -> MessengerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Количество записей в реестре, включая ещё не убранные мёртвые.
    pub fn registration_count(&self) -> usize {
        self.shared.registry.len()
    }
}

impl Messenger<StrongRefs> {
    /// Общий на процесс сильный мессенджер.
    ///
    /// Создаётся при первом обращении из `MessengerConfig::load_or_default()`
    /// и живёт до конца процесса. Явный экземпляр, переданный через
    /// конструкторы, предпочтительнее: его проще изолировать в тестах.
    pub fn global() -> &'static Self {
        &STRONG_MESSENGER
    }
}

impl Messenger<WeakRefs> {
    /// Общий на процесс слабый мессенджер.
    pub fn global() -> &'static Self {
        &WEAK_MESSENGER
    }
}

/// Построитель регистрации, см. [`Messenger::registration`].
pub struct RegistrationBuilder<'a, M, R, P: ReferencePolicy> {
    messenger: &'a Messenger<P>,
    recipient: Option<Arc<R>>,
    token: Token,
    handler: Option<Arc<ErasedHandler>>,
    _message: PhantomData<fn(&M)>,
}

impl<M, R, P> RegistrationBuilder<'_, M, R, P>
where
    M: 'static,
    R: Send + Sync + 'static,
    P: ReferencePolicy,
{
    pub fn recipient(
        mut self,
        recipient: &Arc<R>,
    ) -> Self {
        self.recipient = Some(Arc::clone(recipient));
        self
    }

    /// Освобождённый получатель равнозначен отсутствующему.
    pub fn weak_recipient(
        mut self,
        recipient: &Weak<R>,
    ) -> Self {
        self.recipient = recipient.upgrade();
        self
    }

    pub fn token(
        mut self,
        token: impl Into<Token>,
    ) -> Self {
        self.token = token.into();
        self
    }

    pub fn handler<F>(
        mut self,
        handler: F,
    ) -> Self
    where
        F: Fn(&R, &M) -> HandlerResult + Send + Sync + 'static,
    {
        self.handler = Some(erase(handler));
        self
    }

    /// Завершает регистрацию. Без получателя или обработчика возвращает
    /// `NullArgument`.
    pub fn register(self) -> Result<(), MessengerError> {
        let recipient = self
            .recipient
            .ok_or(MessengerError::null_argument("recipient"))?;
        let handler = self
            .handler
            .ok_or(MessengerError::null_argument("handler"))?;
        self.messenger
            .insert::<M, R>(recipient, self.token, handler)
    }
}

/// Оборачивает типизированный обработчик в стёртый.
fn erase<M, R, F>(handler: F) -> Arc<ErasedHandler>
where
    M: 'static,
    R: Send + Sync + 'static,
    F: Fn(&R, &M) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(move |recipient: &AnyRecipient, message: &dyn Any| {
        match (recipient.downcast_ref::<R>(), message.downcast_ref::<M>()) {
            (Some(recipient), Some(message)) => handler(recipient, message),
            _ => Err(StackError::new(GenericError::new(
                StatusCode::Internal,
                format!(
                    "type mismatch delivering {} to {}",
                    type_name::<M>(),
                    type_name::<R>()
                ),
            ))),
        }
    })
}
