use std::{marker::PhantomData, sync::Arc};

use futures::stream::{self, BoxStream};
use herald_error::MessengerError;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    error::{RecvError, TryRecvError},
    messenger::{AsRecipientId, Messenger, RecipientId, ReferencePolicy, Token},
};

/// Регистрация служебного получателя в мессенджере, со стёртой политикой.
trait Subscription: Send + Sync {
    fn is_registered(&self) -> bool;

    fn unregister(&self);
}

struct AnchorRegistration<P: ReferencePolicy, M> {
    messenger: Messenger<P>,
    anchor: RecipientId,
    token: Token,
    _message: PhantomData<fn(&M)>,
}

impl<P: ReferencePolicy, M: 'static> Subscription for AnchorRegistration<P, M> {
    fn is_registered(&self) -> bool {
        self.messenger
            .is_registered_with_token::<M>(&self.anchor, &self.token)
    }

    fn unregister(&self) {
        self.messenger
            .unregister_with_token::<M>(&self.anchor, &self.token);
    }
}

/// Служебный получатель потока. Принадлежит `MessageStream`, поэтому жив и
/// в слабом мессенджере, пока жив поток.
struct StreamAnchor<M> {
    sender: Mutex<Option<broadcast::Sender<M>>>,
}

impl<M: Clone> StreamAnchor<M> {
    fn forward(
        &self,
        message: &M,
    ) {
        if let Some(sender) = self.sender.lock().as_ref() {
            // Ошибка означает лишь отсутствие слушателей.
            let _ = sender.send(message.clone());
        }
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<M>> {
        self.sender.lock().as_ref().map(broadcast::Sender::subscribe)
    }

    fn close(&self) {
        self.sender.lock().take();
    }
}

/// Слушатель потока сообщений.
///
/// После закрытия потока сначала отдаёт уже буферизованные сообщения,
/// затем `Closed`.
#[derive(Debug)]
pub struct MessageListener<M> {
    receiver: broadcast::Receiver<M>,
}

impl<M: Clone> MessageListener<M> {
    fn closed() -> Self {
        let (_, receiver) = broadcast::channel(1);
        Self { receiver }
    }

    pub async fn recv(&mut self) -> Result<M, RecvError> {
        Ok(self.receiver.recv().await?)
    }

    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        Ok(self.receiver.try_recv()?)
    }
}

/// Подписка на сообщения `M`, доставляемые через мессенджер.
pub struct MessageStream<M: Clone + Send + 'static> {
    anchor: Arc<StreamAnchor<M>>,
    listener: MessageListener<M>,
    subscription: Option<Box<dyn Subscription>>,
}

impl<M: Clone + Send + 'static> MessageStream<M> {
    /// Ожидает следующее сообщение.
    pub async fn recv(&mut self) -> Result<M, RecvError> {
        self.listener.recv().await
    }

    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.listener.try_recv()
    }

    /// Дополнительный слушатель: получает сообщения, отправленные после
    /// вызова. Для закрытого потока сразу возвращает `Closed`.
    pub fn subscribe(&self) -> MessageListener<M> {
        match self.anchor.subscribe() {
            Some(receiver) => MessageListener { receiver },
            None => MessageListener::closed(),
        }
    }

    /// Поток получает новые сообщения: он не закрыт `dispose()`, и его
    /// регистрация не снята извне (например, `reset()` мессенджера).
    pub fn is_active(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|subscription| subscription.is_registered())
    }

    /// Снимает регистрацию и закрывает канал. Идемпотентна.
    pub fn dispose(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unregister();
            self.anchor.close();
            debug!(
                message = std::any::type_name::<M>(),
                "Message stream disposed"
            );
        }
    }

    /// Поток `futures::Stream`; завершается, когда подписка закрыта и буфер
    /// прочитан. Отставание передаётся элементом `Err(Lagged(n))`.
    pub fn into_stream(self) -> BoxStream<'static, Result<M, RecvError>> {
        Box::pin(stream::unfold(self, |mut this| async move {
            match this.recv().await {
                Err(RecvError::Closed) => None,
                item => Some((item, this)),
            }
        }))
    }
}

impl<M: Clone + Send + 'static> Drop for MessageStream<M> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<P: ReferencePolicy> Messenger<P> {
    /// Поток сообщений `M` на канале без токена.
    pub fn observe<M>(&self) -> Result<MessageStream<M>, MessengerError>
    where
        M: Clone + Send + 'static,
    {
        self.observe_with_token(Token::DEFAULT)
    }

    /// Поток сообщений `M` на канале `token`. Ёмкость буфера берётся из
    /// `MessengerConfig::stream_capacity`; отставший слушатель получает
    /// `Lagged`.
    pub fn observe_with_token<M>(
        &self,
        token: impl Into<Token>,
    ) -> Result<MessageStream<M>, MessengerError>
    where
        M: Clone + Send + 'static,
    {
        let token = token.into();
        let capacity = self.config().stream_capacity.max(1);
        let (sender, receiver) = broadcast::channel(capacity);
        let anchor = Arc::new(StreamAnchor {
            sender: Mutex::new(Some(sender)),
        });

        self.register_with_token(
            &anchor,
            token.clone(),
            |anchor: &StreamAnchor<M>, message: &M| {
                anchor.forward(message);
                Ok(())
            },
        )?;

        let subscription = AnchorRegistration::<P, M> {
            messenger: self.clone(),
            anchor: anchor.recipient_id(),
            token,
            _message: PhantomData,
        };

        Ok(MessageStream {
            anchor,
            listener: MessageListener { receiver },
            subscription: Some(Box::new(subscription)),
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::{
        config::MessengerConfig,
        messenger::{StrongMessenger, WeakMessenger},
    };

    #[derive(Debug, Clone, PartialEq)]
    struct Tick(u32);

    #[tokio::test]
    async fn test_stream_receives_sent_messages() {
        let messenger = StrongMessenger::new();
        let mut ticks = messenger.observe::<Tick>().unwrap();

        messenger.send(Tick(1)).unwrap();
        messenger.send(Tick(2)).unwrap();

        assert_eq!(ticks.recv().await, Ok(Tick(1)));
        assert_eq!(ticks.try_recv(), Ok(Tick(2)));
        assert_eq!(ticks.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_dispose_unregisters_and_closes() {
        let messenger = WeakMessenger::new();
        let mut ticks = messenger.observe::<Tick>().unwrap();
        assert_eq!(messenger.registration_count(), 1);

        messenger.send(Tick(1)).unwrap();
        ticks.dispose();
        ticks.dispose();
        assert!(!ticks.is_active());
        assert_eq!(messenger.registration_count(), 0);

        messenger.send(Tick(2)).unwrap();
        // буфер отдаётся до конца, затем поток закрыт
        assert_eq!(ticks.recv().await, Ok(Tick(1)));
        assert_eq!(ticks.recv().await, Err(RecvError::Closed));
    }

    #[tokio::test]
    async fn test_reset_deactivates_stream() {
        let messenger = StrongMessenger::new();
        let mut ticks = messenger.observe::<Tick>().unwrap();
        assert!(ticks.is_active());

        messenger.reset();
        assert!(!ticks.is_active());

        messenger.send(Tick(1)).unwrap();
        assert_eq!(ticks.try_recv(), Err(TryRecvError::Empty));

        // dispose после внешней отписки остаётся безопасным
        ticks.dispose();
        assert_eq!(ticks.try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let messenger = StrongMessenger::new();
        let ticks = messenger.observe::<Tick>().unwrap();
        assert_eq!(messenger.registration_count(), 1);
        drop(ticks);
        assert_eq!(messenger.registration_count(), 0);
    }

    #[tokio::test]
    async fn test_token_isolation_and_extra_listener() {
        let messenger = StrongMessenger::new();
        let mut left = messenger.observe_with_token::<Tick>("left").unwrap();
        let mut extra = left.subscribe();

        messenger.send(Tick(0)).unwrap();
        messenger.send_with_token(Tick(5), &Token::from("left")).unwrap();

        assert_eq!(left.try_recv(), Ok(Tick(5)));
        assert_eq!(extra.try_recv(), Ok(Tick(5)));
        assert_eq!(left.try_recv(), Err(TryRecvError::Empty));

        left.dispose();
        assert_eq!(left.subscribe().try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test]
    async fn test_slow_listener_lags() {
        let messenger = StrongMessenger::with_config(MessengerConfig {
            stream_capacity: 2,
            ..MessengerConfig::default()
        });
        let mut ticks = messenger.observe::<Tick>().unwrap();
        for i in 0..5 {
            messenger.send(Tick(i)).unwrap();
        }

        assert_eq!(ticks.recv().await, Err(RecvError::Lagged(3)));
        assert_eq!(ticks.recv().await, Ok(Tick(3)));
    }

    #[tokio::test]
    async fn test_into_stream_releases_subscription_on_drop() {
        let messenger = StrongMessenger::new();
        let ticks = messenger.observe::<Tick>().unwrap();
        messenger.send(Tick(1)).unwrap();
        messenger.send(Tick(2)).unwrap();

        let stream = ticks.into_stream();
        let received: Vec<_> = stream.take(2).collect().await;
        assert_eq!(received, vec![Ok(Tick(1)), Ok(Tick(2))]);
        // поток вместе с подпиской уничтожен
        assert_eq!(messenger.registration_count(), 0);
    }
}
