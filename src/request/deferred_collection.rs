use std::{fmt, future::Future};

use futures::{
    future::{self, BoxFuture},
    stream::{self, BoxStream},
    FutureExt, StreamExt,
};
use parking_lot::Mutex;

/// Запрос с любым числом отложенных ответов.
///
/// Обработчики добавляют future; после рассылки [`into_stream`] разрешает
/// их по очереди в порядке добавления. Запрос потребляется одним вызовом,
/// повторно разрешить те же ответы нельзя.
///
/// [`into_stream`]: AsyncCollectionRequestMessage::into_stream
pub struct AsyncCollectionRequestMessage<T, P = ()> {
    payload: P,
    replies: Mutex<Vec<BoxFuture<'static, T>>>,
}

impl<T: Send + 'static, P> AsyncCollectionRequestMessage<T, P> {
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            replies: Mutex::new(Vec::new()),
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn reply<F>(
        &self,
        response: F,
    ) where
        F: Future<Output = T> + Send + 'static,
    {
        self.replies.lock().push(response.boxed());
    }

    pub fn reply_value(
        &self,
        value: T,
    ) {
        self.reply(future::ready(value));
    }

    pub fn len(&self) -> usize {
        self.replies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.lock().is_empty()
    }

    /// Поток ответов: следующий future опрашивается только после того,
    /// как разрешился предыдущий.
    pub fn into_stream(self) -> BoxStream<'static, T> {
        stream::iter(self.replies.into_inner())
            .then(|response| response)
            .boxed()
    }

    /// Дожидается всех ответов.
    pub async fn collect_responses(self) -> Vec<T> {
        self.into_stream().collect().await
    }
}

impl<T: Send + 'static> AsyncCollectionRequestMessage<T, ()> {
    pub fn empty() -> Self {
        Self::new(())
    }
}

impl<T: Send + 'static, P: Default> Default for AsyncCollectionRequestMessage<T, P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<T, P: fmt::Debug> fmt::Debug for AsyncCollectionRequestMessage<T, P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("AsyncCollectionRequestMessage")
            .field("payload", &self.payload)
            .field("pending", &self.replies.lock().len())
            .finish()
    }
}
