use std::fmt;

use parking_lot::Mutex;

/// Запрос, на который может ответить любое число обработчиков.
///
/// Ответы накапливаются в порядке вызова обработчиков; отсутствие ответов
/// допустимо и даёт пустой результат.
pub struct CollectionRequestMessage<T, P = ()> {
    payload: P,
    replies: Mutex<Vec<T>>,
}

impl<T, P> CollectionRequestMessage<T, P> {
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            replies: Mutex::new(Vec::new()),
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn reply(
        &self,
        value: T,
    ) {
        self.replies.lock().push(value);
    }

    pub fn len(&self) -> usize {
        self.replies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.lock().is_empty()
    }

    /// Копия полученных ответов.
    pub fn responses(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.replies.lock().clone()
    }

    pub fn into_responses(self) -> Vec<T> {
        self.replies.into_inner()
    }
}

impl<T> CollectionRequestMessage<T, ()> {
    pub fn empty() -> Self {
        Self::new(())
    }
}

impl<T, P: Default> Default for CollectionRequestMessage<T, P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<T, P> IntoIterator for CollectionRequestMessage<T, P> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_responses().into_iter()
    }
}

impl<T: fmt::Debug, P: fmt::Debug> fmt::Debug for CollectionRequestMessage<T, P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CollectionRequestMessage")
            .field("payload", &self.payload)
            .field("responses", &*self.replies.lock())
            .finish()
    }
}
