//! Single-shot result shared between the operation producing it and any number
//! of observers.

use crate::OperationError;
use futures::channel::oneshot;
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

type SuccessObserver<T> = Box<dyn FnOnce(&T) + Send>;
type ErrorObserver = Box<dyn FnOnce(&OperationError) + Send>;
type CompletionObserver = Box<dyn FnOnce() + Send>;
type Waiter<T> = oneshot::Sender<Result<Arc<T>, OperationError>>;

enum State<T> {
    Pending,
    Succeeded(Arc<T>),
    Failed(OperationError),
}

struct Inner<T> {
    state: State<T>,
    on_success: Vec<SuccessObserver<T>>,
    on_error: Vec<ErrorObserver>,
    on_completion: Vec<CompletionObserver>,
    // Pending `wait` calls. Dropped waits leave a cancelled sender behind.
    waiters: Vec<Waiter<T>>,
}

/// Eventually holds either a value or an [`OperationError`], never both and
/// never more than once.
///
/// Observers registered while the result is pending are called in registration
/// order when it resolves. Observers registered after that are called right away,
/// on the registering thread, if they match the stored outcome. Cloning gives
/// another handle to the same result.
pub struct DeferredResult<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for DeferredResult<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for DeferredResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DeferredResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.lock().state {
            State::Pending => "pending",
            State::Succeeded(_) => "succeeded",
            State::Failed(_) => "failed",
        };
        f.debug_struct("DeferredResult")
            .field("state", &state)
            .finish()
    }
}

impl<T> DeferredResult<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: State::Pending,
                on_success: Vec::new(),
                on_error: Vec::new(),
                on_completion: Vec::new(),
                waiters: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // Observers never run while the lock is held so it cannot be poisoned by them.
        self.inner.lock().unwrap()
    }

    pub fn on_success(&self, observer: impl FnOnce(&T) + Send + 'static) -> &Self {
        let mut inner = self.lock();
        if let State::Pending = inner.state {
            inner.on_success.push(Box::new(observer));
            return self;
        }
        let value = match &inner.state {
            State::Succeeded(value) => Some(value.clone()),
            _ => None,
        };
        drop(inner);
        if let Some(value) = value {
            observer(&value);
        }
        self
    }

    pub fn on_error(&self, observer: impl FnOnce(&OperationError) + Send + 'static) -> &Self {
        let mut inner = self.lock();
        if let State::Pending = inner.state {
            inner.on_error.push(Box::new(observer));
            return self;
        }
        let err = match &inner.state {
            State::Failed(err) => Some(err.clone()),
            _ => None,
        };
        drop(inner);
        if let Some(err) = err {
            observer(&err);
        }
        self
    }

    /// Called once the result resolves, whatever the outcome.
    pub fn on_completion(&self, observer: impl FnOnce() + Send + 'static) -> &Self {
        let mut inner = self.lock();
        if let State::Pending = inner.state {
            inner.on_completion.push(Box::new(observer));
            return self;
        }
        drop(inner);
        observer();
        self
    }

    /// Stores `value` and notifies success and completion observers.
    ///
    /// Returns false and changes nothing if the result was already resolved.
    pub fn resolve_success(&self, value: T) -> bool {
        let value = Arc::new(value);
        let (on_success, on_completion, waiters) = {
            let mut inner = self.lock();
            if !matches!(inner.state, State::Pending) {
                tracing::error!("deferred result resolved twice, dropping success");
                return false;
            }
            inner.state = State::Succeeded(value.clone());
            inner.on_error.clear();
            (
                std::mem::take(&mut inner.on_success),
                std::mem::take(&mut inner.on_completion),
                std::mem::take(&mut inner.waiters),
            )
        };
        for waiter in waiters {
            let _ = waiter.send(Ok(value.clone()));
        }
        for observer in on_success {
            observer(&value);
        }
        for observer in on_completion {
            observer();
        }
        true
    }

    /// Stores `err` and notifies error and completion observers.
    ///
    /// Returns false and changes nothing if the result was already resolved.
    pub fn resolve_error(&self, err: OperationError) -> bool {
        let (on_error, on_completion, waiters) = {
            let mut inner = self.lock();
            if !matches!(inner.state, State::Pending) {
                tracing::error!(%err, "deferred result resolved twice, dropping error");
                return false;
            }
            inner.state = State::Failed(err.clone());
            inner.on_success.clear();
            (
                std::mem::take(&mut inner.on_error),
                std::mem::take(&mut inner.on_completion),
                std::mem::take(&mut inner.waiters),
            )
        };
        for waiter in waiters {
            let _ = waiter.send(Err(err.clone()));
        }
        for observer in on_error {
            observer(&err);
        }
        for observer in on_completion {
            observer();
        }
        true
    }

    /// Resolves with whichever arm `result` holds.
    pub fn resolve(&self, result: Result<T, OperationError>) -> bool {
        match result {
            Ok(value) => self.resolve_success(value),
            Err(err) => self.resolve_error(err),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.lock().state, State::Pending)
    }
}

impl<T: Clone + Send + Sync + 'static> DeferredResult<T> {
    /// Snapshot of the outcome, `None` while pending.
    pub fn outcome(&self) -> Option<Result<T, OperationError>> {
        match &self.lock().state {
            State::Pending => None,
            State::Succeeded(value) => Some(Ok(T::clone(value))),
            State::Failed(err) => Some(Err(err.clone())),
        }
    }

    /// Waits for the result to resolve.
    ///
    /// Dropping the returned future unregisters it the next time someone waits.
    pub async fn wait(&self) -> Result<T, OperationError> {
        let receiver = {
            let mut inner = self.lock();
            match &inner.state {
                State::Succeeded(value) => return Ok(T::clone(value)),
                State::Failed(err) => return Err(err.clone()),
                State::Pending => {}
            }
            inner.waiters.retain(|waiter| !waiter.is_canceled());
            let (sender, receiver) = oneshot::channel();
            inner.waiters.push(sender);
            receiver
        };
        match receiver.await {
            Ok(outcome) => outcome.map(|value| T::clone(&value)),
            // The sender is only dropped unused if the result is torn down first.
            Err(_) => Err(OperationError::Cancelled),
        }
    }

    #[cfg(test)]
    fn waiter_count(&self) -> usize {
        self.lock().waiters.len()
    }
}
