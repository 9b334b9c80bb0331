use log::{info, warn};
use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError},
        Arc,
    },
};

use crate::{
    backend::{BackendEventLoop, BackendState},
    frontend::UIParameter,
    BACKEND_HUNG_UP_MSG,
};

/// The linker is sent to the backend thread and replies on its backchannel
/// once the action ran on the backend. Dropping the receiving end cancels
/// the request cooperatively.
pub struct BackendLink<T, F, S>
where
    F: Fn(&mut BackendEventLoop<S>) -> T,
    S: BackendState,
{
    backchannel: Sender<T>,
    action: F,
    is_cancelled: Arc<AtomicBool>,
    description: String,
    _marker: PhantomData<S>,
}

impl<T, F, S> BackendLink<T, F, S>
where
    F: Fn(&mut BackendEventLoop<S>) -> T,
    S: BackendState,
{
    pub fn new(description: &str, action: F) -> (LinkReceiver<T>, Self) {
        let (tx, rx) = channel();
        let is_cancelled = Arc::new(AtomicBool::new(false));
        let rx = LinkReceiver {
            rx,
            is_cancelled: is_cancelled.clone(),
        };
        (
            rx,
            Self {
                backchannel: tx,
                action,
                description: description.to_owned(),
                is_cancelled,
                _marker: PhantomData,
            },
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled.load(SeqCst)
    }
}

impl<T, F, S> BackendLink<T, F, S>
where
    T: Send + Clone + 'static,
    F: Fn(&mut BackendEventLoop<S>) -> T + Send + 'static,
    S: BackendState + Send + 'static,
{
    /// Dispatch `action` to the backend and wire the reply into `parameter`,
    /// which stays at its previous value until the update arrives.
    pub fn request_parameter_update(
        parameter: &mut UIParameter<T>,
        description: &str,
        action: F,
        request_tx: &mut Sender<Box<dyn BackendRequest<S>>>,
    ) {
        let (rx, linker) = BackendLink::new(description, action);
        parameter.set_recv(rx);
        request_tx.send(Box::new(linker)).expect(BACKEND_HUNG_UP_MSG);
    }
}

pub trait BackendRequest<S>: Send
where
    S: BackendState,
{
    fn run_on_backend(&self, backend: &mut BackendEventLoop<S>);
    fn describe(&self) -> &str;
}

impl<T, F, S> BackendRequest<S> for BackendLink<T, F, S>
where
    F: Fn(&mut BackendEventLoop<S>) -> T + Send,
    S: BackendState + Send,
    T: Send,
{
    fn run_on_backend(&self, backend: &mut BackendEventLoop<S>) {
        if self.is_cancelled.load(SeqCst) {
            return;
        }
        let result = (self.action)(backend);
        // The request might have been cancelled while `self.action` ran,
        // so we check again before replying.
        if !self.is_cancelled.load(SeqCst) {
            let _ = self.backchannel.send(result).map_err(|_| {
                warn!(
                    "Trying to send message for request '{}' on closed channel.",
                    self.description
                )
            });
        }
    }
    fn describe(&self) -> &str {
        &self.description
    }
}

#[derive(Debug)]
pub struct LinkReceiver<T> {
    rx: Receiver<T>,
    is_cancelled: Arc<AtomicBool>,
}

impl<T> LinkReceiver<T> {
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.rx.try_recv()
    }
    pub fn recv_timeout(&self, duration: std::time::Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(duration)
    }
}

impl<T> Drop for LinkReceiver<T> {
    fn drop(&mut self) {
        info!("dropping link receiver");
        self.is_cancelled.store(true, SeqCst);
    }
}
