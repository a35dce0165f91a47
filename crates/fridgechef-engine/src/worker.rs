use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use fridgechef_contracts::errors::RecipeError;
use fridgechef_contracts::events::{DiscardStage, SessionEvent};
use fridgechef_contracts::recipes::Recipe;
use fridgechef_contracts::session::{FetchTicket, RequestId};

use crate::RecipeEngine;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCompletion {
    pub request_id: RequestId,
    pub result: Result<Vec<Recipe>, RecipeError>,
}

/// A fetch running on its own thread.
///
/// Cancelling does not interrupt the HTTP call; it only stops the completion from
/// being delivered.
#[derive(Debug)]
pub struct FetchHandle {
    request_id: RequestId,
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FetchHandle {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| anyhow!("fetch {} panicked", self.request_id))?;
        }
        Ok(())
    }
}

pub struct FetchWorker;

impl FetchWorker {
    /// Runs `ticket` in the background and sends the outcome into `sink`.
    ///
    /// Unless cancelled, exactly one completion is sent, even when the provider
    /// panics; that case arrives as a fetch error.
    pub fn spawn<T>(
        engine: Arc<RecipeEngine>,
        ticket: FetchTicket,
        sink: Sender<T>,
    ) -> Result<FetchHandle>
    where
        T: From<FetchCompletion> + Send + 'static,
    {
        let request_id = ticket.request_id;
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let thread = thread::Builder::new()
            .name(format!("recipe-fetch-{}", request_id.get()))
            .spawn(move || {
                let FetchTicket { image, filters, .. } = ticket;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    engine.fetch_recipes(request_id, image, &filters)
                }));
                let result = outcome.unwrap_or_else(|cause| {
                    let err = RecipeError::fetch(format!(
                        "fetch worker stopped: {}",
                        panic_message(cause.as_ref())
                    ));
                    engine.log_failure(request_id, &err, 0.0);
                    Err(err)
                });
                if flag.load(Ordering::SeqCst) {
                    engine.log(SessionEvent::RecipesStaleDiscarded {
                        request_id,
                        stage: DiscardStage::Worker,
                    });
                    return;
                }
                // receiver gone means the session ended; nothing left to update
                let _ = sink.send(T::from(FetchCompletion { request_id, result }));
            })
            .context("failed to spawn recipe fetch thread")?;

        Ok(FetchHandle {
            request_id,
            cancelled,
            thread: Some(thread),
        })
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(text) = cause.downcast_ref::<&str>() {
        text
    } else if let Some(text) = cause.downcast_ref::<String>() {
        text.as_str()
    } else {
        "panic"
    }
}

/// Holds the one fetch a session may have in flight.
#[derive(Debug, Default)]
pub struct FetchSlot {
    current: Option<FetchHandle>,
}

impl FetchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handle`, cancelling whatever was running before.
    pub fn replace(&mut self, handle: FetchHandle) -> Option<RequestId> {
        let superseded = self.cancel();
        self.current = Some(handle);
        superseded
    }

    /// Cancels the in-flight fetch, if any, and returns its id.
    pub fn cancel(&mut self) -> Option<RequestId> {
        let previous = self.current.take()?;
        previous.cancel();
        Some(previous.request_id())
    }

    /// Reaps the worker once its completion has arrived. Completions for other
    /// requests leave the slot alone.
    pub fn finish(&mut self, request_id: RequestId) -> Result<()> {
        match self.current.take() {
            Some(handle) if handle.request_id() == request_id => handle.join(),
            other => {
                self.current = other;
                Ok(())
            }
        }
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.current.as_ref().map(FetchHandle::request_id)
    }
}
