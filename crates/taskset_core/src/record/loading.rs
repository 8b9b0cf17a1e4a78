//! Background baseline loads.
//!
//! # Responsibility
//! - Run a loader fetch on a worker thread.
//! - Hand the result back to the record's owning context as a
//!   [`LoadCompletion`] value.
//!
//! # Invariants
//! - A worker never touches the record; it only sends a completion.
//! - A completion whose receiver is gone is dropped silently.
//! - Dropping a [`LoadTask`] raises its cancel signal.

use super::{RecordError, RecordResult};
use crate::collaborator::{CancelSignal, CollaboratorError, LoadOutcome, Loader};
use crate::model::identity::Identity;
use log::debug;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

const LOAD_THREAD_NAME: &str = "taskset-load";

/// One accepted load request, tagged with the record's load generation.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub identity: Identity,
    pub generation: u64,
    pub cancel: CancelSignal,
}

impl LoadRequest {
    /// Runs the fetch on the calling thread.
    pub fn run(self, loader: &dyn Loader) -> LoadCompletion {
        let outcome = loader.fetch(&self.identity, &self.cancel);
        LoadCompletion {
            identity: self.identity,
            generation: self.generation,
            outcome,
        }
    }
}

/// Result of one fetch, ready to be applied with `Record::complete_load`.
#[derive(Debug)]
pub struct LoadCompletion {
    pub identity: Identity,
    pub generation: u64,
    pub outcome: Result<LoadOutcome, CollaboratorError>,
}

/// Handle to an in-flight background fetch.
#[derive(Debug)]
pub struct LoadTask {
    generation: u64,
    cancel: CancelSignal,
    receiver: Receiver<LoadCompletion>,
}

impl LoadTask {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Blocks until the worker finishes.
    ///
    /// Returns `None` when the worker died without producing a result.
    pub fn wait(self) -> Option<LoadCompletion> {
        self.receiver.recv().ok()
    }

    /// Returns the completion if the worker already finished.
    pub fn try_take(&self) -> Option<LoadCompletion> {
        match self.receiver.try_recv() {
            Ok(completion) => Some(completion),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for LoadTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub(crate) fn spawn_load(
    loader: Arc<dyn Loader + Send + Sync>,
    request: LoadRequest,
) -> RecordResult<LoadTask> {
    let (sender, receiver) = mpsc::channel();
    let generation = request.generation;
    let cancel = request.cancel.clone();

    thread::Builder::new()
        .name(LOAD_THREAD_NAME.to_string())
        .spawn(move || {
            let completion = request.run(loader.as_ref());
            if sender.send(completion).is_err() {
                debug!(
                    "event=record_load module=record status=skip reason=receiver_dropped generation={generation}"
                );
            }
        })
        .map_err(|err| RecordError::Collaborator {
            operation: "load",
            source: Box::new(err),
        })?;

    Ok(LoadTask {
        generation,
        cancel,
        receiver,
    })
}
