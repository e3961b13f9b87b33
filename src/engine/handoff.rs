//! Cross-thread update requests.
//!
//! The engine is driven by one thread. Collaborators that do blocking work
//! elsewhere (a decoder thread, a device callback) finish it outside the
//! update and then ask for the stage to be updated again through an
//! [`UpdateRequester`]. Requests are moved into the supply backlog at the
//! start of the next drain; the stage then picks up the result on its own
//! thread.

use crate::error::{Error, Result};
use crate::stage::StageId;

/// Cloneable, `Send` handle for requesting stage updates from any thread.
#[derive(Clone)]
pub struct UpdateRequester {
    sender: kanal::Sender<StageId>,
}

impl UpdateRequester {
    pub(crate) fn new(sender: kanal::Sender<StageId>) -> Self {
        Self { sender }
    }

    /// Ask the engine to update `stage` on its next drain.
    ///
    /// Fails with [`Error::EngineClosed`] if the engine was dropped.
    pub fn request_update(&self, stage: StageId) -> Result<()> {
        self.sender.send(stage).map_err(|_| Error::EngineClosed)
    }
}

impl std::fmt::Debug for UpdateRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateRequester")
            .field("pending", &self.sender.len())
            .finish()
    }
}

/// Receiving half, owned by the engine.
pub(crate) struct RequestQueue {
    sender: kanal::Sender<StageId>,
    receiver: kanal::Receiver<StageId>,
}

impl RequestQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = kanal::unbounded();
        Self { sender, receiver }
    }

    pub(crate) fn requester(&self) -> UpdateRequester {
        UpdateRequester::new(self.sender.clone())
    }

    /// Take every pending request without blocking.
    pub(crate) fn drain(&self) -> Vec<StageId> {
        let mut requests = Vec::new();
        while let Ok(Some(stage)) = self.receiver.try_recv() {
            requests.push(stage);
        }
        requests
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        // Close so outstanding requesters see EngineClosed instead of
        // queueing into a channel nobody reads.
        let _ = self.receiver.close();
    }
}
