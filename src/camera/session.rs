//! Per-camera exclusive command slot
//!
//! The devices execute one command at a time. A [`CameraSession`] hands out
//! at most one [`SlotGuard`]; dropping the guard frees the slot, so every
//! exit path of a command (success, `?`, timeout, panic unwind) releases it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// What a caller experiences when the slot is already held
///
/// Chosen once per camera and applied to every operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BusyPolicy {
    /// Fail immediately with [`Error::Busy`]
    #[default]
    FailFast,
    /// Wait up to the given duration, then fail with [`Error::Busy`]
    Wait(Duration),
}

/// Exclusive command slot for one camera
#[derive(Debug)]
pub struct CameraSession {
    name: String,
    slot: Arc<Semaphore>,
    policy: BusyPolicy,
}

/// Proof of holding a camera's command slot
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}

impl CameraSession {
    /// Create a session for the named camera
    pub fn new(name: impl Into<String>, policy: BusyPolicy) -> Self {
        Self {
            name: name.into(),
            slot: Arc::new(Semaphore::new(1)),
            policy,
        }
    }

    /// Acquire the slot according to the busy policy
    pub async fn acquire(&self) -> Result<SlotGuard> {
        let permit = match self.policy {
            BusyPolicy::FailFast => Arc::clone(&self.slot).try_acquire_owned().ok(),
            BusyPolicy::Wait(limit) => {
                match tokio::time::timeout(limit, Arc::clone(&self.slot).acquire_owned()).await {
                    Ok(Ok(permit)) => Some(permit),
                    _ => None,
                }
            }
        };

        match permit {
            Some(permit) => Ok(SlotGuard { _permit: permit }),
            None => {
                tracing::debug!(camera = %self.name, policy = ?self.policy, "Command rejected: camera busy");
                Err(Error::Busy(self.name.clone()))
            }
        }
    }

    /// Whether a command currently holds the slot
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> BusyPolicy {
        self.policy
    }
}
