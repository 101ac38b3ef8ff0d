// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Memoized single-flight production cell
//!
//! A [`SingleFlight`] holds one lazily produced value. Concurrent requests share
//! a single pending production; a successful result is cached for good, a
//! failure is remembered only for status reporting and the next request
//! launches a fresh production. When every caller waiting on a production has
//! gone away the production is cancelled and the cell returns to the state it
//! had before the request.

use crate::error::{HarnessError, Result, Stage};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

type Outcome<T> = Shared<BoxFuture<'static, Result<Arc<T>>>>;

/// Observable state of a [`SingleFlight`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    /// Nothing requested yet, or the last request was abandoned
    Idle,
    /// A production is in flight
    Pending,
    /// A value is cached
    Ready,
    /// The last production failed
    Failed,
}

enum Slot<T> {
    Idle,
    Pending(Flight<T>),
    Ready(Arc<T>),
    Failed(HarnessError),
}

struct Flight<T> {
    id: u64,
    outcome: Outcome<T>,
    cancel: CancellationToken,
    waiters: usize,
    // restored if the flight is abandoned
    prior: Option<HarnessError>,
}

/// Single-flight memoizing cell for one production stage
pub struct SingleFlight<T> {
    stage: Stage,
    slot: Mutex<Slot<T>>,
    next_id: AtomicU64,
    launches: AtomicUsize,
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("stage", &self.stage)
            .field("status", &self.status())
            .field("launches", &self.launches())
            .finish()
    }
}

impl<T> SingleFlight<T> {
    /// Create an idle cell for `stage`
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            slot: Mutex::new(Slot::Idle),
            next_id: AtomicU64::new(0),
            launches: AtomicUsize::new(0),
        }
    }

    /// Current state
    pub fn status(&self) -> FlightStatus {
        match &*self.slot.lock() {
            Slot::Idle => FlightStatus::Idle,
            Slot::Pending(_) => FlightStatus::Pending,
            Slot::Ready(_) => FlightStatus::Ready,
            Slot::Failed(_) => FlightStatus::Failed,
        }
    }

    /// Cached value, if production has succeeded
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.slot.lock() {
            Slot::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Number of productions launched so far
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }
}

impl<T: Send + Sync + 'static> SingleFlight<T> {
    /// Return the cached value, join the pending production, or launch one
    ///
    /// `produce` is invoked only when a new production starts. It receives the
    /// production's own cancellation token, which fires once no caller is
    /// waiting any more. `Ok(None)` from the production is reported as
    /// [`HarnessError::ContractViolation`].
    pub async fn get_or_produce<F>(&self, cancel: &CancellationToken, produce: F) -> Result<Arc<T>>
    where
        F: FnOnce(CancellationToken) -> BoxFuture<'static, Result<Option<T>>>,
    {
        let (id, outcome) = {
            let mut slot = self.slot.lock();
            if let Slot::Ready(value) = &*slot {
                return Ok(Arc::clone(value));
            }
            if cancel.is_cancelled() {
                return Err(HarnessError::Cancelled);
            }

            if let Slot::Pending(flight) = &mut *slot {
                flight.waiters += 1;
                (flight.id, flight.outcome.clone())
            } else {
                let prior = match std::mem::replace(&mut *slot, Slot::Idle) {
                    Slot::Failed(error) => Some(error),
                    _ => None,
                };
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                self.launches.fetch_add(1, Ordering::Relaxed);
                log::debug!("launching {} production #{id}", self.stage);

                let token = CancellationToken::new();
                let stage = self.stage;
                let outcome = produce(token.clone())
                    .map(move |result| match result {
                        Ok(Some(value)) => Ok(Arc::new(value)),
                        Ok(None) => Err(HarnessError::ContractViolation { stage }),
                        Err(error) => Err(error),
                    })
                    .boxed()
                    .shared();

                *slot = Slot::Pending(Flight {
                    id,
                    outcome: outcome.clone(),
                    cancel: token,
                    waiters: 1,
                    prior,
                });
                (id, outcome)
            }
        };

        let waiter = Waiter { cell: self, id };
        let result = tokio::select! {
            biased;
            result = outcome => {
                self.settle(id, &result);
                result
            }
            _ = cancel.cancelled() => Err(HarnessError::Cancelled),
        };
        drop(waiter);
        result
    }

    fn settle(&self, id: u64, result: &Result<Arc<T>>) {
        let finished = {
            let mut slot = self.slot.lock();
            if !matches!(&*slot, Slot::Pending(flight) if flight.id == id) {
                return;
            }
            let settled = match result {
                Ok(value) => Slot::Ready(Arc::clone(value)),
                Err(error) => Slot::Failed(error.clone()),
            };
            std::mem::replace(&mut *slot, settled)
        };

        match result {
            Ok(_) => log::debug!("{} production #{id} ready", self.stage),
            Err(error) => log::debug!("{} production #{id} failed: {error}", self.stage),
        }
        drop(finished);
    }
}

/// Registration of one caller on a pending production
struct Waiter<'a, T> {
    cell: &'a SingleFlight<T>,
    id: u64,
}

impl<T> Drop for Waiter<'_, T> {
    fn drop(&mut self) {
        let abandoned = {
            let mut slot = self.cell.slot.lock();
            match &mut *slot {
                Slot::Pending(flight) if flight.id == self.id => {
                    flight.waiters -= 1;
                    if flight.waiters > 0 {
                        return;
                    }
                    let restored = match flight.prior.take() {
                        Some(error) => Slot::Failed(error),
                        None => Slot::Idle,
                    };
                    std::mem::replace(&mut *slot, restored)
                }
                _ => return,
            }
        };

        if let Slot::Pending(flight) = abandoned {
            flight.cancel.cancel();
            log::debug!(
                "{} production #{} abandoned by all callers",
                self.cell.stage,
                flight.id
            );
        }
    }
}
