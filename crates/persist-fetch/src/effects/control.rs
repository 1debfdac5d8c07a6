//! Pause, resume and cancel requests from outside a running session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// What the caller currently wants the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    #[default]
    Running,
    Paused,
    /// Terminal: a cancelled session never runs again.
    Cancelled,
}

/// Caller side of a control channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: Arc<watch::Sender<ControlState>>,
}

/// Session side of a control channel.
#[derive(Debug, Clone)]
pub struct ControlSignal {
    rx: watch::Receiver<ControlState>,
}

/// Create a connected handle/signal pair in the `Running` state.
pub fn control() -> (ControlHandle, ControlSignal) {
    let (tx, rx) = watch::channel(ControlState::Running);
    (ControlHandle { tx: Arc::new(tx) }, ControlSignal { rx })
}

impl ControlHandle {
    /// Ask the session to drop its connection and wait.
    pub fn pause(&self) { self.set(ControlState::Paused); }

    /// Let a paused session reconnect.
    pub fn resume(&self) { self.set(ControlState::Running); }

    /// Stop the session, keeping its staging file.
    pub fn cancel(&self) { self.set(ControlState::Cancelled); }

    pub fn state(&self) -> ControlState { *self.tx.borrow() }

    fn set(&self, next: ControlState) {
        self.tx.send_if_modified(|state| {
            if *state == ControlState::Cancelled || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

/// How a controlled sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    Elapsed,
    Paused,
    Cancelled,
}

impl ControlSignal {
    /// A signal nobody can raise.
    pub fn none() -> Self {
        let (_, signal) = control();
        signal
    }

    pub fn state(&self) -> ControlState { *self.rx.borrow() }

    /// Resolve on the next state change. Never resolves once the handle is gone.
    pub(crate) async fn changed(&mut self) -> ControlState {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        *self.rx.borrow_and_update()
    }

    /// Sleep for `duration`, waking early on pause or cancel.
    pub(crate) async fn sleep(&mut self, duration: Duration) -> Wake {
        match self.current() {
            ControlState::Paused => return Wake::Paused,
            ControlState::Cancelled => return Wake::Cancelled,
            ControlState::Running => {}
        }

        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Wake::Elapsed,
                state = self.changed() => match state {
                    ControlState::Running => continue,
                    ControlState::Paused => return Wake::Paused,
                    ControlState::Cancelled => return Wake::Cancelled,
                },
            }
        }
    }

    /// Block while paused. Returns `Running` or `Cancelled`.
    ///
    /// A pause whose handle was dropped can never be lifted and counts as cancel.
    pub(crate) async fn wait_while_paused(&mut self) -> ControlState {
        loop {
            match self.current() {
                ControlState::Paused => {
                    if self.rx.changed().await.is_err() {
                        return ControlState::Cancelled;
                    }
                }
                state => return state,
            }
        }
    }

    fn current(&mut self) -> ControlState { *self.rx.borrow_and_update() }
}
