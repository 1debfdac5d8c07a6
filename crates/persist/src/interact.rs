//! Terminal interaction: asking for the URL and turning keys into pause,
//! resume and cancel.

use anyhow::{Context, Result, bail};
use console::Term;
use persist_fetch::{ControlHandle, ControlState};
use tokio::sync::mpsc;

use crate::ui::DownloadTracker;

/// Ask for a URL on the terminal.
pub fn prompt_url() -> Result<String> {
    let term = Term::stderr();
    term.write_line("Enter your download URL")?;
    term.write_str(":: ")?;
    let url = term.read_line().context("failed to read URL")?;
    let url = url.trim();
    if url.is_empty() {
        bail!("no URL given");
    }
    Ok(url.to_string())
}

/// Keys the running download reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Interrupt,
    Enter,
}

/// Apply `key` to the download and return the resulting state.
pub fn apply(key: Key, handle: &ControlHandle) -> ControlState {
    match (key, handle.state()) {
        (Key::Interrupt, ControlState::Running) => handle.pause(),
        (Key::Interrupt, ControlState::Paused) => handle.cancel(),
        (Key::Enter, ControlState::Paused) => handle.resume(),
        _ => {}
    }
    handle.state()
}

/// Map Ctrl-C and Enter onto `handle` until the download is cancelled or the
/// task is dropped.
pub async fn watch_keys(handle: ControlHandle, tracker: DownloadTracker) {
    let mut lines = stdin_lines();
    loop {
        let key = tokio::select! {
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => Key::Interrupt,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                    return;
                }
            },
            Some(()) = lines.recv() => Key::Enter,
        };

        let before = handle.state();
        match (before, apply(key, &handle)) {
            (ControlState::Running, ControlState::Paused) => {
                tracker.println("Paused: press Enter to resume, Ctrl-C again to stop");
            }
            (ControlState::Paused, ControlState::Running) => tracker.println("Resuming"),
            (_, ControlState::Cancelled) => return,
            _ => {}
        }
    }
}

/// Line events from stdin.
///
/// Read on a plain thread so a pending read never holds up runtime shutdown.
fn stdin_lines() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(4);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if line.is_err() || tx.blocking_send(()).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use persist_fetch::control;

    use super::*;

    #[test]
    fn test_interrupt_pauses_then_cancels() {
        let (handle, _signal) = control();
        assert_eq!(apply(Key::Interrupt, &handle), ControlState::Paused);
        assert_eq!(apply(Key::Interrupt, &handle), ControlState::Cancelled);
        assert_eq!(apply(Key::Enter, &handle), ControlState::Cancelled);
    }

    #[test]
    fn test_enter_only_resumes_a_pause() {
        let (handle, _signal) = control();
        assert_eq!(apply(Key::Enter, &handle), ControlState::Running);
        apply(Key::Interrupt, &handle);
        assert_eq!(apply(Key::Enter, &handle), ControlState::Running);
    }
}
