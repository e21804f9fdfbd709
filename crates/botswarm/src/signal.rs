// ABOUTME: Turns SIGINT/SIGTERM into a cancellation of the supervisor.
// ABOUTME: Handlers are installed before the first launch; the supervisor treats the cancellation as an operator stop.

use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Install the termination handlers, then cancel `cancel` on the first
/// Ctrl+C or (on Unix) SIGTERM.
///
/// Installation happens before this returns, so a signal arriving before the
/// listener task is first polled is still caught.
pub fn spawn_listener(cancel: CancellationToken) -> io::Result<JoinHandle<()>> {
    let mut signals = Signals::install()?;
    Ok(tokio::spawn(async move {
        let signal = signals.recv().await;
        tracing::info!(signal, "Received termination request");
        cancel.cancel();
    }))
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct Signals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl Signals {
    fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "ctrl-c"
    }
}
