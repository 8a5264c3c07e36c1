//! Maps process signals onto the two logical session requests.
//!
//! SIGUSR1 asks for a graceful finish; SIGINT and SIGTERM cancel. Only the
//! first signal is forwarded, later ones are swallowed.

use scorer_core::Result;
use tokio::sync::oneshot;
use tracing::info;

use crate::session::SessionSignal;

/// Install the signal handlers and return the receiving end for the session.
pub fn spawn_signal_bridge() -> Result<oneshot::Receiver<SessionSignal>> {
    let (tx, rx) = oneshot::channel();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut finish = signal(SignalKind::user_defined1())?;

        tokio::spawn(async move {
            // Finish wins when several signals are already pending.
            let received = tokio::select! {
                biased;
                Some(()) = finish.recv() => SessionSignal::Finish,
                Some(()) = interrupt.recv() => SessionSignal::Cancel,
                Some(()) = terminate.recv() => SessionSignal::Cancel,
                else => return,
            };
            forward(tx, received);
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                forward(tx, SessionSignal::Cancel);
            }
        });
    }

    Ok(rx)
}

fn forward(tx: oneshot::Sender<SessionSignal>, signal: SessionSignal) {
    match signal {
        SessionSignal::Finish => info!("Finishing scoring..."),
        SessionSignal::Cancel => info!("Canceling scoring..."),
    }
    let _ = tx.send(signal);
}
