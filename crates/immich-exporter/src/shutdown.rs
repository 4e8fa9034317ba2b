use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// A second signal arrived; the process must exit immediately.
    Forced,
    /// The signal source closed after at most one signal.
    Closed,
}

/// Observes the shutdown request raised by the first termination signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // nobody can request shutdown any more
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn channel() -> (watch::Sender<bool>, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (tx, ShutdownSignal { rx })
}

/// First signal requests a graceful shutdown, the second one forces it.
pub async fn drive(
    mut signals: mpsc::Receiver<&'static str>,
    tx: watch::Sender<bool>,
) -> ShutdownOutcome {
    let mut received = 0_u32;
    while let Some(signal) = signals.recv().await {
        received += 1;
        if received > 1 {
            warn!(signal, "forcibly killing exporter");
            return ShutdownOutcome::Forced;
        }
        info!(signal, "exporter is shutting down");
        tx.send_replace(true);
    }
    ShutdownOutcome::Closed
}

/// Forwards SIGINT and SIGTERM into a channel.
pub fn os_signals() -> mpsc::Receiver<&'static str> {
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        #[cfg(unix)]
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                None
            }
        };

        loop {
            #[cfg(unix)]
            let name = tokio::select! {
                result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
                Some(_) = async {
                    match sigterm.as_mut() {
                        Some(stream) => stream.recv().await,
                        None => std::future::pending().await,
                    }
                } => Ok("SIGTERM"),
            };
            #[cfg(not(unix))]
            let name = tokio::signal::ctrl_c().await.map(|_| "SIGINT");

            match name {
                Ok(name) => {
                    if tx.send(name).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "failed to listen for shutdown signals");
                    return;
                }
            }
        }
    });

    rx
}

/// Wires OS signals to a [`ShutdownSignal`] and exits with code 1 on the second signal.
pub fn install() -> ShutdownSignal {
    let (tx, signal) = channel();
    let signals = os_signals();
    tokio::spawn(async move {
        if drive(signals, tx).await == ShutdownOutcome::Forced {
            std::process::exit(1);
        }
    });
    signal
}
