use tokio::sync::watch;

/// Creates a linked stop handle and signal.
pub fn channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopSignal { rx })
}

/// Requests a cooperative stop. Work already in flight is allowed to finish.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            // Sender dropped without stopping: nothing will ever stop us.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_reaches_every_signal() {
        let (handle, signal) = channel();
        let mut late = handle.signal();
        assert!(!signal.is_stopped());

        handle.stop();

        assert!(signal.is_stopped());
        late.stopped().await;
        assert!(late.is_stopped());
    }

    #[tokio::test]
    async fn never_signal_stays_pending() {
        let mut signal = StopSignal::never();
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(10), signal.stopped()).await;
        assert!(waited.is_err());
        assert!(!signal.is_stopped());
    }
}
