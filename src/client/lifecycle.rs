use std::future::Future;
use tokio::sync::watch;

/// Component lifetime. Work started through a `MountToken` is dropped once
/// the owning view unmounts, so late responses never touch its state.
#[derive(Debug)]
pub struct Mount {
    tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct MountToken {
    rx: watch::Receiver<bool>,
}

impl Default for Mount {
    fn default() -> Self {
        Self::new()
    }
}

impl Mount {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Mount { tx }
    }

    pub fn token(&self) -> MountToken {
        MountToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn unmount(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_mounted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl MountToken {
    pub fn is_mounted(&self) -> bool {
        *self.rx.borrow()
    }

    async fn unmounted(&self) {
        let mut rx = self.rx.clone();
        // A dropped sender counts as unmounted too
        let _ = rx.wait_for(|mounted| !*mounted).await;
    }

    /// Runs `fut` unless the view unmounts first. `None` means the result was discarded.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        if !self.is_mounted() {
            return None;
        }
        tokio::select! {
            output = fut => self.is_mounted().then_some(output),
            _ = self.unmounted() => None,
        }
    }
}
