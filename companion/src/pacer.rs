//! Paced reveal of a streamed reply.
//!
//! Deltas arrive in bursts. The pacer shows the reply at a steady rate of one
//! character per interval no matter how fast the network delivers it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Receives the currently revealed prefix of the reply.
pub trait DisplaySink: Send + Sync {
    fn show(&self, text: &str);
}

#[derive(Debug, Clone, Copy)]
pub struct DisplayPacer {
    interval: Duration,
    poll: Duration,
}

impl Default for DisplayPacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(60), Duration::from_millis(10))
    }
}

impl DisplayPacer {
    pub fn new(interval: Duration, poll: Duration) -> Self {
        Self {
            interval,
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    /// Start revealing `reader` into `sink` until the returned handle is
    /// cancelled or dropped.
    pub fn spawn(&self, reader: watch::Receiver<String>, sink: Arc<dyn DisplaySink>) -> PacerHandle {
        let (revealed_tx, revealed) = watch::channel(0usize);
        let task = tokio::spawn(run(*self, reader, sink, revealed_tx));
        PacerHandle { task, revealed }
    }
}

async fn run(
    pacer: DisplayPacer,
    reader: watch::Receiver<String>,
    sink: Arc<dyn DisplaySink>,
    revealed_tx: watch::Sender<usize>,
) {
    let mut revealed = 0usize;
    let mut last_reveal = Instant::now();
    loop {
        tokio::time::sleep(pacer.poll).await;
        if last_reveal.elapsed() < pacer.interval {
            continue;
        }

        let prefix = {
            let text = reader.borrow();
            match text.char_indices().nth(revealed) {
                Some((start, ch)) => text[..start + ch.len_utf8()].to_string(),
                None => continue,
            }
        };
        revealed += 1;
        last_reveal = Instant::now();
        sink.show(&prefix);
        revealed_tx.send_replace(revealed);
    }
}

pub struct PacerHandle {
    task: JoinHandle<()>,
    revealed: watch::Receiver<usize>,
}

impl PacerHandle {
    /// Characters shown so far.
    pub fn revealed(&self) -> usize {
        *self.revealed.borrow()
    }

    /// Wait until at least `total` characters have been shown.
    pub async fn wait_caught_up(&mut self, total: usize) {
        // Err means the pacer is gone and nothing more will be shown
        let _ = self.revealed.wait_for(|n| *n >= total).await;
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for PacerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
