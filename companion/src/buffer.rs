use tokio::sync::watch;

/// Append-only text of the reply being streamed.
///
/// There is one writer, the decode loop. Readers get a `watch` receiver and
/// keep their own offsets into the text; nothing already appended changes.
#[derive(Debug)]
pub struct StreamBuffer {
    tx: watch::Sender<String>,
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamBuffer {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(String::new());
        Self { tx }
    }

    pub fn append(&self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        self.tx.send_modify(|text| text.push_str(delta));
    }

    pub fn text(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn char_len(&self) -> usize {
        self.tx.borrow().chars().count()
    }

    pub fn reader(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}
