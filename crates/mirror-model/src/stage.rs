//! Named pipeline threads.

use std::io;
use std::thread::{self, JoinHandle};

/// One pipeline stage running on its own named thread.
///
/// A stage ends when its input channel closes.
#[derive(Debug)]
pub struct Stage {
    name: String,
    thread: JoinHandle<()>,
}

impl Stage {
    /// Run `body` on a new thread called `name`.
    pub fn spawn<F>(name: &str, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread = thread::Builder::new().name(name.to_owned()).spawn(body)?;
        tracing::debug!(stage = name, "stage started");
        Ok(Self {
            name: name.to_owned(),
            thread,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the stage to drain its input and exit.
    pub fn join(self) {
        if self.thread.join().is_err() {
            tracing::error!(stage = %self.name, "stage panicked");
        } else {
            tracing::debug!(stage = %self.name, "stage stopped");
        }
    }
}
