//! The scheduling-loop thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::transport::TransportStatus;
use crate::{Result, Sequencer};

/// Background thread repeatedly calling [`Sequencer::step`] until the
/// sequencer quits. Dropping the handle quits and joins.
pub struct SequencerThread {
    sequencer: Arc<Sequencer>,
    handle: Option<JoinHandle<()>>,
}

impl SequencerThread {
    pub fn spawn(sequencer: Arc<Sequencer>) -> Result<Self> {
        let looped = Arc::clone(&sequencer);
        let handle = thread::Builder::new()
            .name("cadenza-sequencer".into())
            .spawn(move || run_loop(&looped))?;

        Ok(Self {
            sequencer,
            handle: Some(handle),
        })
    }

    pub fn sequencer(&self) -> &Arc<Sequencer> {
        &self.sequencer
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Quit the sequencer and wait for the loop to exit.
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.sequencer.quit();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Sequencer thread panicked");
            }
        }
    }
}

impl Drop for SequencerThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(sequencer: &Sequencer) {
    tracing::info!("Sequencer thread started");
    loop {
        let outcome = sequencer.step();
        if outcome.status == TransportStatus::Quit {
            break;
        }
        if outcome.at_leisure {
            thread::sleep(sequencer.sleep_interval());
        } else {
            thread::yield_now();
        }
    }
    tracing::info!("Sequencer thread exited");
}
