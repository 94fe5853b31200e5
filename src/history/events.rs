// src/history/events.rs

use chrono::{DateTime, Local};
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedSender},
    task::{self, JoinHandle},
};
use tracing::{debug, error};

use super::schedule::ScheduleStore;

/// Things a run tells the outside world about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunEvent {
    Attempted { at: DateTime<Local> },
}

/// Sending half handed to the run. Emitting never blocks and never fails
/// the caller, even when nobody is listening any more.
#[derive(Clone, Debug)]
pub struct RunEvents {
    tx: UnboundedSender<RunEvent>,
}

impl RunEvents {
    pub fn emit(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            debug!("run event dropped, recorder gone");
        }
    }

    pub fn attempted(&self) {
        self.emit(RunEvent::Attempted { at: Local::now() });
    }
}

/// Background task that bumps the run counter for each attempted run.
/// It ends once every [`RunEvents`] handle is dropped.
pub fn spawn_recorder(store: ScheduleStore) -> (RunEvents, JoinHandle<()>) {
    let (tx, mut rx) = unbounded_channel::<RunEvent>();

    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Attempted { at } => {
                    let store = store.clone();
                    let res = task::spawn_blocking(move || store.increment()).await;
                    match res {
                        Ok(Ok(state)) => {
                            debug!(%at, run_count = state.run_count, "recorded run")
                        }
                        Ok(Err(e)) => error!(error = %format!("{:#}", e), "could not record run"),
                        Err(e) => error!(error = %e, "run recorder task failed"),
                    }
                }
            }
        }
    });

    (RunEvents { tx }, handle)
}
