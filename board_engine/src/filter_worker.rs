//! Background filter/sort worker.
//!
//! The worker thread waits for `FilterCommand::Run`, drains whatever else is
//! already queued so only the newest request is evaluated, and answers with a
//! `FilterResponse`. It performs no I/O; the only way it stops is a
//! `FilterCommand::Shutdown` or the store dropping its channels.
use std::thread::{self, JoinHandle};

use board_common::command::{FilterCommand, FilterRequest, FilterResponse};
use board_common::{BoardError, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info};

use crate::filter;

/// Handle to the filter worker thread.
pub struct FilterWorker {
    cmd_tx: Sender<FilterCommand>,
    result_rx: Receiver<FilterResponse>,
    handle: Option<JoinHandle<()>>,
}

impl FilterWorker {
    /// Thread name of the worker.
    pub const NAME: &'static str = "filter-worker";

    /// Start the worker thread.
    pub fn spawn() -> Result<Self> {
        let (cmd_tx, cmd_rx) = unbounded::<FilterCommand>();
        let (result_tx, result_rx) = unbounded::<FilterResponse>();
        let handle = thread::Builder::new()
            .name(Self::NAME.into())
            .spawn(move || run(cmd_rx, result_tx))
            .map_err(|source| BoardError::WorkerSpawn {
                name: Self::NAME,
                source,
            })?;
        Ok(Self {
            cmd_tx,
            result_rx,
            handle: Some(handle),
        })
    }

    /// Post a request; never blocks.
    pub fn send(&self, request: FilterRequest) -> Result<()> {
        self.cmd_tx
            .send(FilterCommand::Run(request))
            .map_err(|e| BoardError::ChannelSend(format!("filter worker: {}", e)))
    }

    /// Responses emitted by the worker.
    pub fn results(&self) -> &Receiver<FilterResponse> {
        &self.result_rx
    }

    /// Ask the thread to stop and wait for it.
    pub fn terminate(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.cmd_tx.send(FilterCommand::Shutdown);
        if handle.join().is_err() {
            error!("Filter worker panicked");
        }
    }
}

impl Drop for FilterWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn run(cmd_rx: Receiver<FilterCommand>, result_tx: Sender<FilterResponse>) {
    info!("Filter worker started (Thread ID: {:?})", thread::current().id());

    while let Ok(command) = cmd_rx.recv() {
        let FilterCommand::Run(mut request) = command else {
            break;
        };

        let mut shutdown = false;
        for queued in cmd_rx.try_iter() {
            match queued {
                FilterCommand::Run(newer) => {
                    debug!(
                        "Filter request {} superseded by {}",
                        request.batch_timestamp, newer.batch_timestamp
                    );
                    request = newer;
                }
                FilterCommand::Shutdown => {
                    shutdown = true;
                    break;
                }
            }
        }
        if shutdown {
            break;
        }

        let response = filter::apply(&request);
        debug!(
            "Filtered {} -> {} quotes in {:?}",
            response.stats.items_in, response.stats.items_out, response.stats.processing_time
        );
        if result_tx.send(response).is_err() {
            break;
        }
    }
    info!("Filter worker stopping...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_common::filters::{FilterConfig, SortConfig};
    use board_common::Quote;
    use std::sync::Arc;
    use std::time::Duration;

    fn request(ts: u64, codes: &[&str]) -> FilterRequest {
        FilterRequest {
            batch_timestamp: ts,
            data: Arc::new(codes.iter().map(|c| Quote::new(*c)).collect()),
            search_query: String::new(),
            filters: FilterConfig::default(),
            sort: SortConfig::default(),
            show_watchlist: false,
        }
    }

    #[test]
    fn answers_every_request_with_its_timestamp() {
        let mut worker = FilterWorker::spawn().unwrap();
        worker.send(request(1, &["A", "B"])).unwrap();
        let response = worker.results().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(response.batch_timestamp, 1);
        assert_eq!(response.stats.items_out, 2);
        worker.terminate();
    }

    #[test]
    fn last_response_is_for_the_newest_request() {
        let mut worker = FilterWorker::spawn().unwrap();
        for ts in 1..=20 {
            worker.send(request(ts, &["A"])).unwrap();
        }
        let mut last = 0;
        while last != 20 {
            let response = worker.results().recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(response.batch_timestamp > last);
            last = response.batch_timestamp;
        }
        worker.terminate();
        assert!(worker.results().try_recv().is_err());
    }
}
