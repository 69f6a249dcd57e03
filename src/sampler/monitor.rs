// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, span, Level};

use super::engine::SamplerEngine;
use crate::playsync::CancelHandle;

/// Periodically publishes progress and releases voices that played to the end. Stops when
/// dropped.
pub struct ProgressMonitor {
    cancel: CancelHandle,
    join: Option<JoinHandle<()>>,
}

impl ProgressMonitor {
    pub fn spawn(
        engine: Arc<SamplerEngine>,
        interval: Duration,
    ) -> Result<ProgressMonitor, std::io::Error> {
        let cancel = CancelHandle::new();
        let join = {
            let cancel = cancel.clone();
            thread::Builder::new()
                .name("progress-monitor".to_string())
                .spawn(move || {
                    let span = span!(Level::INFO, "progress monitor");
                    let _enter = span.enter();
                    debug!(interval_ms = interval.as_millis(), "Progress monitor started");

                    loop {
                        engine.tick();
                        if cancel.wait_timeout(interval) {
                            break;
                        }
                    }

                    debug!("Progress monitor stopped");
                })?
        };

        Ok(ProgressMonitor {
            cancel,
            join: Some(join),
        })
    }

    /// Stops the monitor and waits for its thread to exit.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
