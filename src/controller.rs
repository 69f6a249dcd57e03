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
use std::error::Error;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, info, span, warn, Instrument, Level};

use crate::sampler::{BankId, EqSettings, PadId};

pub mod keyboard;
pub mod router;
pub mod shortcuts;

pub use router::{Routed, Router};
use shortcuts::Shortcut;

/// Controller events that will be routed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Presses a pad.
    Press(PadId),

    /// Releases a pad. Stutter pads ignore releases.
    Release(PadId),

    /// A key combination, routed through the global bindings and the shortcut map.
    Key(Shortcut),

    /// Stops a bank, or everything when no bank is given.
    Stop(Option<BankId>),

    /// Toggles the bus mute.
    ToggleMute,

    /// Sets the master volume.
    MasterVolume(f32),

    /// Sets the bus EQ.
    Eq(EqSettings),

    /// Reports the current mix and live voices.
    Status,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Feeds events from a driver into a router.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(router: Router, driver: Arc<dyn Driver>) -> Result<Controller, Box<dyn Error>> {
        Ok(Controller {
            handle: tokio::spawn(
                Controller::route_events(router, driver).instrument(span!(Level::INFO, "controller")),
            ),
        })
    }

    /// Join will block until the driver closes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    async fn route_events(mut router: Router, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let join_handle = driver.monitor_events(events_tx);

        info!(bank = ?router.selected_bank(), "Controller started.");

        while let Some(event) = events_rx.recv().await {
            debug!(event = ?event, "Received event.");
            match router.handle(event) {
                Ok(Routed::Status(status)) => eprintln!("{status}"),
                Ok(routed) => debug!(routed = ?routed, "Event routed."),
                Err(e) => warn!(err = %e, "Event rejected."),
            }
        }

        info!("Controller closing.");
        match join_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(err = %e, "Event monitor failed"),
            Err(e) => warn!(err = %e, "Error waiting for event monitor to stop"),
        }
    }
}
