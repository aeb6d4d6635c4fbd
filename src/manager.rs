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
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, span, Level};

use crate::color::Color;
use crate::effects::{Effect, EffectId};
use crate::snapshot::StateSnapshot;
use crate::strip::Strip;

/// The shortest time between two frames. Keeps a zero interval from spinning.
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle notifications sent to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Started(EffectId),
    Stopped(EffectId),
    Rendered(EffectId),
}

/// Everything guarded by the manager lock.
struct State {
    /// The installed effect. Always present.
    effect: Effect,
    /// True if the render loop should be running the effect.
    enabled: bool,
    /// The strip. Released on shutdown.
    strip: Option<Box<dyn Strip>>,
    /// When the last frame was rendered. None renders on the next pass of the loop.
    last_frame: Option<Instant>,
    /// Cleared to stop the render loop.
    running: bool,
    /// Lifecycle subscribers.
    observers: Vec<Sender<Lifecycle>>,
}

impl State {
    fn notify(&mut self, event: Lifecycle) {
        self.observers.retain(|observer| observer.send(event).is_ok());
    }

    fn start_effect(&mut self) {
        debug!(effect = %self.effect.kind(), id = %self.effect.id(), "Starting effect.");
        self.effect.start();
        self.last_frame = None;
        let id = self.effect.id();
        self.notify(Lifecycle::Started(id));
    }

    fn stop_effect(&mut self) {
        debug!(effect = %self.effect.kind(), id = %self.effect.id(), "Stopping effect.");
        self.effect.stop();
        let id = self.effect.id();
        self.notify(Lifecycle::Stopped(id));
    }

    fn render(&mut self) {
        let Some(strip) = self.strip.as_mut() else {
            return;
        };
        if let Err(e) = self.effect.run(&mut **strip) {
            error!(err = e.to_string(), "Error rendering frame.");
        }
        let id = self.effect.id();
        self.notify(Lifecycle::Rendered(id));
    }

    fn strip_off(&mut self) {
        if let Some(strip) = self.strip.as_mut() {
            if let Err(e) = strip.off() {
                error!(err = e.to_string(), "Error turning the strip off.");
            }
        }
    }

    /// When the next frame is due, read from the installed effect's current interval.
    fn next_frame(&self) -> Option<Instant> {
        self.last_frame.map(|last_frame| {
            last_frame + self.effect.update_interval().max(MIN_FRAME_INTERVAL)
        })
    }
}

struct Shared {
    state: Mutex<State>,
    /// Signalled whenever the state changes so the render loop re-evaluates its wait.
    wake: Condvar,
}

/// Owns the strip and the active effect, and renders the effect on a background
/// thread. All operations are serialized on a single lock, so a frame is never
/// rendered while an effect is being swapped, started or stopped.
pub struct EffectManager {
    shared: Arc<Shared>,
    render_handle: Mutex<Option<JoinHandle<()>>>,
}

impl EffectManager {
    /// Creates a disabled manager showing plain black and starts its render thread.
    pub fn new(strip: Box<dyn Strip>) -> Result<EffectManager, io::Error> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                effect: Effect::plain(Color::BLACK),
                enabled: false,
                strip: Some(strip),
                last_frame: None,
                running: true,
                observers: Vec::new(),
            }),
            wake: Condvar::new(),
        });
        shared.state.lock().strip_off();

        let render_handle = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("render".to_string())
                .spawn(move || Self::render_loop(shared))?
        };

        Ok(EffectManager {
            shared,
            render_handle: Mutex::new(Some(render_handle)),
        })
    }

    /// Renders the installed effect at its update interval while enabled.
    fn render_loop(shared: Arc<Shared>) {
        let span = span!(Level::INFO, "render loop");
        let _enter = span.enter();

        info!("Render loop started.");
        let mut state = shared.state.lock();
        loop {
            if !state.running {
                info!("Render loop stopped.");
                return;
            }

            if !state.enabled {
                shared.wake.wait(&mut state);
                continue;
            }

            if let Some(next_frame) = state.next_frame() {
                if Instant::now() < next_frame {
                    // Woken early by any state change, after which the deadline is recomputed.
                    shared.wake.wait_until(&mut state, next_frame);
                    continue;
                }
            }

            state.render();
            state.last_frame = Some(Instant::now());
        }
    }

    /// Replaces the installed effect. If enabled, the old effect is stopped before the
    /// new one is started.
    pub fn set_effect(&self, effect: Effect) {
        let mut state = self.shared.state.lock();
        info!(
            from = %state.effect.kind(),
            to = %effect.kind(),
            id = %effect.id(),
            "Setting effect."
        );

        if state.enabled {
            state.stop_effect();
        }
        state.effect = effect;
        if state.enabled {
            state.start_effect();
        }
        self.shared.wake.notify_all();
    }

    /// Starts rendering the installed effect.
    pub fn enable(&self) {
        let mut state = self.shared.state.lock();
        if state.enabled {
            return;
        }

        info!("Enabling.");
        state.enabled = true;
        state.start_effect();
        self.shared.wake.notify_all();
    }

    /// Stops rendering and turns the strip off. The installed effect is kept so that
    /// enabling resumes it.
    pub fn disable(&self) {
        let mut state = self.shared.state.lock();
        if state.enabled {
            info!("Disabling.");
            state.enabled = false;
            state.stop_effect();
        }
        state.strip_off();
        self.shared.wake.notify_all();
    }

    /// A copy of the installed effect that can be modified and installed again.
    pub fn current_effect(&self) -> Effect {
        self.shared.state.lock().effect.detached()
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.state.lock().enabled
    }

    /// The reportable state, read in one go.
    pub fn snapshot(&self) -> StateSnapshot {
        let state = self.shared.state.lock();
        StateSnapshot::new(&state.effect, state.enabled)
    }

    /// Receives lifecycle notifications from now on.
    pub fn subscribe(&self) -> Receiver<Lifecycle> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.shared.state.lock().observers.push(sender);
        receiver
    }

    /// Disables, stops the render thread and releases the strip. Safe to call more than
    /// once.
    pub fn shutdown(&self) {
        let Some(render_handle) = self.render_handle.lock().take() else {
            return;
        };

        self.disable();
        {
            let mut state = self.shared.state.lock();
            state.running = false;
            self.shared.wake.notify_all();
        }

        if render_handle.join().is_err() {
            error!("Error joining render thread.");
        }

        self.shared.state.lock().strip = None;
        info!("Effect manager shut down.");
    }
}

impl Drop for EffectManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
