//! Day/night simulation plumbing
//!
//! A worker thread polls a [`SimulationClock`] collaborator at a fixed
//! cadence and publishes snapshots into a mutex-guarded model. The render
//! thread samples-and-clears the update flag under the lock once per frame
//! and applies the resulting light changes outside the critical section;
//! no GPU call ever happens while the lock is held.

pub mod day_night;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::info;

/// Worker polling interval
const UPDATE_INTERVAL: Duration = Duration::from_millis(200);

/// One published state of the day/night cycle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationSnapshot {
    /// Normalized time of day in `[0, 1)`
    pub time: f32,

    /// Between sunrise and sunset
    pub is_day: bool,
    /// Sun travel progress across the day, `[0, 1]`
    pub sun_rays_interpolation: f32,

    /// Inside the golden hour after sunrise
    pub is_morning_golden_hour: bool,
    /// Inside the golden hour before sunset
    pub is_evening_golden_hour: bool,
    /// Progress through the active golden hour, `[0, 1]`
    pub golden_hour_interpolation: f32,

    /// Inside the twilight before sunrise
    pub is_dawn_twilight: bool,
    /// Inside the twilight after sunset
    pub is_dusk_twilight: bool,
    /// Progress through the active twilight, `[0, 1]`
    pub twilight_interpolation: f32,
}

/// The shared model the worker publishes into
#[derive(Debug, Default)]
pub struct SimulationModel {
    /// Set by the worker, cleared by the render thread's sample
    pub was_updated: bool,
    /// Latest published snapshot
    pub snapshot: SimulationSnapshot,
}

/// Computes the day/night state; the actual cycle math lives with the
/// caller, the worker only drives the cadence
pub trait SimulationClock: Send + 'static {
    /// Produce the snapshot for the current wall-clock moment
    fn advance(&mut self) -> SimulationSnapshot;
}

/// Owns the simulation worker thread.
///
/// `stop` sets the termination flag and joins; the join is bounded by the
/// worker's fixed polling interval. Dropping the worker stops it.
pub struct SimulationWorker {
    shared: Arc<Mutex<SimulationModel>>,
    terminate: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulationWorker {
    /// Spawn the worker thread over a clock
    pub fn start(mut clock: impl SimulationClock) -> Self {
        info!("starting simulation");

        let shared = Arc::new(Mutex::new(SimulationModel::default()));
        let terminate = Arc::new(AtomicBool::new(false));

        let worker_shared = Arc::clone(&shared);
        let worker_terminate = Arc::clone(&terminate);
        let handle = std::thread::spawn(move || {
            while !worker_terminate.load(Ordering::Relaxed) {
                let snapshot = clock.advance();

                if let Ok(mut model) = worker_shared.lock() {
                    model.snapshot = snapshot;
                    model.was_updated = true;
                }

                std::thread::sleep(UPDATE_INTERVAL);
            }
        });

        Self {
            shared,
            terminate,
            handle: Some(handle),
        }
    }

    /// The model the worker publishes into
    pub fn shared(&self) -> Arc<Mutex<SimulationModel>> {
        Arc::clone(&self.shared)
    }

    /// Ask the worker to terminate and join it
    pub fn stop(&mut self) {
        self.terminate.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            info!("simulation is stopped");
        }
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sample-and-clear the shared model.
///
/// Returns the latest snapshot when the worker published since the last
/// call; the copy happens under the lock, everything else outside it.
pub fn take_update(model: &Mutex<SimulationModel>) -> Option<SimulationSnapshot> {
    let Ok(mut guard) = model.lock() else {
        return None;
    };

    if !guard.was_updated {
        return None;
    }

    guard.was_updated = false;
    Some(guard.snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingClock(u32);

    impl SimulationClock for CountingClock {
        fn advance(&mut self) -> SimulationSnapshot {
            self.0 += 1;
            SimulationSnapshot {
                time: self.0 as f32,
                ..SimulationSnapshot::default()
            }
        }
    }

    #[test]
    fn test_take_update_clears_the_flag() {
        let model = Mutex::new(SimulationModel {
            was_updated: true,
            snapshot: SimulationSnapshot {
                time: 0.5,
                ..SimulationSnapshot::default()
            },
        });

        let first = take_update(&model).expect("update pending");
        assert!((first.time - 0.5).abs() < f32::EPSILON);

        assert!(take_update(&model).is_none());
    }

    #[test]
    fn test_worker_publishes_and_stops() {
        let mut worker = SimulationWorker::start(CountingClock(0));
        let shared = worker.shared();

        // The first publish happens before the first sleep
        let mut snapshot = None;
        for _ in 0..50 {
            snapshot = take_update(&shared);
            if snapshot.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(snapshot.is_some());

        worker.stop();
        // Stopping twice is harmless
        worker.stop();
    }
}
