use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender, SyncSender, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::{debug, info};

use crate::{
    error::StepperError, simulation::Simulation, snapshot::Snapshot, FRAME_LENGTH, SUB_STEP,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepperState {
    Idle,
    Running,
}

/// What the worker hands back at the end of a frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub snapshot: Snapshot,
    pub sub_steps: usize,
    /// The frame ended on a stop request rather than on the time threshold.
    pub stopped: bool,
    /// Simulated time already covered by the next frame.
    pub carry: f64,
}

/// Simulated time bookkeeping across frames.
///
/// A frame runs sub-steps until [`FRAME_LENGTH`] is reached. A frame cut
/// short by a stop request keeps its elapsed time for the next one, so
/// pausing never shifts the phase; a complete frame starts the next from zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameClock {
    carry: f64,
}

impl FrameClock {
    #[must_use]
    pub fn carry(&self) -> f64 {
        self.carry
    }

    /// Runs one frame, checking `stop` before every sub-step.
    pub fn advance(&mut self, simulation: &mut Simulation, stop: &AtomicBool) -> FrameReport {
        self.advance_until(simulation, || stop.load(Ordering::Acquire))
    }

    fn advance_until(
        &mut self,
        simulation: &mut Simulation,
        mut stop_requested: impl FnMut() -> bool,
    ) -> FrameReport {
        let mut elapsed = self.carry;
        let mut sub_steps = 0;
        let mut stopped = false;

        while elapsed < FRAME_LENGTH {
            if stop_requested() {
                stopped = true;
                break;
            }
            simulation.sub_step();
            elapsed += SUB_STEP;
            sub_steps += 1;
        }

        self.carry = if stopped { elapsed } else { 0. };
        debug!("frame ran {sub_steps} sub-steps, stopped: {stopped}, carry: {}", self.carry);

        FrameReport {
            snapshot: simulation.snapshot(),
            sub_steps,
            stopped,
            carry: self.carry,
        }
    }
}

enum Command {
    Start(SyncSender<FrameReport>),
    Shutdown,
}

/// Runs frames of a [`Simulation`] on a dedicated thread.
///
/// The worker owns the simulation. Each [`start`](Self::start) must be
/// followed by a [`wait`](Self::wait) (or a successful
/// [`try_wait`](Self::try_wait)) before the next one; the frame's snapshot
/// travels back with the completion signal, so the caller never touches
/// state that is being mutated.
///
/// If a sub-step panics (see [`Simulation::sub_step`]) the worker is gone
/// and every later call reports [`StepperError::Disconnected`].
pub struct Stepper {
    commands: Sender<Command>,
    stop: Arc<AtomicBool>,
    completion: Option<Receiver<FrameReport>>,
    worker: Option<JoinHandle<Simulation>>,
}

impl Stepper {
    pub fn spawn(simulation: Simulation) -> Result<Self, StepperError> {
        let (commands, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let worker_stop = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name("stepper".into())
            .spawn(move || run(simulation, &receiver, &worker_stop))
            .map_err(StepperError::Spawn)?;
        info!("stepper thread started");

        Ok(Self {
            commands,
            stop,
            completion: None,
            worker: Some(worker),
        })
    }

    #[must_use]
    pub fn state(&self) -> StepperState {
        if self.completion.is_some() {
            StepperState::Running
        } else {
            StepperState::Idle
        }
    }

    /// Begins the next frame.
    pub fn start(&mut self) -> Result<(), StepperError> {
        if self.completion.is_some() {
            return Err(StepperError::AlreadyRunning);
        }

        self.stop.store(false, Ordering::Release);
        let (done, completion) = mpsc::sync_channel(1);
        self.commands
            .send(Command::Start(done))
            .map_err(|_| StepperError::Disconnected)?;
        self.completion = Some(completion);
        Ok(())
    }

    /// Asks the running frame to end after the current sub-step.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Blocks until the running frame has finished.
    pub fn wait(&mut self) -> Result<FrameReport, StepperError> {
        let completion = self.completion.take().ok_or(StepperError::NotRunning)?;
        completion.recv().map_err(|_| StepperError::Disconnected)
    }

    /// Returns the report if the running frame has finished.
    pub fn try_wait(&mut self) -> Result<Option<FrameReport>, StepperError> {
        let completion = self.completion.as_ref().ok_or(StepperError::NotRunning)?;
        match completion.try_recv() {
            Ok(report) => {
                self.completion = None;
                Ok(Some(report))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.completion = None;
                Err(StepperError::Disconnected)
            }
        }
    }

    /// Ends the worker, interrupting a running frame, and returns the
    /// simulation.
    pub fn shutdown(mut self) -> Result<Simulation, StepperError> {
        self.stop();
        if let Some(completion) = self.completion.take() {
            // a dead worker is reported by the join below
            let _ = completion.recv();
        }

        let worker = self.worker.take().ok_or(StepperError::Disconnected)?;
        let _ = self.commands.send(Command::Shutdown);
        worker.join().map_err(|_| StepperError::Disconnected)
    }
}

impl Drop for Stepper {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.stop();
            let _ = self.commands.send(Command::Shutdown);
            let _ = worker.join();
        }
    }
}

fn run(mut simulation: Simulation, commands: &Receiver<Command>, stop: &AtomicBool) -> Simulation {
    let mut clock = FrameClock::default();

    while let Ok(Command::Start(done)) = commands.recv() {
        let report = clock.advance(&mut simulation, stop);
        if done.send(report).is_err() {
            debug!("frame finished without anyone waiting");
        }
    }

    info!("stepper thread exiting at t = {}", simulation.time());
    simulation
}
