// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Controllers: execution contexts owning a group of capsules.
//!
//! ```text
//!  director / capsule threads            controller thread
//!  ┌───────────────────────┐  inbox    ┌──────────────────────┐
//!  │ deliver()             │ ────────► │ capsule.receive()    │
//!  │ initialize_capsule()  │  (FIFO)   │ capsule.initialize() │
//!  │ enqueue_abort/exit()  │           │ stop                 │
//!  └───────────────────────┘           └──────────────────────┘
//! ```

use crate::deployment::{Capsule, DeploymentError};
use crate::signal::{CommsPort, Signal};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A named execution context.
pub trait Controller: Send + Sync {
    fn name(&self) -> &str;

    /// Start the controller thread.
    fn spawn(&self) -> Result<(), DeploymentError>;

    /// Wait for the controller thread to finish.
    fn join(&self);

    /// Ask the controller to stop, dropping pending work.
    fn enqueue_abort(&self);

    /// Ask the controller to stop after pending work.
    fn enqueue_exit(&self);

    /// Queue `signal` for `capsule` on `port`. `false` if the controller
    /// no longer accepts work.
    fn deliver(&self, capsule: &Arc<Capsule>, port: &Arc<CommsPort>, signal: Signal) -> bool;

    /// Queue the `INITIALIZE` signal for `capsule`.
    fn initialize_capsule(&self, capsule: &Arc<Capsule>) -> bool;
}

/// Creates controllers on demand by name.
pub trait ControllerFactory: Send + Sync {
    fn create(&self, name: &str) -> Arc<dyn Controller>;
}

// ============================================================================
// Queue controller
// ============================================================================

enum Command {
    Initialize(Arc<Capsule>),
    Deliver {
        capsule: Arc<Capsule>,
        port: Arc<CommsPort>,
        signal: Signal,
    },
    Abort,
    Exit,
}

/// Controller running its capsules on one thread fed by a FIFO inbox.
///
/// Work queued before [`Controller::spawn`] is kept and processed once the
/// thread starts.
pub struct QueueController {
    name: String,
    tx: Sender<Command>,
    rx: Mutex<Option<Receiver<Command>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    aborted: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
}

impl QueueController {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            name: name.into(),
            tx,
            rx: Mutex::new(Some(rx)),
            thread: Mutex::new(None),
            aborted: Arc::new(AtomicBool::new(false)),
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Signals handed to capsules so far (`INITIALIZE` included).
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Work waiting in the inbox.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    fn run(name: &str, rx: Receiver<Command>, aborted: &AtomicBool, delivered: &AtomicU64) {
        log::debug!("[Controller] {} started", name);
        while let Ok(command) = rx.recv() {
            if aborted.load(Ordering::Acquire) {
                break;
            }
            match command {
                Command::Initialize(capsule) => {
                    capsule.initialize(&Signal::initialize_signal());
                    delivered.fetch_add(1, Ordering::Relaxed);
                }
                Command::Deliver {
                    capsule,
                    port,
                    signal,
                } => {
                    log::trace!(
                        "[Controller] {} -> {} on {}",
                        signal.name(),
                        capsule.name(),
                        port
                    );
                    capsule.receive(&port, &signal);
                    delivered.fetch_add(1, Ordering::Relaxed);
                }
                Command::Abort | Command::Exit => break,
            }
        }
        log::debug!("[Controller] {} stopped", name);
    }

    fn push(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

impl Controller for QueueController {
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self) -> Result<(), DeploymentError> {
        let Some(rx) = self.rx.lock().take() else {
            return Err(DeploymentError::ControllerAlreadySpawned(self.name.clone()));
        };
        let name = self.name.clone();
        let aborted = Arc::clone(&self.aborted);
        let delivered = Arc::clone(&self.delivered);
        let handle = thread::Builder::new()
            .name(format!("controller-{}", self.name))
            .spawn(move || Self::run(&name, rx, &aborted, &delivered))
            .map_err(|e| DeploymentError::Spawn {
                controller: self.name.clone(),
                reason: e.to_string(),
            })?;
        *self.thread.lock() = Some(handle);
        Ok(())
    }

    fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("[Controller] {} panicked", self.name);
            }
        }
    }

    fn enqueue_abort(&self) {
        self.aborted.store(true, Ordering::Release);
        self.push(Command::Abort);
    }

    fn enqueue_exit(&self) {
        self.push(Command::Exit);
    }

    fn deliver(&self, capsule: &Arc<Capsule>, port: &Arc<CommsPort>, signal: Signal) -> bool {
        if self.aborted.load(Ordering::Acquire) {
            return false;
        }
        self.push(Command::Deliver {
            capsule: Arc::clone(capsule),
            port: Arc::clone(port),
            signal,
        })
    }

    fn initialize_capsule(&self, capsule: &Arc<Capsule>) -> bool {
        self.push(Command::Initialize(Arc::clone(capsule)))
    }
}

impl fmt::Debug for QueueController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueController")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .field("delivered", &self.delivered())
            .finish()
    }
}

/// Factory producing [`QueueController`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueueControllerFactory;

impl ControllerFactory for QueueControllerFactory {
    fn create(&self, name: &str) -> Arc<dyn Controller> {
        Arc::new(QueueController::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::{BasicCapsuleClass, CapsuleBehavior, CapsuleClass};
    use crate::signal::SignalId;

    struct Record(Sender<String>);

    impl CapsuleBehavior for Record {
        fn initialize(&mut self, capsule: &str, _signal: &Signal) {
            let _ = self.0.send(format!("init {}", capsule));
        }

        fn receive(&mut self, _capsule: &str, _port: &CommsPort, signal: &Signal) {
            let _ = self.0.send(signal.name().to_string());
        }
    }

    fn recording_capsule(tx: Sender<String>) -> Arc<Capsule> {
        let class = BasicCapsuleClass::new("Rec")
            .border_port("in", "P")
            .behavior(move |_| Box::new(Record(tx.clone())));
        Arc::new(class.create("rec"))
    }

    #[test]
    fn test_work_queued_before_spawn_runs_in_order() {
        let (tx, rx) = channel::unbounded();
        let capsule = recording_capsule(tx);
        let port = Arc::clone(&capsule.border_ports()[0]);
        let controller = QueueController::new("c1");

        assert!(controller.initialize_capsule(&capsule));
        assert!(controller.deliver(&capsule, &port, Signal::new("a", SignalId(1))));
        assert!(controller.deliver(&capsule, &port, Signal::new("b", SignalId(2))));
        controller.enqueue_exit();
        assert_eq!(controller.pending(), 4);

        controller.spawn().expect("spawn");
        controller.join();

        let seen: Vec<String> = rx.try_iter().collect();
        assert_eq!(seen, vec!["init rec", "a", "b"]);
        assert_eq!(controller.delivered(), 3);
    }

    #[test]
    fn test_abort_drops_pending_work() {
        let (tx, rx) = channel::unbounded();
        let capsule = recording_capsule(tx);
        let port = Arc::clone(&capsule.border_ports()[0]);
        let controller = QueueController::new("c2");

        controller.deliver(&capsule, &port, Signal::new("a", SignalId(1)));
        controller.enqueue_abort();
        assert!(!controller.deliver(&capsule, &port, Signal::new("b", SignalId(2))));

        controller.spawn().expect("spawn");
        controller.join();
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_spawn_twice_is_an_error() {
        let controller = QueueController::new("c3");
        controller.spawn().expect("spawn");
        assert!(matches!(
            controller.spawn(),
            Err(DeploymentError::ControllerAlreadySpawned(_))
        ));
        controller.enqueue_exit();
        controller.join();
    }

    #[test]
    fn test_factory_names_controllers() {
        let controller = QueueControllerFactory.create("worker");
        assert_eq!(controller.name(), "worker");
    }
}
