//! # Pool de Workers
//! src/pool/worker_pool.rs
//!
//! Pool de tamaño fijo de threads del sistema alimentado por una cola FIFO
//! thread-safe (`Mutex<VecDeque>` + `Condvar`).
//!
//! ```text
//! accept loop ──execute()──► [ cola FIFO ] ──► worker-0
//!                                          ├─► worker-1
//!                                          └─► ... worker-(N-1)
//! ```
//!
//! - Si todos los workers están ocupados, las tareas esperan en la cola; no
//!   se descartan (salvo que se configure una capacidad máxima).
//! - Un pánico dentro de una tarea se captura: el worker sigue vivo.
//! - `shutdown` deja de aceptar tareas, drena la cola y espera a los workers.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::Serialize;

/// Unidad de trabajo que corre en un worker
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Interfaz mínima que necesita el dispatcher
///
/// Cualquier backend (threads, tareas async, procesos) puede implementarla.
pub trait Executor: Send + Sync {
    /// Encola una tarea sin esperar su resultado
    fn execute(&self, task: Task) -> Result<(), PoolError>;

    /// Foto del estado actual
    fn stats(&self) -> PoolStats;
}

/// Errores del pool
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Worker queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    #[error("Worker pool is shut down")]
    ShutDown,

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Estadísticas del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub size: usize,
    pub busy: usize,
    pub queued: usize,
    pub capacity: Option<usize>,
    pub completed: u64,
    pub panicked: u64,
}

/// Estado protegido por el mutex
struct State {
    queue: VecDeque<Task>,
    shutting_down: bool,
    busy: usize,
    completed: u64,
    panicked: u64,
}

struct Shared {
    state: Mutex<State>,
    available: Condvar,
}

impl Shared {
    /// Las tareas corren fuera del lock, así que un mutex envenenado
    /// solo puede venir de un bug nuestro; recuperamos el estado igual.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pool de threads de ancho fijo
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
    capacity: Option<usize>,
}

impl WorkerPool {
    /// Crea el pool y arranca `size` workers (mínimo 1)
    ///
    /// `capacity = None` significa cola sin límite.
    pub fn new(size: usize, capacity: Option<usize>) -> Result<Self, PoolError> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                shutting_down: false,
                busy: 0,
                completed: 0,
                panicked: 0,
            }),
            available: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("worker-{}", i))
                .spawn(move || worker_loop(shared))
                .map_err(PoolError::Spawn)?;
            workers.push(handle);
        }

        tracing::debug!(size, ?capacity, "Worker pool started");

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            size,
            capacity,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Encola una función y devuelve un handle para esperar su resultado
    ///
    /// # Ejemplo
    /// ```
    /// use job_server::pool::WorkerPool;
    ///
    /// let pool = WorkerPool::new(2, None).unwrap();
    /// let handle = pool.submit(|| 40 + 2).unwrap();
    /// assert_eq!(handle.wait().unwrap(), 42);
    /// ```
    pub fn submit<T, F>(&self, f: F) -> Result<TaskHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.enqueue(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            // Si el caller soltó el handle nadie espera el resultado
            let _ = tx.send(outcome);
        }))?;
        Ok(TaskHandle { rx })
    }

    /// Deja de aceptar tareas, drena la cola y espera a los workers
    ///
    /// Llamarlo más de una vez es inofensivo.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.shutting_down && self.lock_workers().is_empty() {
                return;
            }
            state.shutting_down = true;
        }
        self.shared.available.notify_all();

        let handles = std::mem::take(&mut *self.lock_workers());
        let current = thread::current().id();
        for handle in handles {
            // Un worker no puede esperarse a sí mismo
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("Worker thread exited abnormally");
            }
        }
        tracing::debug!("Worker pool stopped");
    }

    fn enqueue(&self, task: Task) -> Result<(), PoolError> {
        let mut state = self.shared.lock();

        if state.shutting_down {
            return Err(PoolError::ShutDown);
        }
        if let Some(capacity) = self.capacity {
            if state.queue.len() >= capacity {
                return Err(PoolError::QueueFull { capacity });
            }
        }

        state.queue.push_back(task);
        drop(state);

        self.shared.available.notify_one();
        Ok(())
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Executor for WorkerPool {
    fn execute(&self, task: Task) -> Result<(), PoolError> {
        self.enqueue(task)
    }

    fn stats(&self) -> PoolStats {
        let state = self.shared.lock();
        PoolStats {
            size: self.size,
            busy: state.busy,
            queued: state.queue.len(),
            capacity: self.capacity,
            completed: state.completed,
            panicked: state.panicked,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Loop de cada worker: sacar tarea, ejecutarla, repetir
fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.lock();
            loop {
                if let Some(task) = state.queue.pop_front() {
                    state.busy += 1;
                    break task;
                }
                if state.shutting_down {
                    return;
                }
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(task));

        let mut state = shared.lock();
        state.busy -= 1;
        state.completed += 1;
        if let Err(payload) = outcome {
            state.panicked += 1;
            tracing::error!(panic = %panic_message(payload.as_ref()), "Task panicked in worker");
        }
    }
}

/// Handle para esperar el resultado de `WorkerPool::submit`
pub struct TaskHandle<T> {
    rx: mpsc::Receiver<thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Bloquea hasta que la tarea termine
    pub fn wait(self) -> Result<T, PoolError> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(PoolError::TaskPanicked(panic_message(payload.as_ref()))),
            // El pool se destruyó antes de correr la tarea
            Err(_) => Err(PoolError::ShutDown),
        }
    }
}

/// Extrae el mensaje de un payload de pánico
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
