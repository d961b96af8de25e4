//! Session thread
//!
//! The controller lives on one dedicated thread. Everything that can change
//! session state arrives there as a message: commands from any number of
//! [`SessionHandle`]s, engine notifications, and the poll and sleep-timer
//! ticks. Each message is handled to completion before the next one is read.

use crate::commands::Command;
use crate::controller::SessionController;
use crate::state::SessionSnapshot;
use crossbeam_channel::{never, tick, unbounded, Receiver, Sender};
use earshot_core::{
    AppError, Audiobook, AudioEngine, CatalogStore, EngineEvent, ErrorCategory,
    NowPlayingSurface, Result,
};
use std::thread;
use std::time::{Duration, Instant};

enum Message {
    Command(Command, Option<Sender<Result<()>>>),
    Load(Box<Audiobook>, Sender<Result<()>>),
    Engine(EngineEvent),
    Snapshot(Sender<SessionSnapshot>),
    Shutdown,
}

/// Problems the session hit while handling fire-and-forget messages
#[derive(Debug, Clone, PartialEq)]
pub struct SessionNotice {
    pub category: ErrorCategory,
    pub message: String,
    pub user_message: String,
}

impl From<&AppError> for SessionNotice {
    fn from(error: &AppError) -> Self {
        Self {
            category: error.category(),
            message: error.to_string(),
            user_message: error.user_message(),
        }
    }
}

/// Cloneable handle for sending work to the session thread
#[derive(Clone)]
pub struct SessionHandle {
    tx: Sender<Message>,
    notices: Receiver<SessionNotice>,
}

impl SessionHandle {
    /// Queues a command without waiting; failures show up as [`SessionNotice`]s
    pub fn send(&self, command: impl Into<Command>) -> Result<()> {
        self.tx
            .send(Message::Command(command.into(), None))
            .map_err(|_| AppError::SessionClosed)
    }

    /// Runs a command and waits for its result
    pub fn execute(&self, command: impl Into<Command>) -> Result<()> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(Message::Command(command.into(), Some(reply_tx)))
            .map_err(|_| AppError::SessionClosed)?;
        reply_rx.recv().map_err(|_| AppError::SessionClosed)?
    }

    /// Starts loading `book` on the session thread
    ///
    /// The returned receiver yields the outcome once the engine has opened the
    /// file. Until then the session keeps serving the previous item.
    pub fn load_item(&self, book: Audiobook) -> Result<Receiver<Result<()>>> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(Message::Load(Box::new(book), reply_tx))
            .map_err(|_| AppError::SessionClosed)?;
        Ok(reply_rx)
    }

    /// Loads `book` and waits for the outcome
    pub fn load_item_blocking(&self, book: Audiobook) -> Result<()> {
        self.load_item(book)?
            .recv()
            .map_err(|_| AppError::SessionClosed)?
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(Message::Snapshot(reply_tx))
            .map_err(|_| AppError::SessionClosed)?;
        reply_rx.recv().map_err(|_| AppError::SessionClosed)
    }

    /// Errors from fire-and-forget commands and engine notifications
    pub fn notices(&self) -> &Receiver<SessionNotice> {
        &self.notices
    }
}

/// Owns the session thread; created once by the composition root
pub struct SessionRuntime {
    handle: SessionHandle,
    thread: Option<thread::JoinHandle<()>>,
}

impl SessionRuntime {
    /// Moves the controller onto its own thread and starts serving messages
    pub fn spawn<E, C, N>(mut controller: SessionController<E, C, N>) -> Result<Self>
    where
        E: AudioEngine + 'static,
        C: CatalogStore + 'static,
        N: NowPlayingSurface + 'static,
    {
        let (tx, rx) = unbounded();
        let (notice_tx, notice_rx) = unbounded();

        let engine_tx = tx.clone();
        controller.subscribe_engine(Box::new(move |event| {
            // The session may already be gone during teardown.
            let _ = engine_tx.send(Message::Engine(event));
        }));

        let thread = thread::Builder::new()
            .name("earshot-session".to_string())
            .spawn(move || run(controller, rx, notice_tx))
            .map_err(|e| AppError::InternalError {
                message: format!("Failed to spawn session thread: {}", e),
            })?;

        Ok(Self {
            handle: SessionHandle {
                tx,
                notices: notice_rx,
            },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stops playback, persists the position and joins the session thread
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.tx.send(Message::Shutdown);
            if thread.join().is_err() {
                log::error!("Session thread panicked");
            }
        }
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

/// Keeps a ticker alive only while it is wanted
///
/// Ticks start fresh each time playback starts, and whenever `generation`
/// changes while the ticker is already running.
struct Ticker {
    interval: Duration,
    rx: Option<(u64, Receiver<Instant>)>,
}

impl Ticker {
    fn new(interval: Duration) -> Self {
        Self { interval, rx: None }
    }

    fn arm(&mut self, wanted: bool, generation: u64) -> Receiver<Instant> {
        if !wanted {
            self.rx = None;
            return never();
        }
        match &self.rx {
            Some((armed_for, rx)) if *armed_for == generation => rx.clone(),
            _ => {
                let rx = tick(self.interval);
                self.rx = Some((generation, rx.clone()));
                rx
            }
        }
    }
}

fn run<E, C, N>(
    mut controller: SessionController<E, C, N>,
    rx: Receiver<Message>,
    notices: Sender<SessionNotice>,
) where
    E: AudioEngine,
    C: CatalogStore,
    N: NowPlayingSurface,
{
    let mut poll = Ticker::new(controller.settings().poll_interval);
    let mut sleep = Ticker::new(controller.settings().sleep_tick);
    log::info!("Session thread started");

    loop {
        let poll_rx = poll.arm(controller.is_playing(), 0);
        let sleep_rx = sleep.arm(
            controller.sleep_timer_active(),
            controller.sleep_timer_generation(),
        );

        let keep_running = crossbeam_channel::select! {
            recv(rx) -> message => match message {
                Ok(message) => handle_message(&mut controller, message, &notices),
                Err(_) => false,
            },
            recv(poll_rx) -> _ => {
                controller.poll_tick();
                true
            },
            recv(sleep_rx) -> _ => {
                controller.sleep_tick();
                true
            },
        };

        if !keep_running {
            break;
        }
    }

    controller.shutdown();
    log::info!("Session thread stopped");
}

/// Returns false once the session should stop
fn handle_message<E, C, N>(
    controller: &mut SessionController<E, C, N>,
    message: Message,
    notices: &Sender<SessionNotice>,
) -> bool
where
    E: AudioEngine,
    C: CatalogStore,
    N: NowPlayingSurface,
{
    let report = |result: Result<()>| {
        if let Err(e) = result {
            let _ = notices.send(SessionNotice::from(&e));
        }
    };

    match message {
        Message::Command(command, reply) => {
            let result = controller.execute(command);
            match reply {
                Some(reply) => {
                    let _ = reply.send(result);
                }
                None => report(result),
            }
        }
        Message::Load(book, reply) => {
            let _ = reply.send(controller.load_item(*book));
        }
        Message::Engine(event) => report(controller.handle_engine_event(event)),
        Message::Snapshot(reply) => {
            let _ = reply.send(controller.snapshot());
        }
        Message::Shutdown => return false,
    }
    true
}
