use crate::runner::GuestRunner;
use crate::{Error, ExecuteResult, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

type Reply<T> = oneshot::Sender<Result<T>>;

enum Request {
    Init(Reply<()>),
    Restart(Reply<()>),
    Tokenize {
        name: String,
        source: String,
        reply: Reply<String>,
    },
    Parse {
        name: String,
        source: String,
        reply: Reply<String>,
    },
    Execute {
        name: String,
        source: String,
        reply: Reply<ExecuteResult>,
    },
}

/// Asynchronous handle to a guest running on its own thread.
///
/// The runner lives on a dedicated `guest-vm` thread and serves requests one
/// at a time in the order they were sent, so no two guest calls ever overlap.
/// Clones share the same guest. Dropping a pending future does not cancel the
/// call; its result is discarded when it arrives.
#[derive(Clone)]
pub struct GuestBridge {
    requests: mpsc::UnboundedSender<Request>,
    ready: Arc<AtomicBool>,
}

impl GuestBridge {
    /// Move `runner` onto a new worker thread.
    pub fn spawn(runner: GuestRunner) -> Result<Self> {
        let (requests, rx) = mpsc::unbounded_channel();
        let ready = Arc::new(AtomicBool::new(runner.is_ready()));
        let flag = Arc::clone(&ready);

        std::thread::Builder::new()
            .name("guest-vm".to_string())
            .spawn(move || serve(runner, rx, flag))?;

        Ok(Self { requests, ready })
    }

    /// Whether the guest was ready after the last completed request.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Start the guest.
    pub async fn init(&self) -> Result<()> {
        self.request(Request::Init).await
    }

    /// Replace the guest instance with a fresh one.
    pub async fn restart(&self) -> Result<()> {
        self.request(Request::Restart).await
    }

    /// Run the guest tokenizer.
    pub async fn tokenize(&self, name: &str, source: &str) -> Result<String> {
        self.request(|reply| Request::Tokenize {
            name: name.to_string(),
            source: source.to_string(),
            reply,
        })
        .await
    }

    /// Run the guest parser.
    pub async fn parse(&self, name: &str, source: &str) -> Result<String> {
        self.request(|reply| Request::Parse {
            name: name.to_string(),
            source: source.to_string(),
            reply,
        })
        .await
    }

    /// Execute a program.
    pub async fn execute(&self, name: &str, source: &str) -> Result<ExecuteResult> {
        self.request(|reply| Request::Execute {
            name: name.to_string(),
            source: source.to_string(),
            reply,
        })
        .await
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .map_err(|_| Error::BridgeClosed)?;
        response.await.map_err(|_| Error::BridgeClosed)?
    }
}

fn serve(
    mut runner: GuestRunner,
    mut requests: mpsc::UnboundedReceiver<Request>,
    ready: Arc<AtomicBool>,
) {
    tracing::debug!("guest worker started");

    while let Some(request) = requests.blocking_recv() {
        match request {
            Request::Init(reply) => {
                ready.store(false, Ordering::SeqCst);
                let result = runner.init();
                respond(reply, result, &runner, &ready);
            }
            Request::Restart(reply) => {
                ready.store(false, Ordering::SeqCst);
                let result = runner.restart();
                respond(reply, result, &runner, &ready);
            }
            Request::Tokenize {
                name,
                source,
                reply,
            } => {
                let result = runner.tokenize(&name, &source);
                respond(reply, result, &runner, &ready);
            }
            Request::Parse {
                name,
                source,
                reply,
            } => {
                let result = runner.parse(&name, &source);
                respond(reply, result, &runner, &ready);
            }
            Request::Execute {
                name,
                source,
                reply,
            } => {
                let result = runner.execute(&name, &source);
                respond(reply, result, &runner, &ready);
            }
        }
    }

    tracing::debug!("guest worker stopped");
}

/// Publish readiness, then reply. A dropped receiver discards the result.
fn respond<T>(reply: Reply<T>, result: Result<T>, runner: &GuestRunner, ready: &AtomicBool) {
    ready.store(runner.is_ready(), Ordering::SeqCst);
    let _ = reply.send(result);
}
