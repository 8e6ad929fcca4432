//! Lifecycle: connect, run the two loops, tear down.

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use westpipe_frame::{FrameError, FrameReader, LineWriter};

use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, FrameStats};
use crate::error::{EngineError, Result};
use crate::factory::ModuleFactory;
use crate::heartbeat::run_heartbeat;
use crate::module::{NullRenderSink, RenderSink};
use crate::registry::ModuleRegistry;
use crate::sink::{LogSink, TracingLogSink};
use crate::state::{ConnectionState, StateCell, StateWatcher};

type TerminatedCallback = Box<dyn FnOnce(&ExitReason) + Send>;

/// Why the dispatch loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The peer closed the inbound leg.
    EndOfStream,
    /// Stop was requested.
    Cancelled,
    /// The inbound leg failed or carried an unreadable frame.
    TransportFailed(String),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream => f.write_str("end of stream"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::TransportFailed(err) => write!(f, "transport failed: {err}"),
        }
    }
}

/// Final state of a finished engine.
#[derive(Debug)]
pub struct EngineReport {
    pub reason: ExitReason,
    pub registry: ModuleRegistry,
    pub stats: FrameStats,
    pub heartbeats: u64,
}

/// A configured engine that has not started yet.
pub struct Engine {
    config: EngineConfig,
    factory: ModuleFactory,
    render: Arc<dyn RenderSink>,
    logs: Arc<dyn LogSink>,
    on_terminated: Option<TerminatedCallback>,
    state: Arc<StateCell>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(config: EngineConfig, factory: ModuleFactory) -> Self {
        Self {
            config,
            factory,
            render: Arc::new(NullRenderSink),
            logs: Arc::new(TracingLogSink),
            on_terminated: None,
            state: Arc::new(StateCell::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_render_sink(mut self, sink: Arc<dyn RenderSink>) -> Self {
        self.render = sink;
        self
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.logs = sink;
        self
    }

    /// Called once when the peer goes away or the inbound leg fails.
    ///
    /// Not called when the engine is stopped on request.
    pub fn on_terminated<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&ExitReason) + Send + 'static,
    {
        self.on_terminated = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> StateWatcher {
        self.state.watch()
    }

    /// Token that stops the engine, before or after it started.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bind the pipe, wait for the peer, then start.
    ///
    /// Cancelling while waiting returns [`EngineError::Cancelled`] and removes
    /// the socket files.
    #[cfg(unix)]
    pub async fn listen(self, pipe: &westpipe_transport::PipeConfig) -> Result<EngineHandle> {
        use westpipe_transport::PipeServer;

        self.state.set(ConnectionState::Loading);
        let server = match PipeServer::bind(pipe) {
            Ok(server) => server,
            Err(err) => {
                self.state.set(ConnectionState::Stopped);
                return Err(err.into());
            }
        };

        self.state.set(ConnectionState::AwaitingConnection);
        info!(path = %pipe.inbound_path.display(), dual = pipe.is_dual(), "waiting for peer");

        let accepted = tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = server.accept() => Some(result),
        };
        // Established connections outlive the listening sockets.
        drop(server);

        match accepted {
            Some(Ok(connection)) => {
                let (inbound, outbound) = connection.into_legs();
                Ok(self.start(inbound, outbound))
            }
            Some(Err(err)) => {
                self.state.set(ConnectionState::Stopped);
                Err(err.into())
            }
            None => {
                self.state.set(ConnectionState::Stopped);
                Err(EngineError::Cancelled)
            }
        }
    }

    /// Run over already connected legs. Must be called inside a tokio runtime.
    pub fn start<R, W>(self, inbound: R, outbound: W) -> EngineHandle
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Self {
            config,
            factory,
            render,
            logs,
            on_terminated,
            state,
            cancel,
        } = self;

        let mut dispatcher = Dispatcher::new(&config, factory, Arc::clone(&state))
            .with_render_sink(render)
            .with_log_sink(logs);
        dispatcher.connected();

        let reader = FrameReader::with_config(inbound, config.frame.clone());
        let dispatch = tokio::spawn(dispatch_loop(
            reader,
            dispatcher,
            Arc::clone(&state),
            cancel.clone(),
            on_terminated,
        ));

        let heartbeat = {
            let cancel = cancel.clone();
            let line = config.heartbeat_line;
            let interval = config.heartbeat_interval;
            tokio::spawn(async move {
                let mut writer = LineWriter::new(outbound);
                let beats = run_heartbeat(&mut writer, &line, interval, &cancel).await;
                if let Err(err) = writer.shutdown().await {
                    debug!(error = %err, "outbound leg already closed");
                }
                beats
            })
        };

        EngineHandle {
            cancel,
            state: state.watch(),
            dispatch: Some(dispatch),
            heartbeat: Some(heartbeat),
        }
    }
}

async fn dispatch_loop<R>(
    mut reader: FrameReader<R>,
    mut dispatcher: Dispatcher,
    state: Arc<StateCell>,
    cancel: CancellationToken,
    on_terminated: Option<TerminatedCallback>,
) -> (ExitReason, ModuleRegistry, FrameStats)
where
    R: AsyncRead + Unpin,
{
    let reason = loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break ExitReason::Cancelled,
            read = reader.read_frame() => read,
        };

        match read {
            Ok(frame) => {
                dispatcher.handle_text(frame.text());
            }
            Err(FrameError::EndOfStream) => break ExitReason::EndOfStream,
            Err(err) => {
                warn!(error = %err, "inbound leg failed");
                break ExitReason::TransportFailed(err.to_string());
            }
        }
    };

    state.set(ConnectionState::Stopping);
    drop(reader);
    cancel.cancel();
    state.set(ConnectionState::Stopped);
    info!(%reason, "dispatch loop stopped");

    if reason != ExitReason::Cancelled {
        if let Some(callback) = on_terminated {
            callback(&reason);
        }
    }

    let (registry, stats) = dispatcher.into_parts();
    (reason, registry, stats)
}

/// A running engine.
///
/// Dropping the handle cancels the engine; call [`EngineHandle::join`] to
/// wait for it and collect the report.
pub struct EngineHandle {
    cancel: CancellationToken,
    state: StateWatcher,
    dispatch: Option<JoinHandle<(ExitReason, ModuleRegistry, FrameStats)>>,
    heartbeat: Option<JoinHandle<u64>>,
}

impl EngineHandle {
    /// Request shutdown. Idempotent and callable from any thread.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> StateWatcher {
        self.state.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.dispatch.as_ref().is_none_or(JoinHandle::is_finished)
            && self.heartbeat.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for both loops to end.
    pub async fn join(mut self) -> Result<EngineReport> {
        let dispatch = self.dispatch.take();
        let heartbeat = self.heartbeat.take();

        let (reason, registry, stats) = match dispatch {
            Some(task) => task
                .await
                .map_err(|err| EngineError::TaskFailed(err.to_string()))?,
            None => return Err(EngineError::TaskFailed("engine already joined".to_string())),
        };
        let heartbeats = match heartbeat {
            Some(task) => task
                .await
                .map_err(|err| EngineError::TaskFailed(err.to_string()))?,
            None => 0,
        };

        Ok(EngineReport {
            reason,
            registry,
            stats,
            heartbeats,
        })
    }

    /// Stop, then wait.
    pub async fn shutdown(self) -> Result<EngineReport> {
        self.stop();
        self.join().await
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
