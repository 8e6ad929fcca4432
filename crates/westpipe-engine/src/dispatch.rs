//! Per-frame state machine.
//!
//! The dispatcher owns everything the dispatch loop mutates: the connection
//! state, the configuration buffer and the module registry. It does no I/O,
//! so every transition can be driven directly from frame text.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use westpipe_frame::{parse, LogRecord, Message, Parsed, CONFIG_HEADER, DATA_HEADER};

use crate::assembler::ConfigAssembler;
use crate::config::EngineConfig;
use crate::document::Document;
use crate::factory::ModuleFactory;
use crate::module::{NullRenderSink, RenderSink};
use crate::registry::ModuleRegistry;
use crate::sink::{LogSink, TracingLogSink};
use crate::state::{ConnectionState, StateCell};

/// What one frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A log record went to the log sink.
    Logged,
    /// Not a message and not a log record.
    Dropped { forwarded: bool },
    /// A well-formed message that means nothing in the current state.
    Ignored,
    /// A configuration fragment was buffered.
    ConfigPending,
    /// Configuration finished; the engine is operational.
    Configured { modules: usize, failed: usize },
    /// The configuration document did not parse.
    ConfigRejected,
    /// A data tick was dispatched.
    Dispatched {
        updated: usize,
        skipped: usize,
        failed: usize,
    },
    /// The data document did not parse.
    TickRejected,
}

/// Running counters, reported when the engine stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frames: u64,
    pub log_records: u64,
    pub dropped: u64,
    pub ignored: u64,
    pub config_fragments: u64,
    pub ticks: u64,
    pub rejected_documents: u64,
    pub module_updates: u64,
    pub module_errors: u64,
}

/// Routes classified frames to the assembler or to live modules.
pub struct Dispatcher {
    state: Arc<StateCell>,
    assembler: ConfigAssembler,
    factory: ModuleFactory,
    registry: ModuleRegistry,
    render: Arc<dyn RenderSink>,
    logs: Arc<dyn LogSink>,
    forward_stray_output: bool,
    stats: FrameStats,
}

impl Dispatcher {
    pub fn new(config: &EngineConfig, factory: ModuleFactory, state: Arc<StateCell>) -> Self {
        let assembler = if config.require_config_terminator {
            ConfigAssembler::new()
        } else {
            ConfigAssembler::legacy()
        };
        Self {
            state,
            assembler,
            factory,
            registry: ModuleRegistry::new(),
            render: Arc::new(NullRenderSink),
            logs: Arc::new(TracingLogSink),
            forward_stray_output: config.forward_stray_output,
            stats: FrameStats::default(),
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

    /// The peer connected: start waiting for configuration.
    pub fn connected(&mut self) {
        self.assembler.reset();
        self.state.set(ConnectionState::AwaitingConfiguration);
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn into_parts(self) -> (ModuleRegistry, FrameStats) {
        (self.registry, self.stats)
    }

    /// Handle the text of one frame.
    pub fn handle_text(&mut self, raw: &str) -> FrameOutcome {
        self.stats.frames += 1;
        match parse(raw) {
            Some(Parsed::Log(record)) => {
                self.stats.log_records += 1;
                self.logs.log(&record);
                FrameOutcome::Logged
            }
            Some(Parsed::Message(message)) => self.handle_message(message),
            None => {
                self.stats.dropped += 1;
                if self.forward_stray_output && !raw.is_empty() {
                    self.logs.log(&LogRecord::stdout(raw));
                    FrameOutcome::Dropped { forwarded: true }
                } else {
                    debug!(len = raw.len(), "malformed frame dropped");
                    FrameOutcome::Dropped { forwarded: false }
                }
            }
        }
    }

    fn handle_message(&mut self, message: Message) -> FrameOutcome {
        match (self.state.get(), message.header.as_str()) {
            (ConnectionState::AwaitingConfiguration, CONFIG_HEADER) => {
                self.handle_config(&message.payload)
            }
            (ConnectionState::Operational, DATA_HEADER) => self.handle_tick(&message.payload),
            (state, header) => {
                self.stats.ignored += 1;
                debug!(%state, header, "message ignored");
                FrameOutcome::Ignored
            }
        }
    }

    fn handle_config(&mut self, payload: &str) -> FrameOutcome {
        self.stats.config_fragments += 1;
        let document = match self.assembler.feed(payload) {
            Ok(Some(document)) => document,
            Ok(None) => return FrameOutcome::ConfigPending,
            Err(err) => {
                self.stats.rejected_documents += 1;
                warn!(error = %err, "configuration rejected; still awaiting configuration");
                return FrameOutcome::ConfigRejected;
            }
        };

        let outcome = self.factory.build(document, &self.render);
        let failed = outcome.failures.len();
        self.registry = outcome.registry;
        info!(
            modules = self.registry.len(),
            failed, "configuration complete"
        );
        self.state.set(ConnectionState::Operational);
        FrameOutcome::Configured {
            modules: self.registry.len(),
            failed,
        }
    }

    fn handle_tick(&mut self, payload: &str) -> FrameOutcome {
        let document = match Document::parse(payload) {
            Ok(document) => document,
            Err(err) => {
                self.stats.rejected_documents += 1;
                warn!(error = %err, "data tick rejected");
                return FrameOutcome::TickRejected;
            }
        };
        self.stats.ticks += 1;

        let mut skipped = document.malformed().len();
        for id in document.malformed() {
            warn!(module_id = %id, "tick entry is not an object");
        }

        let mut updated = 0;
        let mut failed = 0;
        for (id, vars) in document.into_entries() {
            let Some(module) = self.registry.get_mut(&id) else {
                debug!(module_id = %id, "tick for unknown module skipped");
                skipped += 1;
                continue;
            };
            module.replace_vars(vars);
            match module.update() {
                Ok(()) => updated += 1,
                Err(err) => {
                    warn!(module_id = %id, error = %err, "module update failed");
                    failed += 1;
                }
            }
        }

        self.stats.module_updates += updated as u64;
        self.stats.module_errors += failed as u64;
        FrameOutcome::Dispatched {
            updated,
            skipped,
            failed,
        }
    }
}
