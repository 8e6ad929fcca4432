//! Protocol engine for westpipe.
//!
//! The engine reads frames from the inbound leg, reassembles the module
//! configuration sent by the peer, builds modules through a
//! [`ModuleFactory`], and then feeds every data tick to the modules it names.
//! A heartbeat line goes out on the outbound leg until the engine stops.
//!
//! ```no_run
//! # async fn run() -> westpipe_engine::Result<()> {
//! use westpipe_engine::{Engine, EngineConfig, ModuleFactory};
//! use westpipe_transport::PipeConfig;
//!
//! let engine = Engine::new(EngineConfig::default(), ModuleFactory::with_builtin());
//! let handle = engine.listen(&PipeConfig::default()).await?;
//! let report = handle.join().await?;
//! println!("stopped: {}", report.reason);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod engine;
pub mod error;
pub mod factory;
pub mod heartbeat;
pub mod keys;
pub mod module;
pub mod modules;
pub mod registry;
pub mod sink;
pub mod state;

pub use assembler::ConfigAssembler;
pub use config::{EngineConfig, DEFAULT_HEARTBEAT_INTERVAL};
pub use dispatch::{Dispatcher, FrameOutcome, FrameStats};
pub use document::{ConfigMap, Document, VarMap, MODULE_TYPE_KEY};
pub use engine::{Engine, EngineHandle, EngineReport, ExitReason};
pub use error::{ConfigKeyError, DocumentError, EngineError, ModuleError, Result};
pub use factory::{BuildOutcome, ModuleFactory};
pub use heartbeat::run_heartbeat;
pub use module::{
    ChannelRenderSink, Module, NullRenderSink, RenderEvent, RenderSink, RenderTarget,
    SeriesValue, Snapshot,
};
pub use registry::ModuleRegistry;
pub use sink::{LogSink, TracingLogSink};
pub use state::{ConnectionState, StateCell, StateWatcher};
