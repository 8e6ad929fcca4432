//! The module capability set and the render boundary.
//!
//! A module is created from a type tag, initialized once with its
//! configuration, then receives a fresh [`VarMap`] before every `update`.
//! Updates always run on the dispatch task. A module that needs another
//! execution context (a UI thread, say) publishes [`Snapshot`]s through its
//! [`RenderTarget`] and lets the sink hop contexts.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::document::{ConfigMap, VarMap};
use crate::error::ModuleError;

/// A consumer of per-tick variables.
pub trait Module: Send {
    /// Lower-case type tag this module was created from.
    fn type_tag(&self) -> &'static str;

    /// Read configuration. `title` is the module id.
    fn initialize(&mut self, title: &str, config: &ConfigMap) -> Result<(), ModuleError>;

    /// React to the current variable map.
    fn update(&mut self) -> Result<(), ModuleError>;

    fn vars(&self) -> &VarMap;

    /// Replace the whole variable map. Called right before `update`.
    fn replace_vars(&mut self, vars: VarMap);
}

/// Where a module's visual state goes.
pub trait RenderSink: Send + Sync {
    fn publish(&self, module_id: &str, snapshot: Snapshot);
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderSink;

impl RenderSink for NullRenderSink {
    fn publish(&self, _module_id: &str, _snapshot: Snapshot) {}
}

/// One snapshot tagged with the module that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEvent {
    pub module_id: String,
    pub snapshot: Snapshot,
}

/// Forwards snapshots to another task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelRenderSink {
    tx: mpsc::UnboundedSender<RenderEvent>,
}

impl ChannelRenderSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RenderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RenderSink for ChannelRenderSink {
    fn publish(&self, module_id: &str, snapshot: Snapshot) {
        // A closed receiver means nobody renders any more.
        let _ = self.tx.send(RenderEvent {
            module_id: module_id.to_string(),
            snapshot,
        });
    }
}

/// A module's handle on the render sink.
#[derive(Clone)]
pub struct RenderTarget {
    module_id: String,
    sink: Arc<dyn RenderSink>,
}

impl RenderTarget {
    pub fn new(module_id: impl Into<String>, sink: Arc<dyn RenderSink>) -> Self {
        Self {
            module_id: module_id.into(),
            sink,
        }
    }

    /// A target that renders nowhere.
    pub fn detached(module_id: impl Into<String>) -> Self {
        Self::new(module_id, Arc::new(NullRenderSink))
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn publish(&self, snapshot: Snapshot) {
        self.sink.publish(&self.module_id, snapshot);
    }
}

impl fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTarget")
            .field("module_id", &self.module_id)
            .finish_non_exhaustive()
    }
}

/// Point-in-time visual state of a built-in module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Snapshot {
    LineChart {
        title: String,
        /// X coordinate of the points added by this update.
        frame: u32,
        viewport: [f64; 2],
        points: Vec<SeriesValue>,
    },
    BarChart {
        title: String,
        range: [f64; 2],
        bars: Vec<SeriesValue>,
    },
    Odometry {
        x: f64,
        y: f64,
        heading: f64,
    },
}

/// A named numeric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesValue {
    pub series: String,
    pub value: f64,
}
