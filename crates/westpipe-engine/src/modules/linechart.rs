use crate::document::{ConfigMap, VarMap};
use crate::error::ModuleError;
use crate::keys;
use crate::module::{Module, RenderTarget, SeriesValue, Snapshot};

use super::{number, read_range, FRAME_STEP_MS};

/// Width of the visible x window.
const VIEWPORT_WIDTH: f64 = 300.0;

/// Oldest points are discarded past this many per series.
const MAX_POINTS: usize = 4096;

/// One point per series per update, x advancing by [`FRAME_STEP_MS`].
pub struct LineChart {
    target: RenderTarget,
    vars: VarMap,
    title: String,
    range: [f64; 2],
    scroll: bool,
    series: Vec<Series>,
    frame: u32,
    viewport: [f64; 2],
}

struct Series {
    name: String,
    points: Vec<(f64, f64)>,
}

impl LineChart {
    pub const TAG: &'static str = "linechart";

    pub fn new(target: RenderTarget) -> Self {
        Self {
            target,
            vars: VarMap::new(),
            title: String::new(),
            range: [0.0, 0.0],
            scroll: false,
            series: Vec::new(),
            frame: 0,
            viewport: [1.0, VIEWPORT_WIDTH],
        }
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    pub fn viewport(&self) -> [f64; 2] {
        self.viewport
    }

    /// X coordinate the next update will use.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn series_names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name.as_str())
    }

    pub fn points(&self, series: &str) -> Option<&[(f64, f64)]> {
        self.series
            .iter()
            .find(|s| s.name == series)
            .map(|s| s.points.as_slice())
    }
}

impl Module for LineChart {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn initialize(&mut self, title: &str, config: &ConfigMap) -> Result<(), ModuleError> {
        self.range = read_range(config)?;
        self.scroll = keys::require_bool(config, "scroll")?;
        self.series = keys::require_string_list(config, "series-names")?
            .into_iter()
            .map(|name| Series {
                name,
                points: Vec::new(),
            })
            .collect();
        self.title = title.to_string();
        Ok(())
    }

    fn update(&mut self) -> Result<(), ModuleError> {
        // Validate the whole tick first so a bad variable adds no points.
        let mut values = Vec::with_capacity(self.vars.len());
        for (name, value) in &self.vars {
            let index = self
                .series
                .iter()
                .position(|s| &s.name == name)
                .ok_or_else(|| ModuleError::UnknownSeries(name.clone()))?;
            values.push((index, number(name, value)?));
        }

        let x = f64::from(self.frame);
        for &(index, y) in &values {
            let points = &mut self.series[index].points;
            points.push((x, y));
            let excess = points.len().saturating_sub(MAX_POINTS);
            if excess > 0 {
                points.drain(..excess);
            }
        }

        if self.scroll && !values.is_empty() && x > self.viewport[1] {
            let step = f64::from(FRAME_STEP_MS);
            self.viewport = [self.viewport[0] + step, self.viewport[1] + step];
        }

        self.target.publish(Snapshot::LineChart {
            title: self.title.clone(),
            frame: self.frame,
            viewport: self.viewport,
            points: values
                .iter()
                .map(|&(index, value)| SeriesValue {
                    series: self.series[index].name.clone(),
                    value,
                })
                .collect(),
        });

        self.frame = self.frame.saturating_add(FRAME_STEP_MS);
        Ok(())
    }

    fn vars(&self) -> &VarMap {
        &self.vars
    }

    fn replace_vars(&mut self, vars: VarMap) {
        self.vars = vars;
    }
}
