use crate::document::{ConfigMap, VarMap};
use crate::error::{ConfigKeyError, ModuleError};
use crate::keys;
use crate::module::{Module, RenderTarget, SeriesValue, Snapshot};

use super::{number, read_range, FRAME_STEP_MS};

/// Latest value per series, republished every `refresh-rate` milliseconds
/// of simulated time.
pub struct BarChart {
    target: RenderTarget,
    vars: VarMap,
    title: String,
    range: [f64; 2],
    refresh_ms: u32,
    bars: Vec<SeriesValue>,
    frame: u32,
    published: u64,
}

impl BarChart {
    pub const TAG: &'static str = "barchart";

    pub fn new(target: RenderTarget) -> Self {
        Self {
            target,
            vars: VarMap::new(),
            title: String::new(),
            range: [0.0, 0.0],
            refresh_ms: FRAME_STEP_MS,
            bars: Vec::new(),
            frame: 0,
            published: 0,
        }
    }

    pub fn refresh_ms(&self) -> u32 {
        self.refresh_ms
    }

    pub fn value(&self, series: &str) -> Option<f64> {
        self.bars
            .iter()
            .find(|bar| bar.series == series)
            .map(|bar| bar.value)
    }

    /// Snapshots published so far.
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl Module for BarChart {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn initialize(&mut self, title: &str, config: &ConfigMap) -> Result<(), ModuleError> {
        self.range = read_range(config)?;
        let refresh = keys::require_i64(config, "refresh-rate")?;
        self.refresh_ms = u32::try_from(refresh)
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| ConfigKeyError::Invalid {
                key: "refresh-rate".to_string(),
                expected: "a positive number of milliseconds",
            })?;
        self.bars = keys::require_string_list(config, "series-names")?
            .into_iter()
            .map(|series| SeriesValue { series, value: 0.0 })
            .collect();
        self.title = title.to_string();
        Ok(())
    }

    fn update(&mut self) -> Result<(), ModuleError> {
        let mut values = Vec::with_capacity(self.vars.len());
        for (name, value) in &self.vars {
            let index = self
                .bars
                .iter()
                .position(|bar| &bar.series == name)
                .ok_or_else(|| ModuleError::UnknownSeries(name.clone()))?;
            values.push((index, number(name, value)?));
        }
        for (index, value) in values {
            self.bars[index].value = value;
        }

        self.frame = self.frame.wrapping_add(FRAME_STEP_MS);
        if self.frame % self.refresh_ms == 0 {
            self.published += 1;
            self.target.publish(Snapshot::BarChart {
                title: self.title.clone(),
                range: self.range,
                bars: self.bars.clone(),
            });
        }
        Ok(())
    }

    fn vars(&self) -> &VarMap {
        &self.vars
    }

    fn replace_vars(&mut self, vars: VarMap) {
        self.vars = vars;
    }
}
