use crate::document::{ConfigMap, VarMap};
use crate::error::ModuleError;
use crate::module::{Module, RenderTarget, Snapshot};

use super::number;

/// Robot pose on the field: `x`, `y` and `heading` every update.
pub struct Odometry {
    target: RenderTarget,
    vars: VarMap,
    pose: Option<(f64, f64, f64)>,
}

impl Odometry {
    pub const TAG: &'static str = "odometry";

    pub fn new(target: RenderTarget) -> Self {
        Self {
            target,
            vars: VarMap::new(),
            pose: None,
        }
    }

    /// Last `(x, y, heading)` received.
    pub fn pose(&self) -> Option<(f64, f64, f64)> {
        self.pose
    }

    fn read(&self, name: &str) -> Result<f64, ModuleError> {
        let value = self
            .vars
            .get(name)
            .ok_or_else(|| ModuleError::MissingVariable(name.to_string()))?;
        number(name, value)
    }
}

impl Module for Odometry {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn initialize(&mut self, _title: &str, _config: &ConfigMap) -> Result<(), ModuleError> {
        Ok(())
    }

    fn update(&mut self) -> Result<(), ModuleError> {
        let x = self.read("x")?;
        let y = self.read("y")?;
        let heading = self.read("heading")?;
        self.pose = Some((x, y, heading));

        self.target.publish(Snapshot::Odometry {
            x: round1(x),
            y: round1(y),
            heading: round1(heading),
        });
        Ok(())
    }

    fn vars(&self) -> &VarMap {
        &self.vars
    }

    fn replace_vars(&mut self, vars: VarMap) {
        self.vars = vars;
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
