//! Built-in headless module types.
//!
//! These track the state a chart or field view would draw and publish it as
//! [`Snapshot`](crate::module::Snapshot)s. Drawing itself happens elsewhere.

mod barchart;
mod linechart;
mod odometry;

pub use barchart::BarChart;
pub use linechart::LineChart;
pub use odometry::Odometry;

use serde_json::Value;

use crate::document::ConfigMap;
use crate::error::{ConfigKeyError, ModuleError};
use crate::keys;

/// Simulated time each update represents, in milliseconds.
pub const FRAME_STEP_MS: u32 = 20;

/// `min-range` and `max-range`, shared by the chart types.
fn read_range(config: &ConfigMap) -> Result<[f64; 2], ConfigKeyError> {
    let min = keys::require_i64(config, "min-range")?;
    let max = keys::require_i64(config, "max-range")?;
    if min > max {
        return Err(ConfigKeyError::Invalid {
            key: "max-range".to_string(),
            expected: "at least min-range",
        });
    }
    Ok([min as f64, max as f64])
}

fn number(name: &str, value: &Value) -> Result<f64, ModuleError> {
    keys::as_f64(value).ok_or_else(|| ModuleError::NotANumber(name.to_string()))
}
