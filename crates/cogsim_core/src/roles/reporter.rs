use crate::agent::StepContext;
use crate::geometry::Point2D;
use crate::sensing::{Sense, Sensor};

/// A lone sensing probe. Senses once per step and keeps only the latest
/// reading; used to build labelled traces of honest and adversarial
/// observations.
#[derive(Debug, Clone)]
pub struct Reporter {
    sensor: Sensor,
    last_report: Option<f64>,
}

impl Reporter {
    pub fn new(sensor: Sensor) -> Self {
        Self {
            sensor,
            last_report: None,
        }
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn last_report(&self) -> Option<f64> {
        self.last_report
    }

    pub(crate) fn step(&mut self, position: Point2D, ctx: &mut StepContext<'_>) {
        if ctx.pass_index() != 0 {
            return;
        }
        let view = ctx.band();
        self.last_report = Some(self.sensor.sense(position, view, ctx.rng()));
    }
}
