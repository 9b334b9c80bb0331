//! The boundary to the vendor automation API. Everything the viewer needs
//! from the spectrometer goes through the [`Instrument`] trait; the
//! [`DummyInstrument`] stands in when no hardware is attached.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::data::ScanData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentKind {
    ContinuousWave,
    Transient,
    Pulse,
}

impl ExperimentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ExperimentKind::ContinuousWave => "Continuous Wave",
            ExperimentKind::Transient => "Transient",
            ExperimentKind::Pulse => "Pulse",
        }
    }

    pub fn all() -> [ExperimentKind; 3] {
        [
            ExperimentKind::ContinuousWave,
            ExperimentKind::Transient,
            ExperimentKind::Pulse,
        ]
    }
}

/// Sweep parameters of a continuous-wave experiment, in instrument units
/// (field in Gauss, frequencies in kHz, times in ms).
#[derive(Debug, Clone, PartialEq)]
pub struct CwParameters {
    pub field_center: f64,
    pub field_sweep: f64,
    pub field_points: usize,
    pub mw_attenuation: f64,
    pub mod_frequency: f64,
    pub mod_amplitude: f64,
    pub mod_phase: f64,
    pub harmonic: u8,
    pub receiver_gain: f64,
    pub conversion_time: f64,
}

impl Default for CwParameters {
    fn default() -> Self {
        Self {
            field_center: 3350.0,
            field_sweep: 100.0,
            field_points: 1001,
            mw_attenuation: 60.0,
            mod_frequency: 100.0,
            mod_amplitude: 1.0,
            mod_phase: 0.0,
            harmonic: 1,
            receiver_gain: 60.0,
            conversion_time: 5.12,
        }
    }
}

/// Field axis expressed as start/stop/step instead of center/sweep/points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSteps {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

/// Convert a center/sweep/points parametrization into start/stop/step.
pub fn field_steps_from_range(
    center: f64,
    sweep: f64,
    points: usize,
) -> Result<FieldSteps, String> {
    if center < 0.0 || sweep <= 0.0 {
        return Err("field center and sweep width must be positive".into());
    }
    if points < 2 {
        return Err("field axis needs at least two points".into());
    }
    let start = center - sweep / 2.0;
    let stop = center + sweep / 2.0;
    let step = (stop - start) / (points - 1) as f64;
    Ok(FieldSteps { start, stop, step })
}

/// Convert start/stop/step into center/sweep/points. An inconsistent stop
/// value is corrected up to the next whole number of steps.
pub fn field_range_from_steps(
    start: f64,
    stop: f64,
    step: f64,
) -> Result<(f64, f64, usize), String> {
    if start < 0.0 || step <= 0.0 {
        return Err("field start must be positive and step nonzero".into());
    }
    let stop = if stop <= start {
        start + step
    } else {
        stop + (stop - start).rem_euclid(step)
    };
    let center = (stop + start) / 2.0;
    let sweep = stop - start;
    let points = ((stop - start) / step).round() as usize + 1;
    Ok((center, sweep, points))
}

/// Operations the viewer invokes on the spectrometer. Implementations run
/// on the backend worker thread only.
pub trait Instrument: Send {
    fn is_connected(&self) -> bool;
    fn connect(&mut self) -> Result<(), String>;
    fn disconnect(&mut self);
    fn create_experiment(&mut self, kind: ExperimentKind) -> Result<(), String>;
    fn set_cw_parameters(&mut self, params: &CwParameters) -> Result<(), String>;
    fn cw_parameters(&self) -> CwParameters;
    /// Run one scan to completion and return its data.
    fn run_scan(&mut self) -> Result<ScanData, String>;
    fn set_temperature(&mut self, kelvin: f64) -> Result<(), String>;
}

const DUMMY_MW_FREQUENCY: f64 = 9.6e9;
const DUMMY_MW_POWER: f64 = 2e-4;

/// Software stand-in for the spectrometer: synthesizes a first-derivative
/// Lorentzian line at the center of the sweep, with gaussian noise on top.
pub struct DummyInstrument {
    connected: bool,
    experiment: Option<ExperimentKind>,
    params: CwParameters,
    rng: StdRng,
    noise_level: f64,
}

impl DummyInstrument {
    pub fn new() -> Self {
        Self {
            connected: false,
            experiment: None,
            params: CwParameters::default(),
            rng: StdRng::seed_from_u64(0x5eed),
            noise_level: 0.02,
        }
    }

    fn ensure_connected(&self) -> Result<(), String> {
        if self.connected {
            Ok(())
        } else {
            Err("instrument is not connected".into())
        }
    }
}

impl Default for DummyInstrument {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrument for DummyInstrument {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), String> {
        self.connected = true;
        log::info!("dummy instrument connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        log::info!("dummy instrument disconnected");
    }

    fn create_experiment(&mut self, kind: ExperimentKind) -> Result<(), String> {
        self.ensure_connected()?;
        self.experiment = Some(kind);
        log::info!("created experiment '{}'", kind.label());
        Ok(())
    }

    fn set_cw_parameters(&mut self, params: &CwParameters) -> Result<(), String> {
        self.ensure_connected()?;
        field_steps_from_range(params.field_center, params.field_sweep, params.field_points)?;
        self.params = params.clone();
        Ok(())
    }

    fn cw_parameters(&self) -> CwParameters {
        self.params.clone()
    }

    fn run_scan(&mut self) -> Result<ScanData, String> {
        self.ensure_connected()?;
        if self.experiment.is_none() {
            return Err("no experiment created".into());
        }
        let FieldSteps { start, step, .. } = field_steps_from_range(
            self.params.field_center,
            self.params.field_sweep,
            self.params.field_points,
        )?;
        let center = self.params.field_center;
        let linewidth = self.params.field_sweep / 20.0;
        let abscissa: Vec<f64> = (0..self.params.field_points)
            .map(|i| start + step * i as f64)
            .collect();
        let values: Vec<f64> = abscissa
            .iter()
            .map(|b| {
                let delta = (b - center) / linewidth;
                // First derivative of a Lorentzian absorption line.
                let line = -2.0 * delta / (1.0 + delta * delta).powi(2);
                line + self.rng.gen_range(-1.0..1.0) * self.noise_level
            })
            .collect();
        Ok(ScanData {
            abscissa,
            values,
            mw_frequency: DUMMY_MW_FREQUENCY,
            mw_power: DUMMY_MW_POWER,
        })
    }

    fn set_temperature(&mut self, kelvin: f64) -> Result<(), String> {
        self.ensure_connected()?;
        log::info!("dummy instrument temperature set to {} K", kelvin);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_conversions_round_trip() {
        let steps = field_steps_from_range(3350.0, 100.0, 1001).unwrap();
        assert_eq!(steps.start, 3300.0);
        assert_eq!(steps.stop, 3400.0);
        assert!((steps.step - 0.1).abs() < 1e-12);

        let (center, sweep, points) =
            field_range_from_steps(steps.start, steps.stop, steps.step).unwrap();
        assert_eq!(center, 3350.0);
        assert_eq!(sweep, 100.0);
        assert_eq!(points, 1001);
    }

    #[test]
    fn test_inconsistent_stop_is_corrected() {
        // stop below start collapses to a single step
        let (_, sweep, points) = field_range_from_steps(3400.0, 3300.0, 1.0).unwrap();
        assert_eq!(sweep, 1.0);
        assert_eq!(points, 2);
    }

    #[test]
    fn test_dummy_scan_matches_parameters() {
        let mut instr = DummyInstrument::new();
        instr.connect().unwrap();
        instr
            .create_experiment(ExperimentKind::ContinuousWave)
            .unwrap();
        let scan = instr.run_scan().unwrap();
        assert_eq!(scan.abscissa.len(), scan.values.len());
        assert_eq!(scan.abscissa.len(), 1001);
        assert_eq!(scan.abscissa[0], 3300.0);
    }

    #[test]
    fn test_scan_requires_connection_and_experiment() {
        let mut instr = DummyInstrument::new();
        assert!(instr.run_scan().is_err());
        instr.connect().unwrap();
        assert!(instr.run_scan().is_err());
    }
}
