//! Long-running acquisition loops. These run as single requests on the
//! backend worker thread; the UI stays responsive and signals a stop via
//! a shared flag that is checked once per scan.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Arc,
    },
    time::{Duration, Instant},
};

use app_core::string_error::ErrorStringExt;

use crate::math::{self, NoiseMode};

use super::{data::ScanData, BackendAppState};

const BASELINE_FRACTION: f64 = 0.15;
const BASELINE_ORDER: usize = 1;

/// What kind of acquisition run was requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunKind {
    /// A single scan.
    Simple,
    /// Repeat scans until the projected signal-to-noise ratio is reached.
    GoalSnr(f64),
    /// Repeat scans until the deadline.
    Timed { hours: u64, minutes: u64 },
}

#[derive(Debug, Clone)]
pub struct MeasurementOutcome {
    pub scans_run: usize,
    pub saved_to: PathBuf,
    pub stopped_early: bool,
}

impl MeasurementOutcome {
    pub fn describe(&self) -> String {
        let early = if self.stopped_early { " (stopped early)" } else { "" };
        format!(
            "ran {} scan(s), saved to {:?}{}",
            self.scans_run, self.saved_to, early
        )
    }
}

impl BackendAppState {
    /// Run an acquisition according to `kind`, saving every scan under
    /// `folder` with `name` plus a running suffix. `stop` is polled once
    /// per scan and consumed when set.
    pub fn run_measurement(
        &mut self,
        kind: RunKind,
        folder: &Path,
        name: &str,
        stop: Arc<AtomicBool>,
    ) -> Result<MeasurementOutcome, String> {
        match kind {
            RunKind::Simple => {
                let scan = self.instrument.run_scan()?;
                let path = folder.join(name);
                save_scan(&path, name, &scan)?;
                Ok(MeasurementOutcome {
                    scans_run: 1,
                    saved_to: folder.to_owned(),
                    stopped_early: false,
                })
            }
            RunKind::GoalSnr(goal) => self.run_goal_snr(goal, folder, name, stop),
            RunKind::Timed { hours, minutes } => {
                let deadline =
                    Instant::now() + Duration::from_secs(hours * 3600 + minutes * 60);
                self.run_timed(deadline, folder, name, stop)
            }
        }
    }

    fn run_goal_snr(
        &mut self,
        goal_snr: f64,
        folder: &Path,
        name: &str,
        stop: Arc<AtomicBool>,
    ) -> Result<MeasurementOutcome, String> {
        let save_folder = folder.join(name);
        fs::create_dir(&save_folder).err_to_string("could not create save folder")?;

        // First scan establishes the per-scan signal-to-noise ratio.
        let scan = self.instrument.run_scan()?;
        save_scan(&scan_path(&save_folder, name, 1), name, &scan)?;

        let region = math::baseline_region(&scan.abscissa, BASELINE_FRACTION);
        let (corrected, _) = math::correct_baseline(&scan.values, BASELINE_ORDER, &region)?;
        let Some(snr) = math::calculate_snr(&corrected, &region, NoiseMode::StdDev) else {
            return Err("could not determine signal-to-noise ratio of first scan".into());
        };

        // Averaging n scans improves the ratio by sqrt(n).
        let n_scans = ((goal_snr / snr.snr).powi(2)).ceil().max(1.0) as usize;
        log::info!(
            "first scan SNR {:.1} (signal {:.3}, noise {:.3}), projecting {} scan(s) for goal {:.1}",
            snr.snr,
            snr.signal_level,
            snr.noise_level,
            n_scans,
            goal_snr
        );

        let mut scans_run = 1;
        let mut stopped_early = false;
        for i_scan in 2..=n_scans {
            if stop.swap(false, SeqCst) {
                stopped_early = true;
                break;
            }
            let scan = self.instrument.run_scan()?;
            save_scan(&scan_path(&save_folder, name, i_scan), name, &scan)?;
            scans_run += 1;
        }
        Ok(MeasurementOutcome {
            scans_run,
            saved_to: save_folder,
            stopped_early,
        })
    }

    fn run_timed(
        &mut self,
        deadline: Instant,
        folder: &Path,
        name: &str,
        stop: Arc<AtomicBool>,
    ) -> Result<MeasurementOutcome, String> {
        let save_folder = folder.join(name);
        fs::create_dir(&save_folder).err_to_string("could not create save folder")?;

        let mut scans_run = 0;
        let mut stopped_early = false;
        while Instant::now() < deadline {
            if stop.swap(false, SeqCst) {
                stopped_early = true;
                break;
            }
            let scan = self.instrument.run_scan()?;
            scans_run += 1;
            save_scan(&scan_path(&save_folder, name, scans_run), name, &scan)?;
        }
        Ok(MeasurementOutcome {
            scans_run,
            saved_to: save_folder,
            stopped_early,
        })
    }
}

fn scan_path(folder: &Path, name: &str, index: usize) -> PathBuf {
    folder.join(format!("{}-{:05}", name, index))
}

/// Write a scan as a BES3T descriptor/data pair so it can be reloaded by
/// the viewer.
fn save_scan(path_stem: &Path, title: &str, scan: &ScanData) -> Result<(), String> {
    let points = scan.abscissa.len();
    if points < 2 || scan.values.len() != points {
        return Err("scan data is empty or inconsistent, not saving".into());
    }
    let x_min = scan.abscissa[0];
    let x_width = scan.abscissa[points - 1] - x_min;

    let descriptor = format!(
        "#DESC	1.2 * DESCRIPTOR INFORMATION ***********************\n\
         DSRC	EXP\n\
         BSEQ	BIG\n\
         IKKF	REAL\n\
         XTYP	IDX\n\
         YTYP	NODATA\n\
         IRFMT	D\n\
         XPTS	{points}\n\
         XMIN	{x_min:.6}\n\
         XWID	{x_width:.6}\n\
         TITL	'{title}'\n\
         XNAM	'Field'\n\
         XUNI	'G'\n\
         MWFQ	{mwfq:e}\n\
         MWPW	{mwpw:e}\n",
        points = points,
        x_min = x_min,
        x_width = x_width,
        title = title,
        mwfq = scan.mw_frequency,
        mwpw = scan.mw_power,
    );
    let data: Vec<u8> = scan
        .values
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect();

    fs::write(path_stem.with_extension("DSC"), descriptor)
        .err_to_string("could not write descriptor file")?;
    fs::write(path_stem.with_extension("DTA"), data)
        .err_to_string("could not write data file")?;
    log::debug!("saved scan to {:?}", path_stem);
    Ok(())
}
