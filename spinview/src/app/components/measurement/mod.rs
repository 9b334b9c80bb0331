mod ui;

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Arc,
    },
    thread::JoinHandle,
};

use app_core::{
    backend::{BackendEventLoop, BackendLink},
    frontend::UIParameter,
};

use crate::app::DynRequestSender;
use crate::backend_state::{
    instrument::{CwParameters, ExperimentKind},
    measurement::RunKind,
    BackendAppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunChoice {
    Simple,
    GoalSnr,
    Timed,
}

/// Panel driving the spectrometer: experiment setup, sweep parameters and
/// the acquisition runs executed on the backend worker.
pub struct MeasurementPanel {
    experiment: ExperimentKind,
    params: CwParameters,
    run_choice: RunChoice,
    goal_snr_entry: String,
    hours_entry: String,
    minutes_entry: String,
    save_folder_entry: String,
    save_name_entry: String,
    temperature_entry: String,
    status: UIParameter<String>,
    connected: UIParameter<bool>,
    stop_flag: Arc<AtomicBool>,
    awaiting_save_folder_selection: Option<JoinHandle<Option<PathBuf>>>,
}

impl MeasurementPanel {
    pub fn new(save_path: &std::path::Path) -> Self {
        Self {
            experiment: ExperimentKind::ContinuousWave,
            params: CwParameters::default(),
            run_choice: RunChoice::Simple,
            goal_snr_entry: String::new(),
            hours_entry: String::new(),
            minutes_entry: String::new(),
            save_folder_entry: save_path.to_string_lossy().into_owned(),
            save_name_entry: String::new(),
            temperature_entry: String::new(),
            status: UIParameter::new("idle".to_string()),
            connected: UIParameter::new(false),
            stop_flag: Arc::new(AtomicBool::new(false)),
            awaiting_save_folder_selection: None,
        }
    }

    pub fn try_update(&mut self) -> bool {
        if let Some(handle) = self
            .awaiting_save_folder_selection
            .take_if(|handle| handle.is_finished())
        {
            log::debug!("receiving new save folder");
            match handle.join() {
                Ok(Some(path)) => self.save_folder_entry = path.to_string_lossy().into_owned(),
                Ok(None) => (),
                Err(err) => log::error!("Unable to set new save folder: {:?}", err),
            }
        }
        self.status.try_update() || self.connected.try_update()
    }

    pub fn is_running(&self) -> bool {
        !self.status.is_up_to_date()
    }

    fn request_connect(&mut self, connect: bool, request_tx: &mut DynRequestSender) {
        let description = if connect {
            "connect instrument"
        } else {
            "disconnect instrument"
        };
        BackendLink::request_parameter_update(
            &mut self.connected,
            description,
            move |b: &mut BackendEventLoop<BackendAppState>| {
                if connect {
                    if let Err(err) = b.state.instrument.connect() {
                        log::error!("could not connect to instrument: {}", err);
                    }
                } else {
                    b.state.instrument.disconnect();
                }
                b.state.instrument.is_connected()
            },
            request_tx,
        );
    }

    /// Push the experiment selection and sweep parameters to the
    /// instrument.
    fn request_send_to_spectrometer(&mut self, request_tx: &mut DynRequestSender) {
        let kind = self.experiment;
        let params = self.params.clone();
        BackendLink::request_parameter_update(
            &mut self.status,
            "send experiment to spectrometer",
            move |b: &mut BackendEventLoop<BackendAppState>| {
                let sent = b
                    .state
                    .instrument
                    .create_experiment(kind)
                    .and_then(|_| b.state.instrument.set_cw_parameters(&params));
                match sent {
                    Ok(_) => format!("experiment '{}' sent to spectrometer", kind.label()),
                    Err(err) => {
                        log::error!("could not send experiment: {}", err);
                        format!("sending experiment failed: {}", err)
                    }
                }
            },
            request_tx,
        );
    }

    /// Validate the entries and dispatch the measurement run to the
    /// backend worker. Invalid user input is logged and the run is not
    /// started.
    fn request_run(&mut self, request_tx: &mut DynRequestSender) {
        let folder = PathBuf::from(self.save_folder_entry.trim());
        let name = self.save_name_entry.trim().to_owned();
        if folder.as_os_str().is_empty() || name.is_empty() {
            log::error!("please select a save folder and a dataset name");
            return;
        }
        if !folder.is_dir() {
            log::error!("save folder {:?} does not exist", folder);
            return;
        }

        let kind = match self.run_choice {
            RunChoice::Simple => RunKind::Simple,
            RunChoice::GoalSnr => {
                let Ok(goal) = self.goal_snr_entry.trim().parse::<f64>() else {
                    log::error!("goal SNR entry must be a number");
                    return;
                };
                RunKind::GoalSnr(goal)
            }
            RunChoice::Timed => {
                let (Ok(hours), Ok(minutes)) = (
                    self.hours_entry.trim().parse::<u64>(),
                    self.minutes_entry.trim().parse::<u64>(),
                ) else {
                    log::error!("time duration entries must be integers");
                    return;
                };
                RunKind::Timed { hours, minutes }
            }
        };

        let temperature_after = match self.temperature_entry.trim() {
            "" => None,
            entry => match entry.parse::<f64>() {
                Ok(kelvin) => Some(kelvin),
                Err(_) => {
                    log::error!("temperature entry must be a number");
                    return;
                }
            },
        };

        self.stop_flag.store(false, SeqCst);
        let stop = self.stop_flag.clone();
        log::info!("starting measurement '{}'", name);
        BackendLink::request_parameter_update(
            &mut self.status,
            "run measurement",
            move |b: &mut BackendEventLoop<BackendAppState>| {
                let outcome = b
                    .state
                    .run_measurement(kind, &folder, &name, stop.clone());
                let status = match outcome {
                    Ok(outcome) => outcome.describe(),
                    Err(err) => {
                        log::error!("measurement failed: {}", err);
                        format!("measurement failed: {}", err)
                    }
                };
                if let Some(kelvin) = temperature_after {
                    if let Err(err) = b.state.instrument.set_temperature(kelvin) {
                        log::error!("could not set temperature: {}", err);
                    } else {
                        log::info!("temperature set to {} K", kelvin);
                    }
                }
                status
            },
            request_tx,
        );
    }

    /// Ask the running acquisition loop to stop after the current scan.
    fn request_stop_measurement(&self) {
        log::info!("stop of running measurement requested");
        self.stop_flag.store(true, SeqCst);
    }
}
