use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identifies one loaded dataset for the lifetime of the session.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct DatasetId(pub(crate) usize);

/// Ordinate values of a dataset: a single sweep or a stack of transient
/// traces recorded at the steps of a second abscissa.
#[derive(Debug, Clone)]
pub enum Ordinate {
    Sweep(Vec<f64>),
    Transients {
        second_abscissa: Vec<f64>,
        rows: Vec<Vec<f64>>,
    },
}

impl Ordinate {
    /// The sweep values, if this is 1D data.
    pub fn sweep(&self) -> Option<&[f64]> {
        match self {
            Ordinate::Sweep(values) => Some(values),
            Ordinate::Transients { .. } => None,
        }
    }
}

/// Result of the polynomial baseline correction, attached to a dataset
/// once the user requests it.
#[derive(Debug, Clone)]
pub enum Correction {
    Raw,
    WithBaseline {
        corrected: Vec<f64>,
        baseline: Vec<f64>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DatasetMeta {
    pub title: String,
    pub mw_frequency: Option<f64>,
    pub mw_power: Option<f64>,
}

/// One loaded instrument dataset. Immutable after parsing, except for the
/// correction attached by the baseline operation.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    pub abscissa: Vec<f64>,
    pub ordinate: Ordinate,
    pub meta: DatasetMeta,
    pub correction: Correction,
}

impl Dataset {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let parsed = bes3t_parser::Bes3tData::from_path(path)?;
        Ok(Self::from_parsed(path.to_owned(), parsed))
    }

    fn from_parsed(path: PathBuf, parsed: bes3t_parser::Bes3tData) -> Self {
        let title = if parsed.title.is_empty() {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("untitled")
                .to_owned()
        } else {
            parsed.title.clone()
        };
        let ordinate = match (parsed.second_abscissa, parsed.rows.len()) {
            (Some(second_abscissa), n) if n > 1 => Ordinate::Transients {
                second_abscissa,
                rows: parsed.rows,
            },
            (_, _) => Ordinate::Sweep(parsed.rows.into_iter().next().unwrap_or_default()),
        };
        Dataset {
            path,
            abscissa: parsed.abscissa,
            ordinate,
            meta: DatasetMeta {
                title,
                mw_frequency: parsed.mw_frequency,
                mw_power: parsed.mw_power,
            },
            correction: Correction::Raw,
        }
    }

    /// Points for plotting the raw curve. Transients are reduced to the
    /// field sweep at their strongest time position.
    pub fn raw_points(&self) -> Vec<[f64; 2]> {
        match &self.ordinate {
            Ordinate::Sweep(values) => zip_points(&self.abscissa, values),
            Ordinate::Transients {
                second_abscissa,
                rows,
            } => match crate::math::transient_peak_slice(rows) {
                Some(slice) => zip_points(second_abscissa, &slice),
                None => Vec::new(),
            },
        }
    }

    /// Points of the corrected curve and its baseline, once a correction
    /// is attached.
    pub fn corrected_points(&self) -> Option<(Vec<[f64; 2]>, Vec<[f64; 2]>)> {
        match &self.correction {
            Correction::Raw => None,
            Correction::WithBaseline {
                corrected,
                baseline,
            } => Some((
                zip_points(&self.abscissa, corrected),
                zip_points(&self.abscissa, baseline),
            )),
        }
    }
}

pub fn zip_points(x: &[f64], y: &[f64]) -> Vec<[f64; 2]> {
    x.iter().zip(y).map(|(x, y)| [*x, *y]).collect()
}

/// One scan as delivered by the instrument.
#[derive(Debug, Clone)]
pub struct ScanData {
    pub abscissa: Vec<f64>,
    pub values: Vec<f64>,
    pub mw_frequency: f64,
    pub mw_power: f64,
}
