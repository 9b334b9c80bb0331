#![warn(clippy::all, rust_2018_idioms)]

//! Parser for Bruker BES3T spectrometer files.
//!
//! A dataset on disk is a pair of files sharing one stem: the `.DSC`
//! descriptor (plain text, key/value lines) and the `.DTA` ordinate
//! (raw binary, layout and number format given by the descriptor).
//! Two-dimensional acquisitions (field × time transients) may carry a
//! `.YGA` companion holding the second abscissa.

use app_core::string_error::ErrorStringExt;
use std::{
    fs,
    path::{Path, PathBuf},
};

const DESCRIPTOR_EXTENSION: &str = "DSC";
const DATA_EXTENSION: &str = "DTA";
const SECOND_ABSCISSA_EXTENSION: &str = "YGA";

/// Number format of the values stored in the `.DTA` file, from the
/// descriptor's `IRFMT` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueFormat {
    Float64,
    Float32,
    Int32,
    Int16,
    Int8,
}

impl ValueFormat {
    fn size_bytes(self) -> usize {
        use ValueFormat as V;
        match self {
            V::Float64 => 8,
            V::Float32 => 4,
            V::Int32 => 4,
            V::Int16 => 2,
            V::Int8 => 1,
        }
    }
}

impl TryFrom<&str> for ValueFormat {
    type Error = String;

    fn try_from(code: &str) -> Result<Self, String> {
        use ValueFormat as V;
        match code {
            "D" => Ok(V::Float64),
            "F" => Ok(V::Float32),
            "I" => Ok(V::Int32),
            "S" => Ok(V::Int16),
            "C" => Ok(V::Int8),
            other => Err(format!("unsupported IRFMT code '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

/// The parsed `.DSC` key/value section, reduced to the keys the viewer
/// needs.
#[derive(Debug)]
struct Descriptor {
    title: String,
    x_points: usize,
    x_min: f64,
    x_width: f64,
    y_points: usize,
    y_min: f64,
    y_width: f64,
    format: ValueFormat,
    byte_order: ByteOrder,
    x_name: String,
    x_unit: String,
    mw_frequency: Option<f64>,
    mw_power: Option<f64>,
}

impl Descriptor {
    fn parse(text: &str) -> Result<Self, String> {
        let mut title = String::new();
        let mut x_points = None;
        let mut x_min = None;
        let mut x_width = None;
        let mut y_points = 1_usize;
        let mut y_min = 0.0;
        let mut y_width = 0.0;
        let mut format = None;
        let mut byte_order = ByteOrder::Big;
        let mut complex = false;
        let mut x_name = String::new();
        let mut x_unit = String::new();
        let mut mw_frequency = None;
        let mut mw_power = None;

        for line in text.lines() {
            // Section headers start with '#', comments with '*'.
            if line.starts_with('#') || line.starts_with('*') || line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(|c: char| c.is_whitespace()) else {
                continue;
            };
            let value = value.trim().trim_matches('\'');
            match key {
                "TITL" => title = value.to_owned(),
                "XPTS" => {
                    x_points =
                        Some(value.parse().err_to_string("could not parse XPTS")?)
                }
                "XMIN" => x_min = Some(value.parse().err_to_string("could not parse XMIN")?),
                "XWID" => x_width = Some(value.parse().err_to_string("could not parse XWID")?),
                "YPTS" => y_points = value.parse().err_to_string("could not parse YPTS")?,
                "YMIN" => y_min = value.parse().err_to_string("could not parse YMIN")?,
                "YWID" => y_width = value.parse().err_to_string("could not parse YWID")?,
                "IRFMT" => format = Some(ValueFormat::try_from(value)?),
                "BSEQ" => {
                    byte_order = match value {
                        "BIG" => ByteOrder::Big,
                        "LIT" => ByteOrder::Little,
                        other => return Err(format!("unsupported BSEQ value '{}'", other)),
                    }
                }
                "IKKF" => complex = value != "REAL",
                "XNAM" => x_name = value.to_owned(),
                "XUNI" => x_unit = value.to_owned(),
                "MWFQ" => mw_frequency = value.parse().ok(),
                "MWPW" => mw_power = value.parse().ok(),
                _ => continue,
            }
        }

        let x_points = x_points.ok_or("descriptor is missing XPTS")?;
        let x_min = x_min.ok_or("descriptor is missing XMIN")?;
        let x_width = x_width.ok_or("descriptor is missing XWID")?;
        let format = format.ok_or("descriptor is missing IRFMT")?;

        if complex {
            return Err("complex ordinate data (IKKF != REAL) is not supported".into());
        }
        if x_points == 0 {
            return Err("descriptor declares zero abscissa points".into());
        }

        Ok(Descriptor {
            title,
            x_points,
            x_min,
            x_width,
            y_points: y_points.max(1),
            y_min,
            y_width,
            format,
            byte_order,
            x_name,
            x_unit,
            mw_frequency,
            mw_power,
        })
    }

    fn abscissa(&self) -> Vec<f64> {
        linspace(self.x_min, self.x_width, self.x_points)
    }
}

/// A fully loaded BES3T dataset.
#[derive(Debug, Clone)]
pub struct Bes3tData {
    pub title: String,
    /// First abscissa (field for sweeps, time for transients).
    pub abscissa: Vec<f64>,
    /// Second abscissa for 2D acquisitions, one value per ordinate row.
    pub second_abscissa: Option<Vec<f64>>,
    /// Ordinate values, one inner vector per second-abscissa step
    /// (a single row for ordinary sweeps).
    pub rows: Vec<Vec<f64>>,
    pub x_name: String,
    pub x_unit: String,
    pub mw_frequency: Option<f64>,
    pub mw_power: Option<f64>,
}

impl Bes3tData {
    /// Load the dataset identified by `path`, which may point at any of
    /// the files of the triple (`.DSC`, `.DTA` or `.YGA`).
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let descriptor_text = fs::read_to_string(sibling(path, DESCRIPTOR_EXTENSION))
            .err_to_string("unable to read descriptor file")?;
        let data_bytes = fs::read(sibling(path, DATA_EXTENSION))
            .err_to_string("unable to read data file")?;
        let second_abscissa_bytes = fs::read(sibling(path, SECOND_ABSCISSA_EXTENSION)).ok();
        Self::from_parts(
            &descriptor_text,
            &data_bytes,
            second_abscissa_bytes.as_deref(),
        )
    }

    /// Assemble a dataset from raw file contents. Split out from
    /// [`Bes3tData::from_path`] so parsing is testable without fixtures.
    fn from_parts(
        descriptor_text: &str,
        data_bytes: &[u8],
        second_abscissa_bytes: Option<&[u8]>,
    ) -> Result<Self, String> {
        let desc = Descriptor::parse(descriptor_text)?;

        let values = decode_values(data_bytes, desc.format, desc.byte_order)?;
        let expected = desc.x_points * desc.y_points;
        if values.len() != expected {
            return Err(format!(
                "data file holds {} values, descriptor declares {} ({} x {})",
                values.len(),
                expected,
                desc.x_points,
                desc.y_points
            ));
        }
        let rows: Vec<Vec<f64>> = values
            .chunks(desc.x_points)
            .map(|row| row.to_vec())
            .collect();

        let second_abscissa = if desc.y_points > 1 {
            let axis = match second_abscissa_bytes {
                Some(bytes) => {
                    let axis = decode_values(bytes, ValueFormat::Float64, desc.byte_order)?;
                    if axis.len() != desc.y_points {
                        return Err(format!(
                            "second abscissa file holds {} values, descriptor declares {}",
                            axis.len(),
                            desc.y_points
                        ));
                    }
                    axis
                }
                // No companion file: the descriptor's YMIN/YWID describe a
                // uniform axis.
                None => linspace(desc.y_min, desc.y_width, desc.y_points),
            };
            Some(axis)
        } else {
            None
        };

        Ok(Bes3tData {
            title: desc.title.clone(),
            abscissa: desc.abscissa(),
            second_abscissa,
            rows,
            x_name: desc.x_name,
            x_unit: desc.x_unit,
            mw_frequency: desc.mw_frequency,
            mw_power: desc.mw_power,
        })
    }

    pub fn is_two_dimensional(&self) -> bool {
        self.rows.len() > 1
    }
}

/// Check whether `path` carries one of the three extensions that identify
/// a BES3T dataset on disk.
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            [
                DESCRIPTOR_EXTENSION,
                DATA_EXTENSION,
                SECOND_ABSCISSA_EXTENSION,
            ]
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

fn linspace(min: f64, width: f64, points: usize) -> Vec<f64> {
    if points == 1 {
        return vec![min];
    }
    let step = width / (points - 1) as f64;
    (0..points).map(|i| min + step * i as f64).collect()
}

fn decode_values(
    bytes: &[u8],
    format: ValueFormat,
    byte_order: ByteOrder,
) -> Result<Vec<f64>, String> {
    let size = format.size_bytes();
    if bytes.len() % size != 0 {
        return Err(format!(
            "data length {} is not a multiple of the value size {}",
            bytes.len(),
            size
        ));
    }
    let decode = |chunk: &[u8]| -> f64 {
        use ValueFormat as V;
        match (format, byte_order) {
            (V::Float64, ByteOrder::Big) => f64::from_be_bytes(chunk.try_into().unwrap()),
            (V::Float64, ByteOrder::Little) => f64::from_le_bytes(chunk.try_into().unwrap()),
            (V::Float32, ByteOrder::Big) => f32::from_be_bytes(chunk.try_into().unwrap()) as f64,
            (V::Float32, ByteOrder::Little) => {
                f32::from_le_bytes(chunk.try_into().unwrap()) as f64
            }
            (V::Int32, ByteOrder::Big) => i32::from_be_bytes(chunk.try_into().unwrap()) as f64,
            (V::Int32, ByteOrder::Little) => i32::from_le_bytes(chunk.try_into().unwrap()) as f64,
            (V::Int16, ByteOrder::Big) => i16::from_be_bytes(chunk.try_into().unwrap()) as f64,
            (V::Int16, ByteOrder::Little) => i16::from_le_bytes(chunk.try_into().unwrap()) as f64,
            (V::Int8, _) => chunk[0] as i8 as f64,
        }
    };
    Ok(bytes.chunks_exact(size).map(decode).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep_descriptor() -> String {
        [
            "#DESC	1.2 * DESCRIPTOR INFORMATION ***********************",
            "*",
            "*	Dataset Type and Format:",
            "*",
            "DSRC	EXP",
            "BSEQ	BIG",
            "IKKF	REAL",
            "XTYP	IDX",
            "YTYP	NODATA",
            "IRFMT	D",
            "XPTS	5",
            "XMIN	3300.000000",
            "XWID	100.000000",
            "TITL	'Sample A'",
            "XNAM	'Field'",
            "XUNI	'G'",
            "MWFQ	9.6e9",
            "MWPW	2e-4",
        ]
        .join("\n")
    }

    fn encode_be(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn test_parse_sweep() {
        let ordinate = [1.0, 2.0, 3.0, 2.0, 1.0];
        let data = Bes3tData::from_parts(&sweep_descriptor(), &encode_be(&ordinate), None)
            .expect("sweep should parse");
        assert_eq!(data.title, "Sample A");
        assert_eq!(data.rows, vec![ordinate.to_vec()]);
        assert!(!data.is_two_dimensional());
        assert_eq!(data.abscissa.len(), 5);
        assert_eq!(data.abscissa[0], 3300.0);
        assert_eq!(data.abscissa[4], 3400.0);
        assert_eq!(data.mw_frequency, Some(9.6e9));
        assert_eq!(data.mw_power, Some(2e-4));
    }

    #[test]
    fn test_parse_transients_with_second_abscissa() {
        let mut descriptor = sweep_descriptor();
        descriptor.push_str("\nYPTS	2\nYMIN	0.0\nYWID	100.0");
        let ordinate = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let axis = encode_be(&[3300.0, 3400.0]);
        let data = Bes3tData::from_parts(&descriptor, &encode_be(&ordinate), Some(axis.as_slice()))
            .expect("transients should parse");
        assert!(data.is_two_dimensional());
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[1], vec![5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(data.second_abscissa, Some(vec![3300.0, 3400.0]));
    }

    #[test]
    fn test_value_count_mismatch_is_an_error() {
        let ordinate = [1.0, 2.0, 3.0];
        let res = Bes3tData::from_parts(&sweep_descriptor(), &encode_be(&ordinate), None);
        assert!(res.is_err());
    }

    #[test]
    fn test_complex_data_rejected() {
        let descriptor = sweep_descriptor().replace("IKKF	REAL", "IKKF	CPLX");
        let ordinate = encode_be(&[0.0; 5]);
        assert!(Bes3tData::from_parts(&descriptor, &ordinate, None).is_err());
    }

    #[test]
    fn test_little_endian_float32() {
        let descriptor = sweep_descriptor()
            .replace("BSEQ	BIG", "BSEQ	LIT")
            .replace("IRFMT	D", "IRFMT	F");
        let bytes: Vec<u8> = [1.0_f32, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let data = Bes3tData::from_parts(&descriptor, &bytes, None).expect("should parse");
        assert_eq!(data.rows[0], vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(has_supported_extension(Path::new("run-00001.DSC")));
        assert!(has_supported_extension(Path::new("run-00001.DTA")));
        assert!(has_supported_extension(Path::new("run-00001.yga")));
        assert!(!has_supported_extension(Path::new("run-00001.csv")));
        assert!(!has_supported_extension(Path::new("run-00001")));
    }
}
