// External crates
use bincode::config::{self, Configuration, Fixint, LittleEndian, NoLimit};
use bincode::error::DecodeError;
use log::{info, warn};
use polars::prelude::*;
use std::path::Path;

// Internal modules
use crate::constants::STATE_FEATURES;
use crate::error::DatasetError;
use crate::lstm::step_1_tensor_preparation::StateVector;

const LENGTH_PREFIX_BYTES: usize = std::mem::size_of::<u64>();
const STATE_BYTES: usize = std::mem::size_of::<StateVector>();

/// Little-endian, fixed-width encoding: a `u64` length prefix followed by the
/// `f64` pairs.
fn codec() -> Configuration<LittleEndian, Fixint, NoLimit> {
    config::standard().with_fixed_int_encoding()
}

/// Read a trajectory, picking the reader from the file extension
///
/// `.csv` files go through polars; anything else is decoded as bincode.
pub fn read_trajectory(path: &Path) -> Result<Vec<StateVector>, DatasetError> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let trajectory = if is_csv {
        read_trajectory_csv(path)?
    } else {
        read_trajectory_bin(path)?
    };
    info!(
        "Loaded trajectory with {} states from {}",
        trajectory.len(),
        path.display()
    );
    Ok(trajectory)
}

// The decoder reserves the declared length up front, so a prefix larger than
// the payload must be rejected before decoding.
fn check_length_prefix(bytes: &[u8]) -> Result<(), DecodeError> {
    let Some(prefix) = bytes.get(..LENGTH_PREFIX_BYTES) else {
        return Ok(());
    };
    let mut raw = [0u8; LENGTH_PREFIX_BYTES];
    raw.copy_from_slice(prefix);
    let declared = u64::from_le_bytes(raw);

    let payload = bytes.len() - LENGTH_PREFIX_BYTES;
    let available = (payload / STATE_BYTES) as u64;
    if declared > available {
        let needed = usize::try_from(declared)
            .ok()
            .and_then(|n| n.checked_mul(STATE_BYTES))
            .unwrap_or(usize::MAX);
        return Err(DecodeError::UnexpectedEnd {
            additional: needed - payload,
        });
    }
    Ok(())
}

/// Decode a bincode trajectory file
pub fn read_trajectory_bin(path: &Path) -> Result<Vec<StateVector>, DatasetError> {
    let bytes = std::fs::read(path)?;
    check_length_prefix(&bytes)?;
    let (trajectory, consumed): (Vec<StateVector>, usize) =
        bincode::decode_from_slice(&bytes, codec())?;
    if consumed != bytes.len() {
        warn!(
            "Ignoring {} trailing bytes in {}",
            bytes.len() - consumed,
            path.display()
        );
    }
    Ok(trajectory)
}

/// Encode a trajectory in the format `read_trajectory_bin` expects
pub fn write_trajectory_bin(
    path: &Path,
    trajectory: &[StateVector],
) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = bincode::encode_to_vec(trajectory, codec())?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Read a trajectory from a CSV file with predator and prey columns
///
/// Column names are matched case-insensitively and a few common aliases are
/// accepted.
pub fn read_trajectory_csv(path: &Path) -> Result<Vec<StateVector>, DatasetError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let mut rename_columns = Vec::new();
    for column_name in df.get_column_names() {
        let col_lower = column_name.to_lowercase();
        let standard_name = match col_lower.as_str() {
            "predator" | "predators" | "x" | "x1" => "predator",
            "prey" | "y" | "x2" => "prey",
            _ => continue,
        };
        if column_name.as_str() != standard_name {
            rename_columns.push((column_name.to_string(), standard_name.to_string()));
        }
    }

    if !rename_columns.is_empty() {
        let mut lazy_df = df.clone().lazy();
        for (old_name, new_name) in rename_columns {
            lazy_df = lazy_df.with_column(col(old_name.as_str()).alias(new_name.as_str()));
        }
        df = lazy_df.collect()?;
    }

    let mut columns = Vec::with_capacity(STATE_FEATURES.len());
    for name in STATE_FEATURES {
        let values = df
            .column(name)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    PolarsError::ComputeError(
                        format!("missing {} value at row {}", name, row).into(),
                    )
                })
            })
            .collect::<PolarsResult<Vec<f64>>>()?;
        columns.push(values);
    }

    Ok(columns[0]
        .iter()
        .zip(columns[1].iter())
        .map(|(predator, prey)| [*predator, *prey])
        .collect())
}
