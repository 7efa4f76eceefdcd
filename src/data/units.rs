use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::SpectralMap;
use crate::error::{invalid, ProcessResult};
use crate::log::reproducibility::ReproLog;
use crate::pipeline::ops::ProcessingOp;

/// Unit of the spectral (x) axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AxisUnit {
    /// Raman shift in 1/cm relative to the excitation line
    RamanShift,
    /// Absolute wavelength in nm
    Wavelength,
    /// Absolute wavenumber in 1/cm
    Wavenumber,
    Other(String),
}

impl std::fmt::Display for AxisUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisUnit::RamanShift => write!(f, "rel. 1/cm"),
            AxisUnit::Wavelength => write!(f, "nm"),
            AxisUnit::Wavenumber => write!(f, "1/cm"),
            AxisUnit::Other(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for AxisUnit {
    type Err = std::convert::Infallible;

    /// Parse the free-form unit label found in instrument containers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Ok(match norm.as_str() {
            "rel.1/cm" | "rel1/cm" | "ramanshift" | "shift" | "cm-1" | "cm^-1" | "rcm-1" => {
                AxisUnit::RamanShift
            }
            "nm" | "nanometer" | "nanometers" => AxisUnit::Wavelength,
            "1/cm" | "abs.1/cm" | "wavenumber" => AxisUnit::Wavenumber,
            _ => AxisUnit::Other(s.to_string()),
        })
    }
}

/// Convert an absolute wavelength (nm) to Raman shift (1/cm) for the given
/// excitation wavelength (nm).
pub fn wavelength_to_shift(wavelength_nm: f64, excitation_nm: f64) -> f64 {
    1e7 / excitation_nm - 1e7 / wavelength_nm
}

/// Convert an absolute wavenumber (1/cm) to Raman shift (1/cm).
pub fn wavenumber_to_shift(wavenumber: f64, excitation_nm: f64) -> f64 {
    1e7 / excitation_nm - wavenumber
}

/// Re-express the map's x-axis as Raman shift for the given excitation
/// wavelength. The axis is kept ascending; when the conversion reverses it,
/// the spectral dimension of the data is reversed with it.
pub fn convert_to_shift(
    map: &mut SpectralMap,
    excitation_nm: f64,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    if !(excitation_nm > 0.0) {
        return invalid(format!("excitation wavelength must be positive, got {}", excitation_nm));
    }
    let convert: fn(f64, f64) -> f64 = match map.unit() {
        AxisUnit::RamanShift => {
            log::debug!("Axis already in Raman shift; nothing to convert");
            return Ok(());
        }
        AxisUnit::Wavelength => wavelength_to_shift,
        AxisUnit::Wavenumber => wavenumber_to_shift,
        AxisUnit::Other(u) => {
            return invalid(format!("cannot convert axis unit '{}' to Raman shift", u));
        }
    };
    let from = map.unit().clone();
    let shifted: Array1<f64> = map.x_axis().mapv(|v| convert(v, excitation_nm));
    let descending = shifted.len() > 1 && shifted[0] > shifted[shifted.len() - 1];
    let (data, axis) = if descending {
        (
            map.data().slice(s![.., .., ..;-1]).to_owned(),
            shifted.slice(s![..;-1]).to_owned(),
        )
    } else {
        (map.data().clone(), shifted)
    };
    map.replace(data, axis)?;
    map.set_unit(AxisUnit::RamanShift);

    log.add_entry(
        &ProcessingOp::ConvertToShift { excitation_nm },
        &format!(
            "Converted x-axis from {} to {} at {} nm excitation{}",
            from,
            AxisUnit::RamanShift,
            excitation_nm,
            if descending { " (axis reversed)" } else { "" }
        ),
    );
    Ok(())
}
