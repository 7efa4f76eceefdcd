use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayViewMut3, Axis};
use std::path::PathBuf;

use super::units::AxisUnit;
use crate::error::{ProcessError, ProcessResult};
use crate::pipeline::spikes::SpikeInfo;
use crate::pipeline::water::WaterInfo;

/// One decomposition component: a spatial score map and its spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// `[row, col]` weights of this component
    pub map: Array2<f64>,
    /// Spectral loading, one value per x-axis point
    pub plot: Array1<f64>,
}

/// A point-scanned spectral map.
///
/// `data` is indexed `[row, col, bin]` and always has exactly `x_axis.len()`
/// bins. The struct owns the tensor; processing functions mutate it through
/// [`SpectralMap::modify`] or [`SpectralMap::replace`], which keep the axis in
/// lock-step and drop every cached derived value.
#[derive(Debug, Clone)]
pub struct SpectralMap {
    data: Array3<f64>,
    x_axis: Array1<f64>,
    unit: AxisUnit,
    /// File the map was loaded from (empty for synthetic maps)
    pub source_path: PathBuf,
    pub sample_name: String,
    components: Vec<Component>,
    maxima: Option<Array2<f64>>,
    averages: Option<Array2<f64>>,
    pub(crate) spike_info: Option<SpikeInfo>,
    pub(crate) water_info: Option<WaterInfo>,
}

impl SpectralMap {
    /// Build a map, failing fast when the axis does not match the spectral
    /// dimension or is not sorted ascending.
    pub fn new(data: Array3<f64>, x_axis: Array1<f64>, unit: AxisUnit) -> ProcessResult<Self> {
        check_shape(&data, &x_axis)?;
        Ok(Self {
            data,
            x_axis,
            unit,
            source_path: PathBuf::new(),
            sample_name: String::new(),
            components: Vec::new(),
            maxima: None,
            averages: None,
            spike_info: None,
            water_info: None,
        })
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn x_axis(&self) -> &Array1<f64> {
        &self.x_axis
    }

    pub fn unit(&self) -> &AxisUnit {
        &self.unit
    }

    /// `(rows, cols, bins)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn bins(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn pixel_count(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Spectrum of one pixel.
    pub fn spectrum(&self, row: usize, col: usize) -> ArrayView1<'_, f64> {
        self.data.slice(ndarray::s![row, col, ..])
    }

    /// Copy of the data as a `(pixels × bins)` matrix in row-major pixel order.
    pub fn flattened(&self) -> Array2<f64> {
        let (rows, cols, bins) = self.shape();
        let values: Vec<f64> = self.data.iter().copied().collect();
        Array2::from_shape_vec((rows * cols, bins), values)
            .unwrap_or_else(|_| Array2::zeros((rows * cols, bins)))
    }

    /// Per-pixel maximum over the spectral axis. Recomputed after any mutation.
    pub fn maxima(&mut self) -> &Array2<f64> {
        let data = &self.data;
        self.maxima.get_or_insert_with(|| {
            data.map_axis(Axis(2), |s| s.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        })
    }

    /// Per-pixel mean over the spectral axis. Recomputed after any mutation.
    pub fn averages(&mut self) -> &Array2<f64> {
        let data = &self.data;
        self.averages.get_or_insert_with(|| {
            data.map_axis(Axis(2), |s| {
                if s.is_empty() {
                    f64::NAN
                } else {
                    s.sum() / s.len() as f64
                }
            })
        })
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Replace the component list wholesale.
    pub(crate) fn set_components(&mut self, components: Vec<Component>) {
        self.components = components;
    }

    pub(crate) fn set_unit(&mut self, unit: AxisUnit) {
        self.unit = unit;
    }

    /// Mutate intensities in place. The shape cannot change through the view;
    /// cached views are invalidated afterwards.
    pub(crate) fn modify<R>(&mut self, f: impl FnOnce(ArrayViewMut3<f64>) -> R) -> R {
        let out = f(self.data.view_mut());
        self.invalidate();
        out
    }

    /// Swap in a new tensor and axis together. Components are cleared when the
    /// shape changes.
    pub(crate) fn replace(&mut self, data: Array3<f64>, x_axis: Array1<f64>) -> ProcessResult<()> {
        check_shape(&data, &x_axis)?;
        if data.dim() != self.data.dim() {
            self.components.clear();
        }
        self.data = data;
        self.x_axis = x_axis;
        self.invalidate();
        Ok(())
    }

    fn invalidate(&mut self) {
        self.maxima = None;
        self.averages = None;
        self.spike_info = None;
        self.water_info = None;
    }
}

fn check_shape(data: &Array3<f64>, x_axis: &Array1<f64>) -> ProcessResult<()> {
    let bins = data.len_of(Axis(2));
    if x_axis.len() != bins {
        return Err(ProcessError::ShapeMismatch {
            axis: x_axis.len(),
            bins,
        });
    }
    if x_axis.windows(2).into_iter().any(|w| w[1] < w[0]) {
        return Err(ProcessError::InvalidParameter(
            "x-axis must be sorted ascending".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn small_map() -> SpectralMap {
        let data = Array3::from_shape_fn((2, 3, 4), |(r, c, b)| (r * 100 + c * 10 + b) as f64);
        let x = Array1::from(vec![10.0, 20.0, 30.0, 40.0]);
        SpectralMap::new(data, x, AxisUnit::RamanShift).unwrap()
    }

    #[test]
    fn test_shape_mismatch_fails_fast() {
        let data = Array3::zeros((2, 2, 5));
        let x = Array1::from(vec![1.0, 2.0, 3.0]);
        match SpectralMap::new(data, x, AxisUnit::RamanShift) {
            Err(ProcessError::ShapeMismatch { axis, bins }) => {
                assert_eq!(axis, 3);
                assert_eq!(bins, 5);
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_descending_axis_rejected() {
        let data = Array3::zeros((1, 1, 3));
        let x = Array1::from(vec![3.0, 2.0, 1.0]);
        assert!(SpectralMap::new(data, x, AxisUnit::Wavelength).is_err());
    }

    #[test]
    fn test_derived_views() {
        let mut map = small_map();
        assert_eq!(map.maxima()[[1, 2]], 123.0);
        assert_abs_diff_eq!(map.averages()[[0, 1]], 11.5, epsilon = 1e-12);
    }

    #[test]
    fn test_modify_invalidates_cache() {
        let mut map = small_map();
        assert_eq!(map.maxima()[[0, 0]], 3.0);
        map.modify(|mut d| d[[0, 0, 1]] = 50.0);
        assert_eq!(map.maxima()[[0, 0]], 50.0);
    }

    #[test]
    fn test_replace_clears_components_on_shape_change() {
        let mut map = small_map();
        map.set_components(vec![Component {
            map: Array2::zeros((2, 3)),
            plot: Array1::zeros(4),
        }]);

        // Same shape keeps them
        let same = map.data().clone();
        let x = map.x_axis().clone();
        map.replace(same, x).unwrap();
        assert_eq!(map.components().len(), 1);

        let smaller = map.data().slice(ndarray::s![.., .., ..2]).to_owned();
        map.replace(smaller, Array1::from(vec![10.0, 20.0])).unwrap();
        assert!(map.components().is_empty());
        assert_eq!(map.bins(), map.x_axis().len());
    }

    #[test]
    fn test_replace_rejects_mismatch() {
        let mut map = small_map();
        let err = map.replace(Array3::zeros((2, 3, 2)), Array1::zeros(3));
        assert!(err.is_err());
        assert_eq!(map.bins(), 4);
    }

    #[test]
    fn test_flattened_order() {
        let map = small_map();
        let flat = map.flattened();
        assert_eq!(flat.dim(), (6, 4));
        // pixel (1, 0) is flat row 3
        assert_eq!(flat[[3, 2]], 102.0);
    }
}
