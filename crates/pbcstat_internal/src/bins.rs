/// Maps a distance onto the index of the histogram bin that holds it
pub trait BinEdges {
    /// Returns `None` when `value` lies outside of the binned range
    fn bin_index(&self, value: f64) -> Option<usize>;

    /// The number of bins
    fn n_bins(&self) -> usize;
}

/// Equal-width bins that start at `min`
///
/// The right edge of the last bin is excluded, i.e. the bins cover
/// `[min, min + n_bins * bin_width)`.
#[derive(Clone, Copy, Debug)]
pub struct RegularBinEdges {
    min: f64,
    bin_width: f64,
    n_bins: usize,
}

impl RegularBinEdges {
    /// Builds `n_bins` bins of width `bin_width`, starting at `min`
    pub fn from_width(min: f64, bin_width: f64, n_bins: usize) -> Result<Self, &'static str> {
        if n_bins == 0 {
            Err("n_bins must be positive")
        } else if !min.is_finite() || !bin_width.is_finite() {
            Err("min and bin_width must be finite")
        } else if bin_width <= 0.0 {
            Err("bin_width must be positive")
        } else {
            Ok(Self {
                min,
                bin_width,
                n_bins,
            })
        }
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// The left and right edges of the `i`th bin
    pub fn bin_bounds(&self, i: usize) -> (f64, f64) {
        let left = self.min + (i as f64) * self.bin_width;
        (left, left + self.bin_width)
    }
}

impl PartialEq for RegularBinEdges {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.bin_width == other.bin_width && self.n_bins == other.n_bins
    }
}

impl BinEdges for RegularBinEdges {
    fn bin_index(&self, value: f64) -> Option<usize> {
        // the negated comparison also rejects NaN
        if !(value >= self.min) {
            return None;
        }

        // the cast truncates, which is floor for non-negative operands
        let index = ((value - self.min) / self.bin_width) as usize;
        (index < self.n_bins).then_some(index)
    }

    fn n_bins(&self) -> usize {
        self.n_bins
    }
}
