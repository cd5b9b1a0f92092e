use ndarray::{Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2, Axis};

/// A read-only view of a single bin's accumulator state
pub struct AccumStateView<'a> {
    data: ArrayView1<'a, f64>,
}

impl<'a> AccumStateView<'a> {
    pub fn from_array_view(data: ArrayView1<'a, f64>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, i: usize) -> f64 {
        self.data[i]
    }
}

/// A mutable view of a single bin's accumulator state
pub struct AccumStateViewMut<'a> {
    data: ArrayViewMut1<'a, f64>,
}

impl<'a> AccumStateViewMut<'a> {
    pub fn from_array_view(data: ArrayViewMut1<'a, f64>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, i: usize) -> f64 {
        self.data[i]
    }

    pub fn set(&mut self, i: usize, value: f64) {
        self.data[i] = value;
    }

    pub fn add(&mut self, i: usize, value: f64) {
        self.data[i] += value;
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }
}

/// Represents a collection of accumulator states, one per bin
///
/// The underlying buffer has shape `(accum_state_size, n_states)`, so each
/// column holds the state of one bin.
pub struct StatePackViewMut<'a> {
    data: ArrayViewMut2<'a, f64>,
}

impl<'a> StatePackViewMut<'a> {
    pub fn from_array_view(data: ArrayViewMut2<'a, f64>) -> Self {
        Self { data }
    }

    pub fn get_state(&self, i: usize) -> AccumStateView<'_> {
        AccumStateView::from_array_view(self.data.index_axis(Axis(1), i))
    }

    pub fn get_state_mut(&mut self, i: usize) -> AccumStateViewMut<'_> {
        AccumStateViewMut::from_array_view(self.data.index_axis_mut(Axis(1), i))
    }

    pub fn state_size(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn n_states(&self) -> usize {
        self.data.len_of(Axis(1))
    }
}

/// Allocates a zero-filled buffer with the layout expected by
/// [`StatePackViewMut`]
pub fn alloc_statepack_buf(accum_state_size: usize, n_states: usize) -> Array2<f64> {
    Array2::zeros((accum_state_size, n_states))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statepack_columns_are_states() {
        let mut buf = alloc_statepack_buf(3, 4);
        let mut statepack = StatePackViewMut::from_array_view(buf.view_mut());
        assert_eq!(statepack.state_size(), 3);
        assert_eq!(statepack.n_states(), 4);

        statepack.get_state_mut(2).set(1, 7.0);
        statepack.get_state_mut(2).add(1, 1.5);
        assert_eq!(statepack.get_state(2).get(1), 8.5);
        assert_eq!(buf[[1, 2]], 8.5);
    }
}
