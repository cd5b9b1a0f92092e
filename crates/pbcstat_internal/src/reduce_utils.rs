// basic utilities used in reductions. The executors in the public crate lean
// on these, so they are all public

use crate::reducer::Reducer;
use crate::state::StatePackViewMut;

pub fn reset_full_statepack(reducer: &impl Reducer, statepack: &mut StatePackViewMut) {
    for i in 0..statepack.n_states() {
        reducer.init_accum_state(&mut statepack.get_state_mut(i));
    }
}

// ideally, other would be more clearly immutable, but I don't think we want to
// introduce another type just for this 1 case
pub fn merge_full_statepacks(
    reducer: &impl Reducer,
    statepack: &mut StatePackViewMut,
    other: &StatePackViewMut,
) -> Result<(), &'static str> {
    if statepack.n_states() != other.n_states() {
        return Err("statepacks hold a different number of states");
    } else if statepack.state_size() != other.state_size() {
        return Err("statepacks hold states of different sizes");
    }
    for i in 0..statepack.n_states() {
        reducer.merge(&mut statepack.get_state_mut(i), &other.get_state(i));
    }
    Ok(())
}

/// Consolidates the statepacks so that `statepacks[0]` holds the combined
/// result. The other entries are left in an undetermined state.
///
/// The merge follows a balanced binary tree over the slice index: at stride
/// `s` (1, 2, 4, ...) entry `i` absorbs entry `i + s` for every `i` that is a
/// multiple of `2s`. The order of floating-point additions therefore depends
/// only on `statepacks.len()`, and any length is accepted.
pub fn tree_merge_statepacks(
    reducer: &impl Reducer,
    statepacks: &mut [StatePackViewMut],
) -> Result<(), &'static str> {
    let n = statepacks.len();
    let mut stride = 1;
    while stride < n {
        let mut i = 0;
        while i + stride < n {
            let (head, tail) = statepacks.split_at_mut(i + stride);
            merge_full_statepacks(reducer, &mut head[i], &tail[0])?;
            i += 2 * stride;
        }
        stride *= 2;
    }
    Ok(())
}
