// every integration test binary compiles this module, but not every binary
// uses every helper
#![allow(dead_code)]

// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

use pbcstat::Complex;

// based on numpy!
// https://numpy.org/doc/stable/reference/generated/numpy.isclose.html
pub fn isclose(actual: f64, ref_val: f64, rtol: f64, atol: f64) -> bool {
    let actual_nan = actual.is_nan();
    let ref_nan = ref_val.is_nan();
    if actual_nan || ref_nan {
        actual_nan && ref_nan
    } else {
        (actual - ref_val).abs() <= (atol + rtol * ref_val.abs())
    }
}

pub fn assert_allclose(actual: &[f64], expected: &[f64], rtol: f64, atol: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "the lengths of actual and expected are unequal"
    );
    for (i, (&actual_val, &ref_val)) in actual.iter().zip(expected).enumerate() {
        assert!(
            isclose(actual_val, ref_val, rtol, atol),
            "element {i} isn't to within rtol={rtol}, atol={atol}\
            \n  actual   = {actual_val}\
            \n  expected = {ref_val}",
        );
    }
}

pub fn assert_complex_allclose(
    actual: &[Complex<f64>],
    expected: &[Complex<f64>],
    rtol: f64,
    atol: f64,
) {
    let split = |vals: &[Complex<f64>]| -> (Vec<f64>, Vec<f64>) {
        (vals.iter().map(|c| c.re).collect(), vals.iter().map(|c| c.im).collect())
    };
    let (actual_re, actual_im) = split(actual);
    let (expected_re, expected_im) = split(expected);
    assert_allclose(&actual_re, &expected_re, rtol, atol);
    assert_allclose(&actual_im, &expected_im, rtol, atol);
}
