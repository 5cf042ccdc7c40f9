use ndarray::Array2;

/// Variance of the 4-neighbour Laplacian of `gray`.
///
/// Kernel `[[0, 1, 0], [1, -4, 1], [0, 1, 0]]` with reflect-101 borders
/// (`dcb|abcd|cba`), variance taken over every pixel. Higher means more
/// high-frequency detail. Empty input yields 0.0.
pub fn laplacian_variance(gray: &Array2<f64>) -> f64 {
    let (h, w) = gray.dim();
    if h == 0 || w == 0 {
        return 0.0;
    }

    let response = Array2::from_shape_fn((h, w), |(y, x)| {
        let (y, x) = (y as isize, x as isize);
        let at = |dy: isize, dx: isize| gray[[reflect_101(y + dy, h), reflect_101(x + dx, w)]];
        at(-1, 0) + at(1, 0) + at(0, -1) + at(0, 1) - 4.0 * at(0, 0)
    });

    response.var(0.0)
}

/// Mirrors an out-of-range index without repeating the edge sample.
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mirrored = if i < 0 {
        -i
    } else if i > last {
        2 * last - i
    } else {
        i
    };
    mirrored.clamp(0, last) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rstest::rstest;

    #[test]
    fn test_flat_image_has_zero_variance() {
        let gray = Array2::from_elem((8, 8), 128.0);
        assert_relative_eq!(laplacian_variance(&gray), 0.0);
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(laplacian_variance(&Array2::zeros((0, 4))), 0.0);
    }

    #[test]
    fn test_single_bright_pixel() {
        // Center: -4·9 = -36, four neighbours: +9 each, rest 0
        let mut gray = Array2::zeros((5, 5));
        gray[[2, 2]] = 9.0;
        let n = 25.0;
        let mean = (-36.0 + 4.0 * 9.0) / n;
        let expected = ((-36.0f64).powi(2) + 4.0 * 81.0) / n - mean * mean;
        assert_relative_eq!(laplacian_variance(&gray), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_border_reflects_without_edge_repeat() {
        // Row [0, 10, 0]: left border of x=0 reflects to x=1
        let gray = array![[0.0, 10.0, 0.0]];
        // Responses per pixel (vertical terms cancel on a 1-row image):
        // x0: 10 + 10 - 0 = 20, x1: 0 + 0 - 20 = -20, x2: 20
        let mean: f64 = 20.0 / 3.0;
        let expected = (3.0 * 400.0) / 3.0 - mean * mean;
        assert_relative_eq!(laplacian_variance(&gray), expected, epsilon = 1e-9);
    }

    #[rstest]
    #[case(-1, 5, 1)]
    #[case(0, 5, 0)]
    #[case(5, 5, 3)]
    #[case(-1, 1, 0)]
    fn test_reflect_101(#[case] i: isize, #[case] len: usize, #[case] expected: usize) {
        assert_eq!(reflect_101(i, len), expected);
    }

    #[test]
    fn test_checkerboard_sharper_than_gradient() {
        let checker = Array2::from_shape_fn((16, 16), |(y, x)| ((x + y) % 2) as f64 * 255.0);
        let gradient = Array2::from_shape_fn((16, 16), |(_, x)| x as f64 * 16.0);
        assert!(laplacian_variance(&checker) > laplacian_variance(&gradient));
    }
}
