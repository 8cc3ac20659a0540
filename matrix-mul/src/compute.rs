//! Local multiplication of a rank's rows.

use crate::matrix::Matrix;
use crate::partition::RowRange;

/// Writes `result[r][c] = Σ_k first[r][k] * second[k][c]` for every row
/// `r` in `range` and every column of `result`.
///
/// The sum always starts at zero and runs over `k` in increasing order, so
/// a row comes out bit-for-bit the same no matter which rank computes it.
/// Rows outside `range` are not touched. Dimensions are assumed conformant.
pub fn multiply_rows(first: &Matrix, second: &Matrix, result: &mut Matrix, range: RowRange) {
    let inner = second.rows();
    let cols = result.cols();
    let a = first.values();
    let b = second.values();
    let a_cols = first.cols();
    let c = result.values_mut();

    for row in range.rows() {
        for col in 0..cols {
            let mut sum = 0.0;
            for k in 0..inner {
                sum += a[row * a_cols + k] * b[k * cols + col];
            }
            c[row * cols + col] = sum;
        }
    }
}

/// Reference product over every row on a single rank.
pub fn multiply_sequential(first: &Matrix, second: &Matrix, result: &mut Matrix) {
    let range = RowRange {
        start: 0,
        end: result.rows(),
    };
    multiply_rows(first, second, result, range);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_by_three_times_three_by_two() {
        let a = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b = Matrix::from_vec(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let mut c = Matrix::zeros(2, 2);

        multiply_sequential(&a, &b, &mut c);
        assert_eq!(c.values(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn only_the_given_rows_are_written() {
        let a = Matrix::sequential(4, 2);
        let b = Matrix::sequential(2, 3);
        let mut c = Matrix::from_vec(4, 3, vec![-1.0; 12]).unwrap();

        multiply_rows(&a, &b, &mut c, RowRange { start: 1, end: 3 });

        assert_eq!(c.row(0), &[-1.0; 3]);
        assert_eq!(c.row(1), &[19.0, 26.0, 33.0]);
        assert_eq!(c.row(2), &[29.0, 40.0, 51.0]);
        assert_eq!(c.row(3), &[-1.0; 3]);
    }

    #[test]
    fn empty_range_is_a_no_op() {
        let a = Matrix::sequential(2, 2);
        let b = Matrix::sequential(2, 2);
        let mut c = Matrix::zeros(2, 2);

        multiply_rows(&a, &b, &mut c, RowRange { start: 2, end: 2 });
        assert_eq!(c, Matrix::zeros(2, 2));
    }

    #[test]
    fn identity_leaves_operand_unchanged() {
        let b = Matrix::sequential(4, 4);
        let mut c = Matrix::zeros(4, 4);
        multiply_sequential(&Matrix::identity(4), &b, &mut c);
        assert_eq!(c, b);
    }

    #[test]
    fn empty_inner_dimension_gives_zeros() {
        let a = Matrix::zeros(2, 0);
        let b = Matrix::zeros(0, 3);
        let mut c = Matrix::from_vec(2, 3, vec![5.0; 6]).unwrap();
        multiply_sequential(&a, &b, &mut c);
        assert_eq!(c, Matrix::zeros(2, 3));
    }
}
