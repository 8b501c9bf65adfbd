//! Vector and matrix primitives shared by the transforms.
//!
//! Every function that produces a new vector or matrix takes an optional output buffer. A
//! buffer of the right shape is reused in place, anything else is dropped and a fresh one is
//! allocated. Inputs are only ever read through views.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip, linalg};

/// A dense vector of reals.
pub type Vector = Array1<f64>;

/// A dense matrix of reals, rows indexed by output and columns by input.
pub type Matrix = Array2<f64>;

fn vector_buffer(out: Option<Vector>, len: usize) -> Vector {
    match out {
        Some(buf) if buf.len() == len => buf,
        _ => Array1::zeros(len),
    }
}

fn matrix_buffer(out: Option<Matrix>, dim: (usize, usize)) -> Matrix {
    match out {
        Some(buf) if buf.dim() == dim => buf,
        _ => Array2::zeros(dim),
    }
}

/// Builds a vector of `len` elements out of a seed function over the index.
pub fn vector<F>(len: usize, seed: F) -> Vector
where
    F: FnMut(usize) -> f64,
{
    Array1::from_shape_fn(len, seed)
}

/// Builds a `rows` x `cols` matrix out of a seed function over `(row, col)`.
pub fn matrix<F>(rows: usize, cols: usize, mut seed: F) -> Matrix
where
    F: FnMut(usize, usize) -> f64,
{
    Array2::from_shape_fn((rows, cols), |(i, j)| seed(i, j))
}

/// Maps every element of `row` along with its index.
pub fn map_row<F>(row: ArrayView1<f64>, mut f: F, out: Option<Vector>) -> Vector
where
    F: FnMut(f64, usize) -> f64,
{
    let mut out = vector_buffer(out, row.len());
    Zip::indexed(&mut out)
        .and(&row)
        .for_each(|i, o, &x| *o = f(x, i));

    out
}

/// Zips two rows of equal length element by element.
///
/// # Panics
/// If `a` and `b` differ in length.
pub fn row_zip<F>(a: ArrayView1<f64>, b: ArrayView1<f64>, mut f: F, out: Option<Vector>) -> Vector
where
    F: FnMut(f64, f64, usize) -> f64,
{
    let mut out = vector_buffer(out, a.len());
    Zip::indexed(&mut out)
        .and(&a)
        .and(&b)
        .for_each(|i, o, &x, &y| *o = f(x, y, i));

    out
}

/// The dot product of two rows.
pub fn dot(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.dot(&b)
}

/// Computes `mat · v`, a vector with one element per row of `mat`.
pub fn mat_mul_vec(mat: ArrayView2<f64>, v: ArrayView1<f64>, out: Option<Vector>) -> Vector {
    let mut out = vector_buffer(out, mat.nrows());
    linalg::general_mat_vec_mul(1.0, &mat, &v, 0.0, &mut out);
    out
}

/// Computes `matᵗ · v`, a vector with one element per column of `mat`.
pub fn vec_mul_mat(v: ArrayView1<f64>, mat: ArrayView2<f64>, out: Option<Vector>) -> Vector {
    let mut out = vector_buffer(out, mat.ncols());
    linalg::general_mat_vec_mul(1.0, &mat.t(), &v, 0.0, &mut out);
    out
}

/// Computes the outer product `col ⊗ row`.
pub fn outer(col: ArrayView1<f64>, row: ArrayView1<f64>, out: Option<Matrix>) -> Matrix {
    let mut out = matrix_buffer(out, (col.len(), row.len()));
    out.fill(0.0);
    add_outer(1.0, col, row, &mut out);
    out
}

/// Accumulates `scale · (col ⊗ row)` into `acc`.
pub fn add_outer(scale: f64, col: ArrayView1<f64>, row: ArrayView1<f64>, acc: &mut Matrix) {
    linalg::general_mat_mul(
        scale,
        &col.insert_axis(Axis(1)),
        &row.insert_axis(Axis(0)),
        1.0,
        acc,
    );
}

/// Element-wise sum of two matrices of the same shape.
pub fn mat_add_mat(a: ArrayView2<f64>, b: ArrayView2<f64>, out: Option<Matrix>) -> Matrix {
    let mut out = matrix_buffer(out, a.dim());
    Zip::from(&mut out)
        .and(&a)
        .and(&b)
        .for_each(|o, &x, &y| *o = x + y);

    out
}

/// Multiplies every element of `mat` by `scalar`.
pub fn scale_mat(scalar: f64, mat: ArrayView2<f64>, out: Option<Matrix>) -> Matrix {
    let mut out = matrix_buffer(out, mat.dim());
    Zip::from(&mut out)
        .and(&mat)
        .for_each(|o, &x| *o = scalar * x);

    out
}

/// Maps every item to a vector and concatenates the results in order.
///
/// # Returns
/// The concatenation, or the first error returned by `f`.
pub fn flat_map<I, F, E>(items: I, mut f: F) -> Result<Vector, E>
where
    I: IntoIterator,
    F: FnMut(I::Item, usize) -> Result<Vector, E>,
{
    let mut parts = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| f(item, i))
        .collect::<Result<Vec<_>, E>>()?;

    if parts.len() == 1 {
        if let Some(only) = parts.pop() {
            return Ok(only);
        }
    }

    let len = parts.iter().map(|part| part.len()).sum();
    let mut out = Vec::with_capacity(len);
    for part in &parts {
        out.extend(part.iter().copied());
    }

    Ok(Array1::from_vec(out))
}

/// Inclusive prefix scan: the i-th element is `agg` applied to the (i-1)-th element (or `seed`)
/// and the i-th item.
pub fn scan<T, S, F>(items: &[T], seed: S, mut agg: F) -> Vec<S>
where
    F: FnMut(&S, &T, usize) -> S,
{
    let mut out: Vec<S> = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let next = match out.last() {
            Some(prev) => agg(prev, item, i),
            None => agg(&seed, item, i),
        };
        out.push(next);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::convert::Infallible;

    #[test]
    fn seeds_build_by_index() {
        assert_eq!(vector(3, |i| i as f64), array![0., 1., 2.]);
        assert_eq!(
            matrix(2, 3, |i, j| (10 * i + j) as f64),
            array![[0., 1., 2.], [10., 11., 12.]]
        );
    }

    #[test]
    fn map_and_zip_reuse_matching_buffers() {
        let row = array![1., 2., 3.];
        let buf = Array1::zeros(3);
        let ptr = buf.as_ptr();

        let mapped = map_row(row.view(), |x, i| x * i as f64, Some(buf));
        assert_eq!(mapped, array![0., 2., 6.]);
        assert_eq!(mapped.as_ptr(), ptr);

        let zipped = row_zip(row.view(), mapped.view(), |a, b, _| a + b, None);
        assert_eq!(zipped, array![1., 4., 9.]);

        let wrong_size = Array1::zeros(5);
        assert_eq!(map_row(row.view(), |x, _| x, Some(wrong_size)).len(), 3);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let mat = array![[1., 2.], [3., 4.]];
        let v = array![1., 1.];

        let _ = mat_mul_vec(mat.view(), v.view(), None);
        let _ = scale_mat(3., mat.view(), None);

        assert_eq!(mat, array![[1., 2.], [3., 4.]]);
        assert_eq!(v, array![1., 1.]);
    }

    #[test]
    fn products() {
        let mat = array![[1., 2., 3.], [4., 5., 6.]];

        assert_eq!(dot(array![1., 2.].view(), array![3., 4.].view()), 11.);
        assert_eq!(
            mat_mul_vec(mat.view(), array![1., 0., 1.].view(), None),
            array![4., 10.]
        );
        assert_eq!(
            vec_mul_mat(array![1., 1.].view(), mat.view(), None),
            array![5., 7., 9.]
        );
        assert_eq!(
            outer(array![1., 2.].view(), array![3., 4., 5.].view(), None),
            array![[3., 4., 5.], [6., 8., 10.]]
        );
    }

    #[test]
    fn add_outer_accumulates() {
        let mut acc = array![[1., 1.], [1., 1.]];
        add_outer(2., array![1., 2.].view(), array![1., 0.].view(), &mut acc);
        assert_eq!(acc, array![[3., 1.], [5., 1.]]);
    }

    #[test]
    fn matrix_arithmetic() {
        let a = array![[1., 2.], [3., 4.]];
        let b = array![[1., 1.], [1., 1.]];

        let sum = mat_add_mat(a.view(), b.view(), None);
        assert_eq!(sum, array![[2., 3.], [4., 5.]]);
        assert_eq!(
            scale_mat(0.5, sum.view(), Some(sum.clone())),
            array![[1., 1.5], [2., 2.5]]
        );
    }

    #[test]
    fn flat_map_concatenates_in_order() {
        let parts = [array![1.], array![2., 3.], array![]];
        let flat = flat_map(parts.iter(), |p, _| Ok::<_, Infallible>(p.clone())).unwrap();
        assert_eq!(flat, array![1., 2., 3.]);

        let failed = flat_map([1, 2], |x, _| if x == 2 { Err("boom") } else { Ok(array![1.]) });
        assert_eq!(failed, Err("boom"));
    }

    #[test]
    fn scan_is_an_inclusive_prefix() {
        assert_eq!(scan(&[2, 3, 4], 0, |acc, x, _| acc + x), vec![2, 5, 9]);
        assert!(scan(&[] as &[usize], 7, |acc, x, _| acc + x).is_empty());
    }
}
