pub(crate) fn inf_norm(v: &[f64]) -> f64 {
    v.iter().copied().map(f64::abs).fold(0.0, |a, b| a.max(b))
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `out = x + alpha * s`
pub(crate) fn axpy_into(out: &mut [f64], x: &[f64], alpha: f64, s: &[f64]) {
    for ((o, &xi), &si) in out.iter_mut().zip(x).zip(s) {
        *o = xi + alpha * si;
    }
}

/// Row-major `n x n` matrix times vector.
pub(crate) fn matvec(out: &mut [f64], a: &[f64], x: &[f64]) {
    let n = x.len();
    debug_assert_eq!(a.len(), n * n);
    debug_assert_eq!(out.len(), n);
    for (o, row) in out.iter_mut().zip(a.chunks_exact(n)) {
        *o = dot(row, x);
    }
}

pub(crate) fn set_identity(a: &mut [f64], n: usize) {
    a.fill(0.0);
    for i in 0..n {
        a[i * n + i] = 1.0;
    }
}
