use super::line_search::LineSearchInput;
use super::linalg::{axpy_into, dot, inf_norm, matvec, set_identity};
use super::options::{BackTracking, EvalBudget, Objective, OptimOptions, Optimized};

/// Line-search objective that refuses to evaluate once the budget is spent.
fn budgeted<'a, O: Objective>(
    obj: &'a mut O,
    budget: &'a mut EvalBudget,
    opts: &'a OptimOptions,
) -> impl FnMut(&[f64]) -> Option<f64> + 'a {
    move |x_trial| {
        if budget.exhausted(opts) {
            return None;
        }
        obj.f_only(x_trial, budget).filter(|v| v.is_finite())
    }
}

/// Quasi-Newton descent with a dense inverse-Hessian estimate.
///
/// Returns `None` when the starting point is not finite. A failed line search
/// stops the run at the last accepted point.
pub(crate) fn bfgs_minimize(
    x0: &[f64],
    obj: &mut impl Objective,
    opts: OptimOptions,
    ls: BackTracking,
) -> Option<Optimized> {
    let n = x0.len();
    let mut budget = EvalBudget::default();

    let mut x = x0.to_vec();
    let mut x_ls = vec![0.0; n];
    let mut g = vec![0.0; n];
    let mut g_new = vec![0.0; n];
    let mut s = vec![0.0; n];
    let mut u = vec![0.0; n];
    let mut dx = vec![0.0; n];
    let mut dg = vec![0.0; n];
    let mut inv_h = vec![0.0; n * n];
    set_identity(&mut inv_h, n);

    let mut fx = obj.fg(&x, &mut g, &mut budget).filter(|v| v.is_finite())?;

    for _ in 0..opts.iterations {
        if budget.exhausted(&opts) {
            break;
        }
        let g_inf = inf_norm(&g);
        if !g_inf.is_finite() || g_inf <= opts.g_abstol {
            break;
        }

        matvec(&mut s, &inv_h, &g);
        s.iter_mut().for_each(|v| *v = -*v);
        let mut dphi0 = dot(&g, &s);
        if !dphi0.is_finite() || dphi0 >= 0.0 {
            // Lost positive definiteness: restart from steepest descent.
            set_identity(&mut inv_h, n);
            for (si, &gi) in s.iter_mut().zip(&g) {
                *si = -gi;
            }
            dphi0 = dot(&g, &s);
        }
        if !dphi0.is_finite() || dphi0 >= 0.0 {
            break;
        }

        let input = LineSearchInput {
            x: &x,
            s: &s,
            alpha0: 1.0,
            phi0: fx,
            dphi0,
        };
        let accepted = {
            let mut phi_at = budgeted(obj, &mut budget, &opts);
            ls.search(input, &mut x_ls, &mut phi_at)
        };
        if accepted.is_none() {
            break;
        }

        let Some(f_new) = obj.fg(&x_ls, &mut g_new, &mut budget).filter(|v| v.is_finite()) else {
            break;
        };

        axpy_into(&mut dx, &x_ls, -1.0, &x);
        axpy_into(&mut dg, &g_new, -1.0, &g);
        x.copy_from_slice(&x_ls);
        g.copy_from_slice(&g_new);
        fx = f_new;

        let dx_dg = dot(&dx, &dg);
        if dx_dg > 0.0 && dx_dg.is_finite() {
            matvec(&mut u, &inv_h, &dg);
            let dg_u = dot(&dg, &u);
            if dg_u.is_finite() {
                let c1 = (dx_dg + dg_u) / (dx_dg * dx_dg);
                let c2 = 1.0 / dx_dg;
                for (i, row) in inv_h.chunks_exact_mut(n).enumerate() {
                    for (j, h) in row.iter_mut().enumerate() {
                        *h += c1 * dx[i] * dx[j] - c2 * (u[i] * dx[j] + dx[i] * u[j]);
                    }
                }
            }
        }
    }

    Some(Optimized {
        params: x,
        value: fx,
        f_calls: budget.f_calls,
    })
}

/// Damped Newton iteration for one parameter, curvature from differenced gradients.
pub(crate) fn newton_1d_minimize(
    x0: f64,
    obj: &mut impl Objective,
    opts: OptimOptions,
    ls: BackTracking,
) -> Option<Optimized> {
    let mut budget = EvalBudget::default();
    let mut x = x0;
    let mut best = (x0, f64::INFINITY);
    let mut g_buf = [0.0f64];

    for _ in 0..opts.iterations {
        if budget.exhausted(&opts) {
            break;
        }
        let f = obj.fg(&[x], &mut g_buf, &mut budget)?;
        let g = g_buf[0];
        if !f.is_finite() || !g.is_finite() {
            break;
        }
        if f < best.1 {
            best = (x, f);
        }
        if g.abs() <= opts.g_abstol {
            break;
        }

        let eps = f64::EPSILON.sqrt() * (x.abs() + 1.0);
        obj.fg(&[x + eps], &mut g_buf, &mut budget)?;
        let g_plus = g_buf[0];
        obj.fg(&[x - eps], &mut g_buf, &mut budget)?;
        let g_minus = g_buf[0];
        let curvature = ((g_plus - g_minus) / (2.0 * eps)).abs();
        let curvature = if curvature.is_finite() { curvature.max(1e-12) } else { 1e-12 };

        let mut step = -g / curvature;
        if !(g * step).is_finite() || g * step >= 0.0 {
            step = -g;
        }
        let dphi0 = g * step;
        if !dphi0.is_finite() || dphi0 >= 0.0 {
            break;
        }

        let mut x_new = [x];
        let accepted = {
            let mut phi_at = budgeted(obj, &mut budget, &opts);
            ls.search(
                LineSearchInput {
                    x: &[x],
                    s: &[step],
                    alpha0: 1.0,
                    phi0: f,
                    dphi0,
                },
                &mut x_new,
                &mut phi_at,
            )
        };
        match accepted {
            Some((_, phi)) => {
                x = x_new[0];
                if phi < best.1 {
                    best = (x, phi);
                }
            }
            None => break,
        }
    }

    if !best.1.is_finite() {
        return None;
    }
    Some(Optimized {
        params: vec![best.0],
        value: best.1,
        f_calls: budget.f_calls,
    })
}
