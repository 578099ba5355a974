use super::linalg::{axpy_into, inf_norm};
use super::options::BackTracking;

/// Minimiser of the quadratic through `phi(0)`, `phi'(0)` and `phi(alpha)`.
fn quadratic_step(alpha: f64, phi: f64, phi0: f64, dphi0: f64) -> Option<f64> {
    let denom = 2.0 * (phi - phi0 - dphi0 * alpha);
    if !denom.is_finite() || denom == 0.0 {
        return None;
    }
    Some(-(dphi0 * alpha * alpha) / denom).filter(|v| v.is_finite())
}

/// Minimiser of the cubic through the two most recent trial points.
fn cubic_step(alpha1: f64, phi1: f64, alpha2: f64, phi2: f64, phi0: f64, dphi0: f64) -> Option<f64> {
    let d1 = phi1 - phi0 - dphi0 * alpha1;
    let d2 = phi2 - phi0 - dphi0 * alpha2;
    let denom = alpha1 * alpha1 * alpha2 * alpha2 * (alpha2 - alpha1);
    if !denom.is_finite() || denom == 0.0 {
        return None;
    }
    let a = (alpha1 * alpha1 * d2 - alpha2 * alpha2 * d1) / denom;
    let b = (-alpha1.powi(3) * d2 + alpha2.powi(3) * d1) / denom;
    if !a.is_finite() || !b.is_finite() {
        return None;
    }

    let out = if a.abs() <= f64::EPSILON {
        -dphi0 / (2.0 * b)
    } else {
        let disc = (b * b - 3.0 * a * dphi0).max(0.0);
        (-b + disc.sqrt()) / (3.0 * a)
    };
    Some(out).filter(|v| v.is_finite())
}

/// Starting point, direction and the 1-D restriction `phi(alpha) = f(x + alpha s)` at 0.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LineSearchInput<'a> {
    pub x: &'a [f64],
    pub s: &'a [f64],
    pub alpha0: f64,
    pub phi0: f64,
    pub dphi0: f64,
}

impl BackTracking {
    /// Armijo backtracking with quadratic/cubic interpolation. Writes the
    /// accepted point into `x_new` and returns `(alpha, phi(alpha))`.
    pub(crate) fn search(
        &self,
        input: LineSearchInput<'_>,
        x_new: &mut [f64],
        phi_at: &mut impl FnMut(&[f64]) -> Option<f64>,
    ) -> Option<(f64, f64)> {
        let LineSearchInput {
            x,
            s,
            alpha0,
            phi0,
            dphi0,
        } = input;
        if !alpha0.is_finite() || alpha0 <= 0.0 {
            return None;
        }

        let mut alpha = alpha0;
        if self.maxstep.is_finite() {
            let step_norm = inf_norm(s);
            if step_norm > 0.0 {
                alpha = alpha.min(self.maxstep / step_norm);
            }
        }

        // Halve until the trial point is finite; one halving per mantissa bit at most.
        let max_halvings = f64::MANTISSA_DIGITS as usize;
        let mut phi_alpha = None;
        for _ in 0..max_halvings {
            axpy_into(x_new, x, alpha, s);
            phi_alpha = phi_at(x_new).filter(|v| v.is_finite());
            if phi_alpha.is_some() {
                break;
            }
            alpha *= 0.5;
        }
        let mut phi_alpha = phi_alpha?;

        let armijo = |a: f64| phi0 + self.c1 * a * dphi0;
        let mut prev: Option<(f64, f64)> = None;

        for _ in 0..self.iterations {
            if phi_alpha <= armijo(alpha) {
                return Some((alpha, phi_alpha));
            }

            let trial = match prev {
                Some((alpha_prev, phi_prev)) if self.order >= 3 => {
                    cubic_step(alpha, phi_alpha, alpha_prev, phi_prev, phi0, dphi0)
                }
                _ => quadratic_step(alpha, phi_alpha, phi0, dphi0),
            };
            let next = trial
                .unwrap_or(alpha * 0.5)
                .clamp(self.rho_lo * alpha, self.rho_hi * alpha);

            prev = Some((alpha, phi_alpha));
            alpha = next;
            if !alpha.is_finite() || alpha <= 0.0 {
                return None;
            }

            axpy_into(x_new, x, alpha, s);
            phi_alpha = phi_at(x_new).filter(|v| v.is_finite())?;
        }

        None
    }
}
