use super::options::{EvalBudget, Objective};

/// Scalar objective with central-difference gradients.
pub(crate) struct FiniteDiff<'a> {
    f: &'a dyn Fn(&[f64]) -> f64,
    scratch: Vec<f64>,
}

impl<'a> FiniteDiff<'a> {
    pub fn new(f: &'a dyn Fn(&[f64]) -> f64) -> Self {
        Self { f, scratch: Vec::new() }
    }

    fn eval(&self, x: &[f64], budget: &mut EvalBudget) -> Option<f64> {
        budget.f_calls += 1;
        Some((self.f)(x)).filter(|v| v.is_finite())
    }
}

impl Objective for FiniteDiff<'_> {
    fn f_only(&mut self, x: &[f64], budget: &mut EvalBudget) -> Option<f64> {
        self.eval(x, budget)
    }

    fn fg(&mut self, x: &[f64], g_out: &mut [f64], budget: &mut EvalBudget) -> Option<f64> {
        let fx = self.eval(x, budget)?;
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.extend_from_slice(x);

        let mut ok = true;
        for (i, gi) in g_out.iter_mut().enumerate() {
            let xi = x[i];
            let h = f64::EPSILON.cbrt() * (xi.abs() + 1.0);
            scratch[i] = xi + h;
            let plus = self.eval(&scratch, budget);
            scratch[i] = xi - h;
            let minus = self.eval(&scratch, budget);
            scratch[i] = xi;
            match (plus, minus) {
                (Some(p), Some(m)) => *gi = (p - m) / (2.0 * h),
                _ => {
                    ok = false;
                    break;
                }
            }
        }

        self.scratch = scratch;
        ok.then_some(fx)
    }
}
