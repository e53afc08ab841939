//! Scan-then-refine root finding for one-dimensional mismatch functions.
//!
//! 1. **Scan**: sample $f$ on a uniform grid and bracket every sign change.
//! 2. **Tangential check**: at each interior local minimum of $|f|$ whose
//!    neighbours share its sign, minimise $\operatorname{sign}(f)\,f$ by
//!    golden-section search. A negative minimum hides two roots between
//!    the samples and is split into two brackets; a minimum within the
//!    degeneracy tolerance of zero is a double root.
//! 3. **Refine**: Illinois false position, falling back to bisection
//!    whenever a step fails to halve the bracket.

use crate::error::PhaseMatchError;

const INV_GOLDEN: f64 = 0.618_033_988_749_894_8;

/// A refined root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    /// $|f(x)|$.
    pub residual: f64,
    pub iterations: usize,
}

/// Result of scanning an interval.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    /// Sign-change roots, ascending.
    pub roots: Vec<Root>,
    /// Double roots where $f$ touches zero without crossing.
    pub tangential: Vec<Root>,
}

/// Root-finding settings for one solve.
#[derive(Debug, Clone)]
pub struct RootFinder<'a> {
    /// Crystal name used in error context.
    pub label: &'a str,
    pub samples: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub degeneracy_tolerance: f64,
}

impl RootFinder<'_> {
    /// Find every root of `f` in `[lo, hi]`.
    pub fn find_all<F>(&self, mut f: F, lo: f64, hi: f64) -> Result<Scan, PhaseMatchError>
    where
        F: FnMut(f64) -> Result<f64, PhaseMatchError>,
    {
        let n = self.samples.max(2);
        let xs: Vec<f64> = (0..=n)
            .map(|i| lo + (hi - lo) * i as f64 / n as f64)
            .collect();
        let fs: Vec<f64> = xs.iter().map(|&x| f(x)).collect::<Result<_, _>>()?;

        let mut scan = Scan::default();
        let mut brackets: Vec<(f64, f64, f64, f64)> = Vec::new();

        for i in 0..=n {
            if fs[i] == 0.0 {
                let exact = Root { x: xs[i], residual: 0.0, iterations: 0 };
                // A zero between same-sign neighbours touches without crossing.
                if i > 0 && i < n && fs[i - 1] * fs[i + 1] > 0.0 {
                    log::warn!("{}: tangential match at x = {:.6} (exact)", self.label, xs[i]);
                    scan.tangential.push(exact);
                } else {
                    scan.roots.push(exact);
                }
            } else if i < n && fs[i] * fs[i + 1] < 0.0 {
                brackets.push((xs[i], fs[i], xs[i + 1], fs[i + 1]));
            }
        }
        log::debug!("{}: {} sign change(s) over [{lo}, {hi}]", self.label, brackets.len());

        for i in 1..n {
            let (a, b, c) = (fs[i - 1], fs[i], fs[i + 1]);
            if a * b <= 0.0 || b * c <= 0.0 {
                continue;
            }
            if !(b.abs() < a.abs() && b.abs() <= c.abs()) {
                continue;
            }
            let s = b.signum();
            let (xm, gm) = self.golden_min(&mut |x| f(x).map(|v| s * v), xs[i - 1], xs[i + 1])?;
            if gm < 0.0 {
                log::debug!("{}: close root pair near x = {xm:.6}", self.label);
                brackets.push((xs[i - 1], a, xm, s * gm));
                brackets.push((xm, s * gm, xs[i + 1], c));
            } else if gm < self.degeneracy_tolerance {
                log::warn!("{}: tangential match at x = {xm:.6} (|f| = {gm:.2e})", self.label);
                scan.tangential.push(Root { x: xm, residual: gm, iterations: 0 });
            }
        }

        for (a, fa, b, fb) in brackets {
            scan.roots.push(self.refine(&mut f, a, fa, b, fb)?);
        }
        scan.roots.sort_by(|p, q| p.x.total_cmp(&q.x));
        scan.roots.dedup_by(|p, q| (p.x - q.x).abs() <= self.tolerance);
        Ok(scan)
    }

    /// Refine a root inside a bracket with $f(a)\,f(b) < 0$.
    pub fn refine<F>(
        &self,
        f: &mut F,
        mut a: f64,
        fa: f64,
        mut b: f64,
        fb: f64,
    ) -> Result<Root, PhaseMatchError>
    where
        F: FnMut(f64) -> Result<f64, PhaseMatchError>,
    {
        // True values at the bracket ends, and the weights used for the
        // false-position step (Illinois halves the stale end).
        let (mut ra, mut rb) = (fa, fb);
        let (mut wa, mut wb) = (fa, fb);
        let mut side = 0i8;
        let mut bisect = false;
        let mut width = (b - a).abs();

        let best = |a: f64, ra: f64, b: f64, rb: f64, iterations: usize| {
            let (x, r) = if ra.abs() <= rb.abs() { (a, ra) } else { (b, rb) };
            Root { x, residual: r.abs(), iterations }
        };

        if width <= self.tolerance {
            return Ok(best(a, ra, b, rb, 0));
        }

        for iteration in 1..=self.max_iterations {
            let c = if bisect {
                0.5 * (a + b)
            } else {
                let s = b - wb * (b - a) / (wb - wa);
                if s > a.min(b) && s < a.max(b) {
                    s
                } else {
                    0.5 * (a + b)
                }
            };
            let fc = f(c)?;
            log::trace!("{}: iter {iteration} x = {c:.9} f = {fc:.3e}", self.label);

            if fc == 0.0 {
                return Ok(Root { x: c, residual: 0.0, iterations: iteration });
            }
            if fc.signum() == rb.signum() {
                b = c;
                rb = fc;
                wb = fc;
                if side == -1 {
                    wa *= 0.5;
                }
                side = -1;
            } else {
                a = c;
                ra = fc;
                wa = fc;
                if side == 1 {
                    wb *= 0.5;
                }
                side = 1;
            }

            let new_width = (b - a).abs();
            if new_width <= self.tolerance {
                return Ok(best(a, ra, b, rb, iteration));
            }
            bisect = new_width > 0.5 * width;
            width = new_width;
        }

        Err(PhaseMatchError::Convergence {
            crystal: self.label.to_string(),
            iterations: self.max_iterations,
            residual: ra.abs().min(rb.abs()),
        })
    }

    /// Golden-section minimum of `g` on `[a, b]`, stopping early once a
    /// negative value is seen.
    fn golden_min<G>(&self, g: &mut G, mut a: f64, mut b: f64) -> Result<(f64, f64), PhaseMatchError>
    where
        G: FnMut(f64) -> Result<f64, PhaseMatchError>,
    {
        let mut c = b - INV_GOLDEN * (b - a);
        let mut d = a + INV_GOLDEN * (b - a);
        let mut gc = g(c)?;
        let mut gd = g(d)?;

        for _ in 0..self.max_iterations {
            if (b - a).abs() <= self.tolerance || gc < 0.0 || gd < 0.0 {
                break;
            }
            if gc < gd {
                b = d;
                d = c;
                gd = gc;
                c = b - INV_GOLDEN * (b - a);
                gc = g(c)?;
            } else {
                a = c;
                c = d;
                gc = gd;
                d = a + INV_GOLDEN * (b - a);
                gd = g(d)?;
            }
        }
        Ok(if gc <= gd { (c, gc) } else { (d, gd) })
    }
}
