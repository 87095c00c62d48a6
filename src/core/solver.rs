#[derive(Debug, Clone, Copy)]
pub struct RootSolveConfig {
    pub search_min: f64,
    pub search_max: f64,
    pub grid_step: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSolveResult {
    pub root: f64,
    pub iterations: u32,
    pub converged: bool,
}

/// Scans `[search_min, search_max]` on a uniform grid and refines every
/// bracket where `f` changes sign. Roots are returned in ascending order.
pub fn find_roots<F>(f: F, config: RootSolveConfig) -> Result<Vec<RootSolveResult>, String>
where
    F: Fn(f64) -> f64,
{
    validate_config(config)?;

    let steps = ((config.search_max - config.search_min) / config.grid_step).ceil() as u32;
    let mut roots = Vec::new();
    let mut lo = config.search_min;
    let mut f_lo = f(lo);

    for k in 1..=steps {
        let hi = (config.search_min + k as f64 * config.grid_step).min(config.search_max);
        let f_hi = f(hi);

        if f_lo == 0.0 {
            roots.push(RootSolveResult {
                root: lo,
                iterations: 0,
                converged: true,
            });
        } else if f_lo.is_finite()
            && f_hi.is_finite()
            && f_hi != 0.0
            && f_lo.signum() != f_hi.signum()
        {
            roots.push(bisect(&f, lo, hi, f_lo, config));
        }

        lo = hi;
        f_lo = f_hi;
    }

    if f_lo == 0.0 {
        roots.push(RootSolveResult {
            root: lo,
            iterations: 0,
            converged: true,
        });
    }

    Ok(roots)
}

fn bisect<F>(
    f: &F,
    lower: f64,
    upper: f64,
    f_lower: f64,
    config: RootSolveConfig,
) -> RootSolveResult
where
    F: Fn(f64) -> f64,
{
    let mut lo = lower;
    let mut hi = upper;
    let mut f_lo = f_lower;
    let mut it = 0;
    while it < config.max_iterations {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let f_mid = f(mid);

        if f_mid == 0.0 {
            return RootSolveResult {
                root: mid,
                iterations: it,
                converged: true,
            };
        }

        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }

        if (hi - lo).abs() <= config.tolerance {
            return RootSolveResult {
                root: (lo + hi) * 0.5,
                iterations: it,
                converged: true,
            };
        }
    }

    RootSolveResult {
        root: (lo + hi) * 0.5,
        iterations: it,
        converged: false,
    }
}

fn validate_config(config: RootSolveConfig) -> Result<(), String> {
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("search_max must be greater than search_min".to_string());
    }
    if !config.grid_step.is_finite() || config.grid_step <= 0.0 {
        return Err("grid_step must be > 0".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err("tolerance must be > 0".to_string());
    }
    if config.max_iterations == 0 {
        return Err("max_iterations must be > 0".to_string());
    }
    Ok(())
}
