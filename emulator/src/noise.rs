use rand::Rng;
use rand_distr::StandardNormal;

/// Source of the random perturbations layered onto every generated sample.
///
/// Implemented for every [`rand::Rng`], so production code passes a
/// `StdRng`/`ThreadRng` and tests can pass a seeded generator or a
/// zero-noise stand-in.
pub trait NoiseSource {
    /// Sample from N(0, sigma).
    fn gaussian(&mut self, sigma: f64) -> f64;

    /// Uniform in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// Uniform in `[low, high]`.
    fn uniform_int(&mut self, low: i32, high: i32) -> i32;
}

impl<R: Rng + ?Sized> NoiseSource for R {
    fn gaussian(&mut self, sigma: f64) -> f64 {
        let z: f64 = self.sample(StandardNormal);
        z * sigma
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.gen_range(low..high)
    }

    fn uniform_int(&mut self, low: i32, high: i32) -> i32 {
        self.gen_range(low..=high)
    }
}

/// Noise source that never perturbs anything. Uniform draws return the
/// lower bound, which keeps every generated value inside its range.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroNoise;

impl NoiseSource for ZeroNoise {
    fn gaussian(&mut self, _sigma: f64) -> f64 {
        0.0
    }

    fn uniform(&mut self, low: f64, _high: f64) -> f64 {
        low
    }

    fn uniform_int(&mut self, low: i32, _high: i32) -> i32 {
        low
    }
}
