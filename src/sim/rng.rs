//! Fast PRNG for draw and upgrade simulation. Uses SplitMix64 for throughput and good statistical quality.
//! Deterministic: same seed produces the same sequence. Not cryptographically secure.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// 2^-53: scales the top 53 bits of a u64 into [0, 1).
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

/// A source of uniform draws in `[0, 1)`.
///
/// The samplers only ever need this, so tests can script exact draw sequences.
pub trait UniformSource {
    fn next_unit(&mut self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Independent stream for one actor of a batch. Streams depend only on `(seed, stream)`,
    /// so a batch gives identical results whatever the worker layout.
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        let mut mixer = Rng::new(seed ^ stream.wrapping_mul(SPLITMIX64_M2));
        Self::new(mixer.next_u64() ^ stream)
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }

    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * UNIT_SCALE
    }
}

impl UniformSource for Rng {
    #[inline]
    fn next_unit(&mut self) -> f64 {
        self.next_f64()
    }
}

/// Seed drawn from OS entropy, for runs where the caller did not pin one.
pub fn entropy_seed() -> u64 {
    let mut buf = [0_u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(err) => {
            tracing::warn!(%err, "os entropy unavailable, falling back to clock seed");
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos() as u64)
                .unwrap_or(SPLITMIX64_GOLDEN);
            Rng::new(nanos).next_u64()
        }
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
#[cfg(test)]
pub(crate) struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
}

#[cfg(test)]
impl ScriptedSource {
    pub(crate) fn new(draws: &[f64]) -> Self {
        Self {
            draws: draws.to_vec(),
            cursor: 0,
        }
    }
}

#[cfg(test)]
impl UniformSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        let draw = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitmix64_deterministic() {
        let mut a = Rng::new(7);
        let mut b = Rng::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn splitmix64_different_seeds_differ() {
        let mut a = Rng::new(1);
        let mut b = Rng::new(2);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn unit_draws_stay_in_half_open_interval() {
        let mut rng = Rng::new(99);
        for _ in 0..10_000 {
            let draw = rng.next_f64();
            assert!((0.0..1.0).contains(&draw), "draw out of range: {draw}");
        }
    }

    #[test]
    fn streams_are_reproducible_and_distinct() {
        let mut first = Rng::for_stream(42, 3);
        let mut again = Rng::for_stream(42, 3);
        let mut neighbour = Rng::for_stream(42, 4);
        let a = first.next_u64();
        assert_eq!(a, again.next_u64());
        assert_ne!(a, neighbour.next_u64());
    }

    #[test]
    fn unit_draw_mean_is_near_half() {
        let mut rng = Rng::new(2024);
        let n = 100_000;
        let mean = (0..n).map(|_| rng.next_f64()).sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.005, "mean={mean}");
    }
}
