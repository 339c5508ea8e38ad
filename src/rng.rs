use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Produces independent per-entity RNG substreams from one configured seed, so
/// the engine never reaches for a process-global RNG (§2.1, §9 "Global RNG").
///
/// Each substream is seeded by mixing the base seed with a stream index via
/// `SplitMix64`-style finalization, so two substreams drawn from the same
/// `RngStreams` never alias even if many are requested.
pub struct RngStreams {
    base_seed: u64,
    next_index: u64,
}

impl RngStreams {
    pub fn new(base_seed: u64) -> RngStreams {
        RngStreams { base_seed, next_index: 0 }
    }

    /// Returns a fresh, independent `SmallRng` substream.
    pub fn next_stream(&mut self) -> SmallRng {
        let seed = splitmix64(self.base_seed ^ self.next_index.wrapping_mul(0x9E3779B97F4A7C15));
        self.next_index += 1;
        SmallRng::seed_from_u64(seed)
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
