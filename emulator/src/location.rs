use crate::noise::NoiseSource;
use serde::{Deserialize, Serialize};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Full width of the per-device offset window, in degrees.
const LAT_RANGE: f64 = 0.01;
const LON_RANGE: f64 = 0.02;

const LOCATION_NOISE_SIGMA: f64 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// FNV-1a over the UTF-8 bytes of the identifier. Stable across runs,
/// platforms and toolchains, unlike `std`'s `DefaultHasher`.
pub fn device_hash(device: &str) -> u32 {
    device.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Where a device sits before per-call noise is applied.
pub fn jitter_center(base: Coordinate, device: &str) -> Coordinate {
    let h = device_hash(device);

    let lat_seed = f64::from(h & 0xffff) / 65535.0;
    let lon_seed = f64::from(h >> 16) / 65535.0;

    Coordinate {
        lat: base.lat + (lat_seed - 0.5) * LAT_RANGE,
        lon: base.lon + (lon_seed - 0.5) * LON_RANGE,
    }
}

pub fn device_location(base: Coordinate, device: &str, noise: &mut impl NoiseSource) -> Coordinate {
    let center = jitter_center(base, device);

    Coordinate {
        lat: center.lat + noise.gaussian(LOCATION_NOISE_SIGMA),
        lon: center.lon + noise.gaussian(LOCATION_NOISE_SIGMA),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::ZeroNoise;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BASE: Coordinate = Coordinate {
        lat: 54.8433,
        lon: 83.0931,
    };

    #[test]
    fn test_hash_known_vectors() {
        // Published FNV-1a 32-bit test vectors
        assert_eq!(device_hash(""), 0x811c9dc5);
        assert_eq!(device_hash("a"), 0xe40c292c);
        assert_eq!(device_hash("foobar"), 0xbf9cf968);
    }

    #[test]
    fn test_center_is_stable_and_order_independent() {
        let first = jitter_center(BASE, "device-001");
        let _ = jitter_center(BASE, "device-002");
        let _ = jitter_center(BASE, "device-003");
        let again = jitter_center(BASE, "device-001");

        assert_eq!(first, again);
        assert_ne!(first, jitter_center(BASE, "device-002"));
    }

    #[test]
    fn test_center_within_offset_window() {
        for i in 0..500 {
            let device = format!("device-{:03}", i);
            let c = jitter_center(BASE, &device);
            assert!((c.lat - BASE.lat).abs() <= 0.005 + 1e-12, "{} lat {}", device, c.lat);
            assert!((c.lon - BASE.lon).abs() <= 0.01 + 1e-12, "{} lon {}", device, c.lon);
        }
    }

    #[test]
    fn test_zero_noise_returns_center() {
        assert_eq!(
            device_location(BASE, "device-004", &mut ZeroNoise),
            jitter_center(BASE, "device-004")
        );
    }

    #[test]
    fn test_noisy_calls_cluster_around_center() {
        let mut rng = StdRng::seed_from_u64(5);
        let center = jitter_center(BASE, "device-005");
        let n = 5000;

        let mut lat_sum = 0.0;
        let mut lon_sum = 0.0;
        let mut distinct = false;
        let first = device_location(BASE, "device-005", &mut rng);

        for _ in 0..n {
            let p = device_location(BASE, "device-005", &mut rng);
            assert!((p.lat - center.lat).abs() < 0.001);
            assert!((p.lon - center.lon).abs() < 0.001);
            distinct |= p != first;
            lat_sum += p.lat;
            lon_sum += p.lon;
        }

        assert!(distinct);
        assert!((lat_sum / n as f64 - center.lat).abs() < 1e-5);
        assert!((lon_sum / n as f64 - center.lon).abs() < 1e-5);
    }
}
