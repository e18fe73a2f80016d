//! Seeded 2D gradient (Perlin) noise
//!
//! Used only for cosmetic drift of an entity's visual position. Output lies
//! roughly in [-1, 1].

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Permutation-table Perlin noise over the plane.
#[derive(Debug, Clone)]
pub struct Noise2D {
    perm: [u8; 512],
}

impl Noise2D {
    /// Build a noise field whose permutation is shuffled by `rng`
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut table: Vec<u8> = (0..=255u8).collect();
        table.shuffle(rng);

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i % 256];
        }
        Self { perm }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(&mut StdRng::seed_from_u64(seed))
    }

    /// Sample the field at `(x, y)`
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let xf = x.floor();
        let yf = y.floor();
        let xi = (xf as i64 & 255) as usize;
        let yi = (yf as i64 & 255) as usize;
        let x = x - xf;
        let y = y - yf;

        let u = fade(x);
        let v = fade(y);

        let p = &self.perm;
        let aa = p[p[xi] as usize + yi];
        let ab = p[p[xi] as usize + yi + 1];
        let ba = p[p[xi + 1] as usize + yi];
        let bb = p[p[xi + 1] as usize + yi + 1];

        let value = lerp(
            lerp(grad(aa, x, y), grad(ba, x - 1.0, y), u),
            lerp(grad(ab, x, y - 1.0), grad(bb, x - 1.0, y - 1.0), u),
            v,
        );
        // rescale toward [-1, 1]
        value * std::f64::consts::SQRT_2
    }
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

fn grad(hash: u8, x: f64, y: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        0.0
    };
    let u = if h & 1 == 0 { u } else { -u };
    let v = if h & 2 == 0 { v } else { -v };
    u + v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let a = Noise2D::from_seed(7);
        let b = Noise2D::from_seed(7);
        for i in 0..50 {
            let x = i as f64 * 0.37;
            let y = i as f64 * 0.11 + 100.0;
            assert_eq!(a.sample(x, y), b.sample(x, y));
        }
    }

    #[test]
    fn zero_at_lattice_points() {
        let noise = Noise2D::from_seed(3);
        assert_eq!(noise.sample(4.0, 9.0), 0.0);
    }

    #[test]
    fn output_is_bounded() {
        let noise = Noise2D::from_seed(11);
        for i in 0..500 {
            let v = noise.sample(i as f64 * 0.173, i as f64 * 0.051 - 20.0);
            assert!(v.abs() <= 2.0, "noise out of range: {}", v);
        }
    }
}
