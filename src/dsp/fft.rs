use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex {
    pub re: f32,
    pub im: f32,
}

impl Complex {
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

    pub fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    pub fn norm(self) -> f32 {
        (self.re * self.re + self.im * self.im).sqrt()
    }

    pub fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }
}

impl Add for Complex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl AddAssign for Complex {
    fn add_assign(&mut self, rhs: Self) {
        self.re += rhs.re;
        self.im += rhs.im;
    }
}

impl Sub for Complex {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// Iterative radix-2 FFT with precomputed twiddles.
#[derive(Debug, Clone)]
pub struct Fft {
    size: usize,
    twiddles: Vec<Complex>,
    bit_reverse: Vec<usize>,
}

impl Fft {
    /// `size` must be a power of two.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two(), "FFT size must be a power of two");
        let bits = size.trailing_zeros();
        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -2.0 * PI * k as f32 / size as f32;
                Complex::new(angle.cos(), angle.sin())
            })
            .collect();
        let bit_reverse = (0..size)
            .map(|i| if bits == 0 { 0 } else { i.reverse_bits() >> (usize::BITS - bits) })
            .collect();
        Self {
            size,
            twiddles,
            bit_reverse,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn forward(&self, data: &mut [Complex]) {
        self.transform(data, false);
    }

    /// Inverse transform, scaled by 1/N.
    pub fn inverse(&self, data: &mut [Complex]) {
        self.transform(data, true);
        let scale = 1.0 / self.size as f32;
        for value in data.iter_mut() {
            value.re *= scale;
            value.im *= scale;
        }
    }

    fn transform(&self, data: &mut [Complex], inverse: bool) {
        let n = self.size;
        debug_assert_eq!(data.len(), n);

        for i in 0..n {
            let j = self.bit_reverse[i];
            if j > i {
                data.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let step = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let twiddle = self.twiddles[k * step];
                    let w = if inverse { twiddle.conj() } else { twiddle };
                    let a = data[start + k];
                    let b = data[start + k + half] * w;
                    data[start + k] = a + b;
                    data[start + k + half] = a - b;
                }
            }
            len <<= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_has_flat_spectrum() {
        let fft = Fft::new(8);
        let mut data = vec![Complex::ZERO; 8];
        data[0] = Complex::new(1.0, 0.0);
        fft.forward(&mut data);
        for bin in data {
            assert!((bin.re - 1.0).abs() < 1e-6 && bin.im.abs() < 1e-6);
        }
    }

    #[test]
    fn sine_lands_in_its_bin() {
        let n = 64;
        let fft = Fft::new(n);
        let mut data: Vec<Complex> = (0..n)
            .map(|i| Complex::new((2.0 * PI * 4.0 * i as f32 / n as f32).sin(), 0.0))
            .collect();
        fft.forward(&mut data);
        let peak = (0..n / 2)
            .max_by(|a, b| data[*a].norm().total_cmp(&data[*b].norm()))
            .unwrap();
        assert_eq!(peak, 4);
        assert!((data[4].norm() - n as f32 / 2.0).abs() < 1e-3);
    }

    #[test]
    fn inverse_restores_signal() {
        let fft = Fft::new(16);
        let original: Vec<Complex> = (0..16).map(|i| Complex::new(i as f32 * 0.1 - 0.5, 0.0)).collect();
        let mut data = original.clone();
        fft.forward(&mut data);
        fft.inverse(&mut data);
        for (a, b) in data.iter().zip(original.iter()) {
            assert!((a.re - b.re).abs() < 1e-5);
            assert!(a.im.abs() < 1e-5);
        }
    }
}
