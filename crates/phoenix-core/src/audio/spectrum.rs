//! Spectrum Analyzer - windowed radix-2 FFT
//!
//! The transform is a plain iterative Cooley-Tukey implementation so the
//! analyzer has no planner state and produces identical results on every
//! platform.

use crate::CoreError;
use num_complex::Complex;
use std::f64::consts::PI;
use tracing::debug;

/// One analyzed audio frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumFrame {
    /// Magnitude per bin (`fft_size / 2` bins, amplitude-scaled)
    pub magnitudes: Vec<f32>,
    /// Phase per bin in radians
    pub phases: Vec<f32>,
    /// Center frequency per bin in Hz
    pub frequencies: Vec<f32>,
    /// Transform size used for this frame
    pub fft_size: usize,
    /// Width of one bin in Hz
    pub frequency_resolution: f32,
    /// Half the sample rate
    pub nyquist: f32,
    /// Timestamp of the analyzed chunk in seconds
    pub timestamp: f64,
}

impl SpectrumFrame {
    /// Number of bins in this frame
    pub fn bins(&self) -> usize {
        self.magnitudes.len()
    }

    /// Index of the bin with the largest magnitude
    pub fn peak_bin(&self) -> Option<usize> {
        self.magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }

    /// Mean magnitude of all bins whose frequency lies in `low..high`
    pub fn band_energy(&self, low: f32, high: f32) -> f32 {
        band_average(&self.magnitudes, &self.frequencies, low, high)
    }
}

/// Mean of `values[i]` over bins whose frequency lies in `low..high`
pub(crate) fn band_average(values: &[f32], frequencies: &[f32], low: f32, high: f32) -> f32 {
    let (sum, count) = values
        .iter()
        .zip(frequencies.iter())
        .filter(|(_, f)| **f >= low && **f < high)
        .fold((0.0f32, 0usize), |(sum, count), (&v, _)| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// In-place iterative radix-2 FFT.
///
/// `buffer.len()` must be a power of two; other lengths are left untouched.
pub fn fft_in_place(buffer: &mut [Complex<f32>]) {
    let n = buffer.len();
    if n < 2 || !n.is_power_of_two() {
        return;
    }

    // Bit-reversal permutation
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if j > i {
            buffer.swap(i, j);
        }
    }

    // Butterfly stages, m = 2, 4, ..., n
    let mut m = 2;
    while m <= n {
        let half = m / 2;
        let angle = -2.0 * PI / m as f64;
        let w_m = Complex::new(angle.cos(), angle.sin());

        for start in (0..n).step_by(m) {
            let mut w = Complex::new(1.0f64, 0.0);
            for k in 0..half {
                let twiddle = Complex::new(w.re as f32, w.im as f32);
                let t = twiddle * buffer[start + k + half];
                let u = buffer[start + k];
                buffer[start + k] = u + t;
                buffer[start + k + half] = u - t;
                w *= w_m;
            }
        }
        m <<= 1;
    }
}

/// Hann window of `size` coefficients
fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            let t = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
        })
        .collect()
}

/// Windowed FFT analyzer with a fixed transform size
#[derive(Debug, Clone)]
pub struct SpectrumAnalyzer {
    fft_size: usize,
    sample_rate: u32,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    frequencies: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer. `fft_size` must be a power of two, at least 2.
    pub fn new(fft_size: usize, sample_rate: u32) -> Result<Self, CoreError> {
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(CoreError::InvalidArgument(format!(
                "FFT size must be a power of two >= 2, got {}",
                fft_size
            )));
        }
        if sample_rate == 0 {
            return Err(CoreError::InvalidArgument(
                "sample rate must be non-zero".to_string(),
            ));
        }

        debug!(
            "SpectrumAnalyzer created: fft_size={}, sample_rate={}",
            fft_size, sample_rate
        );

        Ok(Self {
            fft_size,
            sample_rate,
            window: hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            frequencies: Self::bin_frequencies(fft_size, sample_rate),
        })
    }

    fn bin_frequencies(fft_size: usize, sample_rate: u32) -> Vec<f32> {
        let resolution = sample_rate as f32 / fft_size as f32;
        (0..fft_size / 2).map(|bin| bin as f32 * resolution).collect()
    }

    /// Transform size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Current sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Width of one bin in Hz
    pub fn frequency_resolution(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    /// Update the sample rate; zero is ignored
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == 0 || sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        self.frequencies = Self::bin_frequencies(self.fft_size, sample_rate);
        debug!("SpectrumAnalyzer sample rate changed to {}", sample_rate);
    }

    /// Analyze one chunk of mono samples.
    ///
    /// Input is zero-padded or truncated to the FFT size, Hann-windowed and
    /// transformed. Non-finite samples are treated as silence.
    pub fn process(&mut self, samples: &[f32], timestamp: f64) -> SpectrumFrame {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples
                .get(i)
                .copied()
                .filter(|s| s.is_finite())
                .unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        fft_in_place(&mut self.buffer);

        let half = self.fft_size / 2;
        let scale = 2.0 / self.fft_size as f32;
        let mut magnitudes = Vec::with_capacity(half);
        let mut phases = Vec::with_capacity(half);
        for value in &self.buffer[..half] {
            magnitudes.push(value.norm() * scale);
            phases.push(value.arg());
        }

        SpectrumFrame {
            magnitudes,
            phases,
            frequencies: self.frequencies.clone(),
            fft_size: self.fft_size,
            frequency_resolution: self.frequency_resolution(),
            nyquist: self.sample_rate as f32 / 2.0,
            timestamp,
        }
    }

    /// Perceptually scaled spectrum in 0.0..=1.0.
    ///
    /// Magnitudes are normalized to the frame maximum and compressed with
    /// `log(1 + 9 * x)`. The log is base 10 so that the loudest bin maps to
    /// exactly 1.0 (`log10(10)`); a natural log would top out at `ln(10)`.
    pub fn to_avs_spectrum(frame: &SpectrumFrame) -> Vec<f32> {
        let max = frame.magnitudes.iter().fold(0.0f32, |acc, &m| acc.max(m));
        if max <= f32::EPSILON {
            return vec![0.0; frame.magnitudes.len()];
        }
        frame
            .magnitudes
            .iter()
            .map(|&m| (1.0 + 9.0 * (m / max)).log10())
            .collect()
    }
}
