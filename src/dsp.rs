//! Short-time spectral analysis for acoustic feature extraction.
//!
//! Everything here operates on a mono f32 waveform at the analysis sample
//! rate and produces the per-frame quantities that `extract` aggregates
//! into the 8-feature summary: framed RMS and zero-crossing rate from the
//! time domain, spectral centroid/bandwidth/rolloff, folded chroma energy
//! and MFCCs from STFT magnitudes, and a tempo estimate from the
//! autocorrelation of the onset (spectral flux) envelope.

use chfft::RFft1D;

/// Analysis window length in samples.
pub const N_FFT: usize = 2048;
/// Hop between consecutive analysis frames in samples.
pub const HOP_LENGTH: usize = 512;

const N_MELS: usize = 40;
const N_MFCC: usize = 20;
const ROLLOFF_PERCENT: f64 = 0.85;
const PITCH_CLASSES: usize = 12;

/// Magnitude spectrogram: one `N_FFT/2 + 1`-bin frame per hop.
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl Spectrogram {
    /// Center frequency of FFT bin `k` in Hz.
    pub fn bin_frequency(&self, k: usize) -> f64 {
        k as f64 * self.sample_rate as f64 / N_FFT as f64
    }
}

/// Compute the magnitude spectrogram of a mono waveform.
///
/// Returns no frames when the signal is shorter than one window.
pub fn stft_magnitudes(samples: &[f32], sample_rate: u32) -> Spectrogram {
    let mut frames = Vec::new();
    if samples.len() >= N_FFT {
        let window = hann_window(N_FFT);
        let mut fft = RFft1D::<f32>::new(N_FFT);
        let mut buf = vec![0.0f32; N_FFT];

        let mut start = 0;
        while start + N_FFT <= samples.len() {
            for (i, slot) in buf.iter_mut().enumerate() {
                *slot = samples[start + i] * window[i];
            }
            let spectrum = fft.forward(&buf);
            frames.push(spectrum.iter().map(|c| c.norm()).collect());
            start += HOP_LENGTH;
        }
    }
    Spectrogram {
        frames,
        sample_rate,
    }
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let x = std::f32::consts::PI * 2.0 * i as f32 / (len as f32 - 1.0);
            0.5 * (1.0 - x.cos())
        })
        .collect()
}

/// Root-mean-square energy per analysis frame.
pub fn frame_rms(samples: &[f32]) -> Vec<f64> {
    framed(samples)
        .map(|frame| {
            let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum_sq / frame.len() as f64).sqrt()
        })
        .collect()
}

/// Zero-crossing rate per analysis frame (crossings per sample).
pub fn frame_zero_crossing_rate(samples: &[f32]) -> Vec<f64> {
    framed(samples)
        .map(|frame| {
            let crossings = frame
                .windows(2)
                .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
                .count();
            crossings as f64 / frame.len() as f64
        })
        .collect()
}

fn framed(samples: &[f32]) -> impl Iterator<Item = &[f32]> + '_ {
    samples.windows(N_FFT).step_by(HOP_LENGTH)
}

/// Magnitude-weighted mean frequency of one spectrum frame, in Hz.
pub fn spectral_centroid(frame: &[f32], sample_rate: u32) -> f64 {
    let total: f64 = frame.iter().map(|&m| m as f64).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = frame
        .iter()
        .enumerate()
        .map(|(k, &m)| bin_freq(k, sample_rate) * m as f64)
        .sum();
    weighted / total
}

/// Magnitude-weighted standard deviation around the centroid, in Hz.
pub fn spectral_bandwidth(frame: &[f32], sample_rate: u32, centroid: f64) -> f64 {
    let total: f64 = frame.iter().map(|&m| m as f64).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let variance: f64 = frame
        .iter()
        .enumerate()
        .map(|(k, &m)| {
            let d = bin_freq(k, sample_rate) - centroid;
            m as f64 * d * d
        })
        .sum::<f64>()
        / total;
    variance.sqrt()
}

/// Frequency below which 85% of the frame's magnitude lies, in Hz.
pub fn spectral_rolloff(frame: &[f32], sample_rate: u32) -> f64 {
    let total: f64 = frame.iter().map(|&m| m as f64).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let threshold = total * ROLLOFF_PERCENT;
    let mut cumulative = 0.0;
    for (k, &m) in frame.iter().enumerate() {
        cumulative += m as f64;
        if cumulative >= threshold {
            return bin_freq(k, sample_rate);
        }
    }
    bin_freq(frame.len() - 1, sample_rate)
}

fn bin_freq(k: usize, sample_rate: u32) -> f64 {
    k as f64 * sample_rate as f64 / N_FFT as f64
}

/// Fold one spectrum frame into 12 pitch-class energies, max-normalized.
pub fn chroma_frame(frame: &[f32], sample_rate: u32) -> [f64; PITCH_CLASSES] {
    let mut classes = [0.0f64; PITCH_CLASSES];
    for (k, &m) in frame.iter().enumerate().skip(1) {
        let freq = bin_freq(k, sample_rate);
        if freq < 20.0 {
            continue;
        }
        let midi = 69.0 + 12.0 * (freq / 440.0).log2();
        let class = (midi.round() as i64).rem_euclid(PITCH_CLASSES as i64) as usize;
        classes[class] += (m as f64) * (m as f64);
    }
    let max = classes.iter().cloned().fold(0.0f64, f64::max);
    if max > 0.0 {
        for c in classes.iter_mut() {
            *c /= max;
        }
    }
    classes
}

/// Triangular mel filterbank over the STFT bin grid.
pub struct MelBank {
    // n_mels rows of n_bins weights
    filters: Vec<Vec<f64>>,
}

impl MelBank {
    pub fn new(sample_rate: u32) -> Self {
        let n_bins = N_FFT / 2 + 1;
        let mel_max = hz_to_mel(sample_rate as f64 / 2.0);

        // n_mels + 2 points: each filter spans [m, m+2] with its peak at m+1
        let points: Vec<f64> = (0..N_MELS + 2)
            .map(|i| {
                let mel = mel_max * i as f64 / (N_MELS + 1) as f64;
                mel_to_hz(mel) * N_FFT as f64 / sample_rate as f64
            })
            .collect();

        let filters = (0..N_MELS)
            .map(|m| {
                let (lo, mid, hi) = (points[m], points[m + 1], points[m + 2]);
                (0..n_bins)
                    .map(|k| {
                        let k = k as f64;
                        if k <= lo || k >= hi {
                            0.0
                        } else if k <= mid {
                            (k - lo) / (mid - lo).max(1e-9)
                        } else {
                            (hi - k) / (hi - mid).max(1e-9)
                        }
                    })
                    .collect()
            })
            .collect();

        MelBank { filters }
    }

    /// MFCCs of one magnitude frame: log mel power through an orthonormal
    /// DCT-II, first `N_MFCC` coefficients.
    pub fn mfcc_frame(&self, frame: &[f32]) -> [f64; N_MFCC] {
        let mut log_mel = [0.0f64; N_MELS];
        for (j, filter) in self.filters.iter().enumerate() {
            let energy: f64 = filter
                .iter()
                .zip(frame)
                .map(|(&w, &m)| w * (m as f64) * (m as f64))
                .sum();
            log_mel[j] = (energy + 1e-10).ln();
        }

        let mut coeffs = [0.0f64; N_MFCC];
        let n = N_MELS as f64;
        for (i, coeff) in coeffs.iter_mut().enumerate() {
            let scale = if i == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            *coeff = scale
                * log_mel
                    .iter()
                    .enumerate()
                    .map(|(j, &e)| {
                        e * (std::f64::consts::PI * i as f64 * (2.0 * j as f64 + 1.0) / (2.0 * n))
                            .cos()
                    })
                    .sum::<f64>();
        }
        coeffs
    }
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0f64.powf(mel / 2595.0) - 1.0)
}

/// Onset strength envelope: positive spectral flux between frames.
pub fn onset_envelope(spec: &Spectrogram) -> Vec<f64> {
    spec.frames
        .windows(2)
        .map(|pair| {
            pair[1]
                .iter()
                .zip(&pair[0])
                .map(|(&cur, &prev)| ((cur - prev) as f64).max(0.0))
                .sum()
        })
        .collect()
}

/// Tempo in BPM from the autocorrelation of the onset envelope.
///
/// Searches lags covering 30–300 BPM and returns the best-correlated one.
/// A flat envelope (silence, or too short a clip) yields 0.0.
pub fn estimate_tempo(envelope: &[f64], sample_rate: u32) -> f64 {
    if envelope.len() < 4 {
        return 0.0;
    }

    let frame_rate = sample_rate as f64 / HOP_LENGTH as f64;
    let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|&v| v - mean).collect();

    let lag_min = ((60.0 * frame_rate / 300.0).ceil() as usize).max(1);
    let lag_max = ((60.0 * frame_rate / 30.0).floor() as usize).min(centered.len() - 1);
    if lag_min > lag_max {
        return 0.0;
    }

    let mut best_lag = 0usize;
    let mut best_corr = 0.0f64;
    for lag in lag_min..=lag_max {
        let corr: f64 = centered
            .iter()
            .zip(&centered[lag..])
            .map(|(&a, &b)| a * b)
            .sum();
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_lag == 0 {
        return 0.0;
    }
    60.0 * frame_rate / best_lag as f64
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22_050;

    fn sine(freq: f32, seconds: f32) -> Vec<f32> {
        let n = (SR as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    #[test]
    fn test_stft_frame_count_and_size() {
        let samples = sine(440.0, 1.0);
        let spec = stft_magnitudes(&samples, SR);
        let expected = (samples.len() - N_FFT) / HOP_LENGTH + 1;
        assert_eq!(spec.frames.len(), expected);
        assert_eq!(spec.frames[0].len(), N_FFT / 2 + 1);
    }

    #[test]
    fn test_stft_too_short_yields_no_frames() {
        let spec = stft_magnitudes(&[0.0; 100], SR);
        assert!(spec.frames.is_empty());
    }

    #[test]
    fn test_centroid_tracks_pure_tone() {
        let samples = sine(440.0, 1.0);
        let spec = stft_magnitudes(&samples, SR);
        let centroids: Vec<f64> = spec
            .frames
            .iter()
            .map(|f| spectral_centroid(f, SR))
            .collect();
        let avg = mean(&centroids);
        assert!((avg - 440.0).abs() < 50.0, "centroid {}", avg);
    }

    #[test]
    fn test_bandwidth_of_pure_tone_is_narrow() {
        let samples = sine(1000.0, 1.0);
        let spec = stft_magnitudes(&samples, SR);
        let c = spectral_centroid(&spec.frames[0], SR);
        let bw = spectral_bandwidth(&spec.frames[0], SR, c);
        assert!(bw < 200.0, "bandwidth {}", bw);
    }

    #[test]
    fn test_rolloff_of_pure_tone_near_tone() {
        let samples = sine(2000.0, 1.0);
        let spec = stft_magnitudes(&samples, SR);
        let r = spectral_rolloff(&spec.frames[0], SR);
        assert!((r - 2000.0).abs() < 100.0, "rolloff {}", r);
    }

    #[test]
    fn test_descriptors_of_silence_are_zero() {
        let frame = vec![0.0f32; N_FFT / 2 + 1];
        assert_eq!(spectral_centroid(&frame, SR), 0.0);
        assert_eq!(spectral_bandwidth(&frame, SR, 0.0), 0.0);
        assert_eq!(spectral_rolloff(&frame, SR), 0.0);
    }

    #[test]
    fn test_zcr_of_sine_matches_frequency() {
        let samples = sine(440.0, 1.0);
        let rates = frame_zero_crossing_rate(&samples);
        let avg = mean(&rates);
        let expected = 2.0 * 440.0 / SR as f64;
        assert!((avg - expected).abs() < expected * 0.1, "zcr {}", avg);
    }

    #[test]
    fn test_rms_of_sine_is_inv_sqrt2() {
        let samples = sine(440.0, 1.0);
        let rms = frame_rms(&samples);
        let avg = mean(&rms);
        assert!((avg - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01, "rms {}", avg);
    }

    #[test]
    fn test_chroma_of_a440_peaks_at_class_a() {
        let samples = sine(440.0, 1.0);
        let spec = stft_magnitudes(&samples, SR);
        let chroma = chroma_frame(&spec.frames[1], SR);
        // MIDI 69 (A4) → pitch class 9
        let best = chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i);
        assert_eq!(best, Some(9));
        assert!((chroma[9] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mfcc_is_finite_for_silence_and_tone() {
        let bank = MelBank::new(SR);
        let silent = vec![0.0f32; N_FFT / 2 + 1];
        assert!(bank.mfcc_frame(&silent).iter().all(|c| c.is_finite()));

        let samples = sine(440.0, 0.5);
        let spec = stft_magnitudes(&samples, SR);
        assert!(bank.mfcc_frame(&spec.frames[0]).iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_tempo_of_click_train() {
        // Clicks every 0.5 s → 120 BPM
        let n = SR as usize * 8;
        let mut samples = vec![0.0f32; n];
        let period = SR as usize / 2;
        for start in (0..n).step_by(period) {
            for i in 0..64.min(n - start) {
                samples[start + i] = 1.0;
            }
        }
        let spec = stft_magnitudes(&samples, SR);
        let env = onset_envelope(&spec);
        let bpm = estimate_tempo(&env, SR);
        assert!((bpm - 120.0).abs() < 12.0, "tempo {}", bpm);
    }

    #[test]
    fn test_tempo_of_silence_is_zero() {
        let spec = stft_magnitudes(&vec![0.0f32; SR as usize * 2], SR);
        let env = onset_envelope(&spec);
        assert_eq!(estimate_tempo(&env, SR), 0.0);
    }

    #[test]
    fn test_mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }
}
