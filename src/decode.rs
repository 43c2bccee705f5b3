//! Preview clip decoding.
//!
//! Decodes a short audio file (MP3/FLAC/WAV) into a mono f32 waveform at
//! the analysis sample rate.  Channels are averaged into one, then the
//! signal is linearly resampled — previews are 20–30 s clips feeding
//! aggregate statistics, so interpolation quality is not a concern here.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ResolveError;

/// Decode an audio file to a mono waveform at `target_rate` Hz.
///
/// Fails with [`ResolveError::Decode`] when the container or codec cannot
/// be read — callers treat that as "no features available" for the track.
pub fn load_mono(path: &Path, target_rate: u32) -> Result<Vec<f32>, ResolveError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ResolveError::Decode(format!("unrecognized format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| ResolveError::Decode("no audio track in file".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ResolveError::Decode(format!("unsupported codec: {}", e)))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut channels = 1usize;
    let mut source_rate = track.codec_params.sample_rate.unwrap_or(44_100);

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(ResolveError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                if sample_buf.is_none() {
                    channels = spec.channels.count().max(1);
                    source_rate = spec.rate;
                }
                // Grow the interleave buffer if this packet is larger
                let needed = decoded.capacity() * channels;
                if sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    for frame in buf.samples().chunks_exact(channels) {
                        mono.push(frame.iter().sum::<f32>() / channels as f32);
                    }
                }
            }
            // A corrupt packet is skippable; the rest of the clip decodes
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(ResolveError::Decode(e.to_string())),
        }
    }

    if mono.is_empty() {
        return Err(ResolveError::Decode(format!(
            "no audio samples decoded from {}",
            path.display()
        )));
    }

    Ok(resample_linear(&mono, source_rate, target_rate))
}

/// Linear-interpolation resampler.
pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / step).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * step;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let a = input[idx];
        let b = input[(idx + 1).min(input.len() - 1)];
        out.push(a + (b - a) * frac);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_identity_at_same_rate() {
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_linear(&samples, 44_100, 44_100), samples);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let out = resample_linear(&samples, 44_100, 22_050);
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn test_resample_preserves_linear_ramp() {
        // A linear ramp stays linear under linear interpolation
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let out = resample_linear(&samples, 100, 50);
        for (i, &v) in out.iter().enumerate() {
            assert!((v - (i as f32 * 2.0)).abs() < 1e-4, "sample {}: {}", i, v);
        }
    }

    #[test]
    fn test_resample_upsamples() {
        let samples = vec![0.0, 1.0];
        let out = resample_linear(&samples, 10, 20);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_load_mono_missing_file_is_error() {
        let err = load_mono(Path::new("/nonexistent/clip.mp3"), 22_050);
        assert!(err.is_err());
    }

    #[test]
    fn test_load_mono_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.mp3");
        std::fs::write(&path, b"this is not audio data at all").unwrap();
        match load_mono(&path, 22_050) {
            Err(ResolveError::Decode(_)) => {}
            other => panic!("expected decode error, got {:?}", other.map(|v| v.len())),
        }
    }
}
