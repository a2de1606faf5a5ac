use std::io::Cursor;
use std::time::Duration;

use crate::error::SpeechError;

/// A 16-bit mono WAV clip of silence, mostly useful for tests and mocks.
pub fn silence(duration: Duration, sample_rate: u32) -> Result<Vec<u8>, SpeechError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let n = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
    let mut cursor = Cursor::new(Vec::with_capacity(44 + n * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for _ in 0..n {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Playback length of a WAV clip, read from its header.
pub fn wav_duration(bytes: &[u8]) -> Result<Duration, SpeechError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(SpeechError::Playback("WAV header has zero sample rate".to_string()));
    }
    // duration() counts frames, i.e. samples per channel. Streamed responses
    // may declare a placeholder data length, so cap by the bytes present.
    let frame_bytes = (spec.channels as u64 * spec.bits_per_sample as u64 / 8).max(1);
    let present = bytes.len().saturating_sub(44) as u64 / frame_bytes;
    let frames = (reader.duration() as u64).min(present) as f64;
    Ok(Duration::from_secs_f64(frames / spec.sample_rate as f64))
}
