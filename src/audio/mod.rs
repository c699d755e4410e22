//! Microphone capture and payload encoding

mod capture;

pub use capture::{AudioCapture, CpalCapture};
#[cfg(test)]
pub use capture::MockAudioCapture;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Encode 16 kHz mono f32 samples as an in-memory 16-bit PCM WAV payload
///
/// # Errors
/// Returns error if WAV encoding fails
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).context("failed to create WAV writer")?;
        for &sample in samples {
            // Clamp before scaling: capture can overshoot [-1, 1] slightly
            #[allow(clippy::cast_possible_truncation)]
            let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(value)
                .context("failed to write sample")?;
        }
        writer.finalize().context("failed to finalize WAV data")?;
    }

    Ok(cursor.into_inner())
}
