//! WAV encoding for 16-bit PCM.

use std::io::Write;

/// Encode interleaved samples in `[-1, 1]` as 16-bit PCM.
pub fn write_wav(
    w: &mut impl Write,
    samples: &[f32],
    num_channels: u16,
    sample_rate: u32,
) -> std::io::Result<()> {
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = data_size_for(samples.len())?;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, sample_rate, block_align, bits_per_sample)?;
    write_data_chunk(w, samples, data_size)
}

pub fn samples_to_wav(samples: &[f32], num_channels: u16, sample_rate: u32) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_wav(&mut buf, samples, num_channels, sample_rate)?;
    Ok(buf)
}

/// Bytes of 16-bit sample data, checked against the RIFF size field.
fn data_size_for(samples: usize) -> std::io::Result<u32> {
    samples
        .checked_mul(2)
        .and_then(|bytes| u32::try_from(bytes).ok())
        .filter(|&bytes| bytes <= u32::MAX - 36)
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "too many samples for a WAV file"))
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

fn write_data_chunk(w: &mut impl Write, samples: &[f32], data_size: u32) -> std::io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for &sample in samples {
        w.write_all(&to_pcm16(sample).to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let wav = samples_to_wav(&[0.0, 0.5, -0.5, 1.0], 1, 48_000).unwrap();
        assert_eq!(wav.len(), 44 + 8);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 36 + 8);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 48_000);
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 96_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 8);
    }

    #[test]
    fn samples_are_clamped() {
        assert_eq!(to_pcm16(0.0), 0);
        assert_eq!(to_pcm16(1.0), i16::MAX);
        assert_eq!(to_pcm16(2.0), i16::MAX);
        assert_eq!(to_pcm16(-3.0), -i16::MAX);
        assert_eq!(to_pcm16(0.5), 16_384);
    }

    #[test]
    fn oversized_data_is_rejected() {
        assert!(data_size_for(1 << 31).is_err());
        assert_eq!(data_size_for(1_000).unwrap(), 2_000);
    }

    #[test]
    fn stereo_block_align() {
        let wav = samples_to_wav(&[0.0; 6], 2, 44_100).unwrap();
        assert_eq!(u16::from_le_bytes([wav[32], wav[33]]), 4);
        assert_eq!(wav.len(), 44 + 12);
    }
}
