use crate::{
    audio_data::{AudioDataLoader, ConvertToMono, LoadOptions, SonoraAudioData},
    error::{Result, SonoraError},
};
use std::io::{Cursor, Read};
use std::path::Path;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Fetches `http(s)` sources with ureq, reads anything else from disk, and
/// decodes the bytes with symphonia.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAudioLoader;

impl DefaultAudioLoader {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDataLoader for DefaultAudioLoader {
    fn load(&self, source: &str, options: &LoadOptions) -> Result<SonoraAudioData> {
        let bytes = fetch_bytes(source)?;
        decode_bytes(bytes, extension_of(source).as_deref(), options)
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn extension_of(source: &str) -> Option<String> {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn fetch_bytes(source: &str) -> Result<Vec<u8>> {
    if !is_remote(source) {
        return Ok(std::fs::read(source)?);
    }

    log::debug!("Fetching {}", source);
    let response = ureq::get(source)
        .call()
        .map_err(|e| SonoraError::Network(format!("{}: {}", source, e)))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| SonoraError::Network(format!("{}: {}", source, e)))?;
    Ok(bytes)
}

/// Decodes an in-memory encoded file (MP3, WAV, ...) into audio data.
pub(crate) fn decode_bytes(
    bytes: Vec<u8>,
    extension: Option<&str>,
    options: &LoadOptions,
) -> Result<SonoraAudioData> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SonoraError::AudioLoading(format!("Failed to probe audio format: {:?}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| SonoraError::AudioLoading("No default audio track found".to_string()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| SonoraError::AudioLoading("Sample rate not found".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| SonoraError::AudioLoading("Channel count not found".to_string()))?
        .count() as u16;

    if let ConvertToMono::Channel(ch) = options.convert_to_mono {
        if ch >= channels as usize {
            return Err(SonoraError::AudioFormat(format!(
                "Channel {} out of range (max: {})",
                ch,
                channels - 1
            )));
        }
    }

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SonoraError::AudioLoading(format!("Failed to create decoder: {:?}", e)))?;

    let max_frames = options
        .max_duration
        .map(|d| (d.as_secs_f64() * sample_rate as f64) as usize)
        .unwrap_or(usize::MAX);

    let mut samples: Vec<f32> = Vec::new();
    let mut frames_decoded = 0;

    while frames_decoded < max_frames {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break, // end of stream
            Err(e) => {
                return Err(SonoraError::AudioLoading(format!(
                    "Error reading packet: {:?}",
                    e
                )));
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(Error::IoError(_)) => break,
            Err(Error::DecodeError(_)) => continue, // recoverable corruption
            Err(e) => {
                return Err(SonoraError::AudioLoading(format!(
                    "Error decoding packet: {:?}",
                    e
                )));
            }
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        let mut tmp = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        tmp.copy_interleaved_ref(decoded);

        match options.convert_to_mono {
            ConvertToMono::Channel(ch) => samples.extend(
                tmp.samples()
                    .chunks(channels as usize)
                    .map(|frame| frame[ch]),
            ),
            _ => samples.extend_from_slice(tmp.samples()),
        }

        frames_decoded += frames;
    }

    let stored_channels = match options.convert_to_mono {
        ConvertToMono::Channel(_) => 1,
        _ => channels,
    };
    let stored_frames = frames_decoded.min(max_frames);
    samples.truncate(stored_frames * stored_channels as usize);

    if samples.is_empty() {
        return Err(SonoraError::AudioLoading(
            "Stream decoded to zero samples".to_string(),
        ));
    }

    let mut audio_data = SonoraAudioData::from_interleaved(samples, sample_rate, stored_channels)?;
    if options.convert_to_mono == ConvertToMono::Downmix {
        audio_data = audio_data.to_mono();
    }

    if let Some(target_rate) = options.target_sample_rate {
        if target_rate != sample_rate {
            audio_data = audio_data.resample(target_rate)?;
        }
    }

    Ok(audio_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal 16-bit PCM WAV file.
    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn decodes_wav_from_memory() {
        let samples: Vec<i16> = (0..800).map(|i| if i % 2 == 0 { 16384 } else { -16384 }).collect();
        let data = decode_bytes(wav_bytes(8000, 2, &samples), Some("wav"), &LoadOptions::default())
            .unwrap();
        assert_eq!(data.sample_rate(), 8000);
        assert_eq!(data.channels(), 2);
        assert_eq!(data.total_frames(), 400);
        assert!((data.samples()[0] - 0.5).abs() < 1e-3);
        assert!((data.samples()[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn channel_pick_keeps_one_side() {
        let samples: Vec<i16> = (0..200).map(|i| if i % 2 == 0 { 16384 } else { 0 }).collect();
        let options = LoadOptions::new().convert_to_mono(ConvertToMono::Channel(1));
        let data = decode_bytes(wav_bytes(8000, 2, &samples), Some("wav"), &options).unwrap();
        assert_eq!(data.channels(), 1);
        assert!(data.samples().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn garbage_is_a_loading_error() {
        let err = decode_bytes(vec![0u8; 64], None, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SonoraError::AudioLoading(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DefaultAudioLoader::new()
            .load("/definitely/not/here.mp3", &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, SonoraError::Io(_)));
    }

    #[test]
    fn extension_ignores_query_string() {
        assert_eq!(extension_of("https://x.test/a/b.MP3?x=1").as_deref(), Some("mp3"));
        assert_eq!(extension_of("noext"), None);
    }
}
