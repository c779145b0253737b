use hound::{SampleFormat, WavReader, WavWriter};
use std::io;
use std::path::Path;

use crate::sample::{IqMetadata, IqSample};

/// Reads IQ samples from a stereo WAV file: I on the left channel, Q on the
/// right, matching the SDR++/URH convention.
pub fn read_iq_wav<P: AsRef<Path>>(path: P) -> io::Result<(Vec<IqSample>, IqMetadata)> {
    let reader = WavReader::open(path).map_err(to_io_error)?;
    let spec = reader.spec();

    if spec.channels != 2 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected stereo WAV (I/Q), got {} channels", spec.channels),
        ));
    }

    let metadata = IqMetadata {
        sample_rate: spec.sample_rate,
        total_samples: Some(reader.len() as usize / 2),
    };

    let samples = match spec.sample_format {
        SampleFormat::Float => read_float_samples(reader)?,
        SampleFormat::Int => read_int_samples(reader, spec.bits_per_sample)?,
    };

    Ok((samples, metadata))
}

fn read_float_samples(mut reader: WavReader<io::BufReader<std::fs::File>>) -> io::Result<Vec<IqSample>> {
    let mut samples = Vec::new();
    let mut iter = reader.samples::<f32>();

    while let (Some(i_result), Some(q_result)) = (iter.next(), iter.next()) {
        let i = i_result.map_err(to_io_error)?;
        let q = q_result.map_err(to_io_error)?;
        samples.push(IqSample::new(i, q));
    }

    Ok(samples)
}

fn read_int_samples(
    mut reader: WavReader<io::BufReader<std::fs::File>>,
    bits: u16,
) -> io::Result<Vec<IqSample>> {
    let mut samples = Vec::new();
    let max_val = (1i32 << (bits - 1)) as f32;
    let mut iter = reader.samples::<i32>();

    while let (Some(i_result), Some(q_result)) = (iter.next(), iter.next()) {
        let i = i_result.map_err(to_io_error)? as f32 / max_val;
        let q = q_result.map_err(to_io_error)? as f32 / max_val;
        samples.push(IqSample::new(i, q));
    }

    Ok(samples)
}

/// Writes IQ samples as a stereo float32 WAV, suitable for inspection with
/// inspectrum or re-ingestion by `ReplaySdrDevice`.
pub fn write_iq_wav<P: AsRef<Path>>(path: P, samples: &[IqSample], sample_rate: u32) -> io::Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(to_io_error)?;
    for sample in samples {
        writer.write_sample(sample.i).map_err(to_io_error)?;
        writer.write_sample(sample.q).map_err(to_io_error)?;
    }
    writer.finalize().map_err(to_io_error)
}

fn to_io_error(e: hound::Error) -> io::Error {
    match e {
        hound::Error::IoError(io_err) => io_err,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}
