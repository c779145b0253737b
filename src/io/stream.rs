use std::io::{self, BufReader, Read};
use std::net::TcpStream;

use crate::sample::IqSample;

/// Wire encoding of a raw IQ byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    Int8,
    Int16,
    Int32,
    Float32,
}

impl StreamFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            StreamFormat::Int8 => 2,
            StreamFormat::Int16 => 4,
            StreamFormat::Int32 => 8,
            StreamFormat::Float32 => 8,
        }
    }
}

/// Reads a raw IQ byte stream over TCP, a few samples at a time.
pub struct IqStreamReader {
    reader: BufReader<TcpStream>,
    format: StreamFormat,
}

impl IqStreamReader {
    pub fn connect(addr: &str, format: StreamFormat) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Ok(Self {
            reader: BufReader::new(stream),
            format,
        })
    }

    /// Reads exactly `num_samples` IQ pairs. Returns `None` on a clean
    /// connection close before any bytes of the next sample arrived.
    pub fn read_chunk(&mut self, num_samples: usize) -> io::Result<Option<Vec<IqSample>>> {
        let bytes_per_sample = self.format.bytes_per_sample();
        let mut buffer = vec![0u8; num_samples * bytes_per_sample];

        match self.reader.read_exact(&mut buffer) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        Ok(Some(decode(&buffer, self.format)))
    }
}

fn decode(buffer: &[u8], format: StreamFormat) -> Vec<IqSample> {
    match format {
        StreamFormat::Int8 => buffer
            .chunks_exact(2)
            .map(|c| IqSample::new((c[0] as i8) as f32 / 128.0, (c[1] as i8) as f32 / 128.0))
            .collect(),
        StreamFormat::Int16 => buffer
            .chunks_exact(4)
            .map(|c| {
                let i = i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0;
                let q = i16::from_le_bytes([c[2], c[3]]) as f32 / 32768.0;
                IqSample::new(i, q)
            })
            .collect(),
        StreamFormat::Int32 => buffer
            .chunks_exact(8)
            .map(|c| {
                let i = i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32 / 2147483648.0;
                let q = i32::from_le_bytes([c[4], c[5], c[6], c[7]]) as f32 / 2147483648.0;
                IqSample::new(i, q)
            })
            .collect(),
        StreamFormat::Float32 => buffer
            .chunks_exact(8)
            .map(|c| {
                let i = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                let q = f32::from_le_bytes([c[4], c[5], c[6], c[7]]);
                IqSample::new(i, q)
            })
            .collect(),
    }
}
