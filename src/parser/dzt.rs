//! DZT mark detection
//!
//! A DZT is a 1024-byte header block per channel followed by the scans.
//! Only the fields needed to walk the data are decoded. Marks are scans
//! whose first sample in the selected channel exceeds an amplitude
//! threshold.

use crate::error::{DzgError, FileType, Result};
use crate::parser::stream::DztDataStream;
use crate::types::{MarkSource, MarkStore};
use log::{debug, info, warn};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const HEADER_BLOCK_SIZE: usize = 1024;
const RH_SPS_OFFSET: usize = 10;
const RH_NCHAN_OFFSET: usize = 52;
const RH_SYSTEM_OFFSET: usize = 113;

/// Header fields needed to locate and decode the scans
#[derive(Debug, Clone, PartialEq)]
pub struct DztHeader {
    pub data_offset: usize,
    pub samples_per_scan: usize,
    pub bits: u16,
    pub scans_per_second: f32,
    pub channels: usize,
    pub system_id: u8,
}

/// Decoded amplitude data for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct DztRecord {
    pub system_id: u8,
    pub samples_per_scan: usize,
    pub scans_per_second: f32,
    /// One amplitude vector per scan
    pub channel_samples: Vec<Vec<i32>>,
}

/// Mark detection settings for DZT input
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DztPolicy {
    /// A scan is a mark when its first sample exceeds this value
    pub amplitude_threshold: i32,
    /// Required `rh_system` value; `None` accepts any system
    pub system_id: Option<u8>,
    /// Channel searched for marks
    pub channel: usize,
}

impl Default for DztPolicy {
    fn default() -> Self {
        Self {
            amplitude_threshold: 20_000,
            system_id: Some(3),
            channel: 0,
        }
    }
}

/// Decode the header block at the start of `data`
pub fn parse_dzt_header(data: &[u8]) -> Result<DztHeader> {
    if data.len() < HEADER_BLOCK_SIZE {
        return Err(DzgError::format(
            FileType::Dzt,
            format!(
                "file is {} bytes, shorter than one {} byte header",
                data.len(),
                HEADER_BLOCK_SIZE
            ),
        ));
    }

    let mut stream = DztDataStream::new(data);
    let tag = stream.read_u16()?;
    if tag & 0x00ff != 0x00ff {
        return Err(DzgError::format(
            FileType::Dzt,
            format!("header tag 0x{:04x} is not a GSSI tag", tag),
        ));
    }
    let rh_data = stream.read_u16()? as usize;
    let samples_per_scan = stream.read_u16()? as usize;
    let bits = stream.read_u16()?;

    stream.set_position(RH_SPS_OFFSET);
    let scans_per_second = stream.read_f32()?;

    stream.set_position(RH_NCHAN_OFFSET);
    let channels = stream.read_u16()? as usize;

    stream.set_position(RH_SYSTEM_OFFSET);
    let system_id = (stream.read_byte()? >> 3) & 0x1f;

    if samples_per_scan == 0 {
        return Err(DzgError::format(FileType::Dzt, "header declares 0 samples per scan"));
    }
    if !matches!(bits, 8 | 16 | 32) {
        return Err(DzgError::format(
            FileType::Dzt,
            format!("header declares unsupported sample width of {} bits", bits),
        ));
    }
    if channels == 0 {
        return Err(DzgError::format(FileType::Dzt, "header declares 0 channels"));
    }

    let data_offset = if rh_data < HEADER_BLOCK_SIZE {
        HEADER_BLOCK_SIZE * rh_data
    } else {
        HEADER_BLOCK_SIZE * channels
    };
    if data_offset < HEADER_BLOCK_SIZE {
        return Err(DzgError::format(
            FileType::Dzt,
            format!("data offset {} lies inside the header", data_offset),
        ));
    }

    Ok(DztHeader {
        data_offset,
        samples_per_scan,
        bits,
        scans_per_second,
        channels,
        system_id,
    })
}

/// Decode the header and the scans of one channel
pub fn decode_dzt(data: &[u8], channel: usize) -> Result<DztRecord> {
    let header = parse_dzt_header(data)?;
    debug!("DZT header: {:?}", header);

    if channel >= header.channels {
        return Err(DzgError::format(
            FileType::Dzt,
            format!(
                "channel {} requested but the file has {} channel(s)",
                channel, header.channels
            ),
        ));
    }
    if data.len() < header.data_offset {
        return Err(DzgError::format(
            FileType::Dzt,
            format!(
                "file ends at byte {} before the data offset {}",
                data.len(),
                header.data_offset
            ),
        ));
    }

    let mut stream = DztDataStream::new(data);
    stream.set_position(header.data_offset);

    let sample_bytes = header.bits as usize / 8;
    let scan_bytes = sample_bytes * header.samples_per_scan * header.channels;
    let data_bytes = stream.remaining();
    let scans = data_bytes / scan_bytes;
    if data_bytes % scan_bytes != 0 {
        warn!(
            "ignoring {} trailing bytes after the last complete scan",
            data_bytes % scan_bytes
        );
    }

    let mut channel_samples = Vec::with_capacity(scans);
    for scan in 0..scans {
        let start = header.data_offset
            + scan * scan_bytes
            + channel * header.samples_per_scan * sample_bytes;
        stream.set_position(start);
        let mut samples = Vec::with_capacity(header.samples_per_scan);
        for _ in 0..header.samples_per_scan {
            samples.push(stream.read_sample(header.bits)?);
        }
        channel_samples.push(samples);
    }

    Ok(DztRecord {
        system_id: header.system_id,
        samples_per_scan: header.samples_per_scan,
        scans_per_second: header.scans_per_second,
        channel_samples,
    })
}

/// Detect marks in a decoded channel.
///
/// The result always starts with scan 0 and ends with the scan count. A
/// threshold crossing at scan 0 is the start mark itself and is not
/// repeated.
pub fn marks_from_record(record: &DztRecord, policy: &DztPolicy) -> Result<MarkStore> {
    if let Some(expected) = policy.system_id {
        if record.system_id != expected {
            return Err(DzgError::format(
                FileType::Dzt,
                format!(
                    "system id {} is not the expected {} (disable the check to read other systems)",
                    record.system_id, expected
                ),
            ));
        }
    }

    let mut store = MarkStore::new(MarkSource::Dzt);
    for (scan, samples) in record.channel_samples.iter().enumerate() {
        let crossed = samples
            .first()
            .map_or(false, |&amplitude| amplitude > policy.amplitude_threshold);
        if !crossed {
            continue;
        }
        if scan == 0 {
            debug!("threshold crossing at scan 0 is the start mark");
            continue;
        }
        store.push(scan as u64);
    }
    store.push(record.channel_samples.len() as u64);
    Ok(store)
}

/// Read a DZT file and detect its marks
pub fn read_dzt(path: &Path, policy: &DztPolicy) -> Result<MarkStore> {
    let data = std::fs::read(path)?;
    let record = decode_dzt(&data, policy.channel)?;
    let store = marks_from_record(&record, policy)?;
    info!(
        "DZT read successful. marks: {}, traces: {}",
        store.len(),
        record.channel_samples.len()
    );
    if record.scans_per_second > 0.0 {
        info!(
            "DZT recording length: {:.1} s at {} scans per second",
            record.channel_samples.len() as f32 / record.scans_per_second,
            record.scans_per_second
        );
    }
    Ok(store)
}
