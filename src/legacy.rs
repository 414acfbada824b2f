//! The deprecated legacy flat-file tree format: a fixed 28-byte header, a
//! run of 20-byte coalescence-record blobs, and a JSON metadata trailer.
//!
//! Kept for backwards compatibility with files written by older tooling; new
//! code should prefer [`crate::archive`].

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::newtypes::{Locus, NodeId, Time};
use crate::record::CoalescenceRecord;
use crate::treeseq::TreeSequence;

const MAGIC: u32 = 0xa52cd4a4;
const VERSION: u32 = 1;
const HEADER_LEN: usize = 28;
const BLOB_LEN: usize = 20;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LegacyFlags: u32 {
        const COMPLETE = 1 << 0;
        const SORTED = 1 << 1;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Trailer {
    environment: String,
    parameters: String,
}

/// Write `ts` in the legacy flat format. `right` is not stored; it is
/// reconstructed by [`load`] when the records are sorted back into a tree
/// sequence.
pub fn dump_legacy(ts: &TreeSequence, path: impl AsRef<Path>, flags: LegacyFlags, environment: &str, parameters: &str) -> Result<()> {
    let mut out = Vec::with_capacity(HEADER_LEN + ts.get_num_records() * BLOB_LEN);
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&ts.get_num_samples().to_le_bytes());
    out.extend_from_slice(&ts.get_num_loci().to_le_bytes());
    out.extend_from_slice(&flags.bits().to_le_bytes());
    out.extend_from_slice(&(HEADER_LEN as u64 + (ts.get_num_records() * BLOB_LEN) as u64).to_le_bytes());
    debug_assert_eq!(out.len(), HEADER_LEN);

    for i in 0..ts.get_num_records() {
        let rec = ts.get_record(i, crate::treeseq::RecordOrder::Time).expect("i < num_records");
        out.extend_from_slice(&rec.left.get().to_le_bytes());
        out.extend_from_slice(&rec.children[0].get().to_le_bytes());
        out.extend_from_slice(&rec.children[1].get().to_le_bytes());
        out.extend_from_slice(&rec.node.get().to_le_bytes());
        out.extend_from_slice(&(rec.time.get() as f32).to_bits().to_le_bytes());
    }

    let trailer = Trailer {
        environment: environment.to_string(),
        parameters: parameters.to_string(),
    };
    let trailer_json = serde_json::to_vec(&trailer).map_err(|e| SimError::FileFormat(e.to_string()))?;
    out.extend_from_slice(&trailer_json);

    let mut f = File::create(path)?;
    f.write_all(&out)?;
    Ok(())
}

/// Load a legacy flat file, inferring each record's `right` boundary from the
/// left boundary of the record that starts immediately after it at the same
/// locus once records are sorted by (`left`, `time`).
pub fn load_legacy(path: impl AsRef<Path>) -> Result<TreeSequence> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    if bytes.len() < HEADER_LEN {
        return Err(SimError::FileFormat("file shorter than legacy header".into()));
    }

    let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(SimError::FileFormat("bad magic number".into()));
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(SimError::UnsupportedFileVersion(version, 0));
    }
    let sample_size = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let num_loci = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
    let _flags = LegacyFlags::from_bits_truncate(u32::from_le_bytes(bytes[16..20].try_into().unwrap()));
    let metadata_offset = u64::from_le_bytes(bytes[20..28].try_into().unwrap()) as usize;

    if metadata_offset > bytes.len() || (metadata_offset - HEADER_LEN) % BLOB_LEN != 0 {
        return Err(SimError::FileFormat("bad metadata offset".into()));
    }
    let num_records = (metadata_offset - HEADER_LEN) / BLOB_LEN;

    struct Raw {
        left: u32,
        child0: u32,
        child1: u32,
        parent: u32,
        time: f32,
    }
    let mut raw = Vec::with_capacity(num_records);
    for i in 0..num_records {
        let off = HEADER_LEN + i * BLOB_LEN;
        let blob = &bytes[off..off + BLOB_LEN];
        raw.push(Raw {
            left: u32::from_le_bytes(blob[0..4].try_into().unwrap()),
            child0: u32::from_le_bytes(blob[4..8].try_into().unwrap()),
            child1: u32::from_le_bytes(blob[8..12].try_into().unwrap()),
            parent: u32::from_le_bytes(blob[12..16].try_into().unwrap()),
            time: f32::from_bits(u32::from_le_bytes(blob[16..20].try_into().unwrap())),
        });
    }

    raw.sort_by(|a, b| a.left.cmp(&b.left).then(a.time.partial_cmp(&b.time).unwrap()));

    let mut records = Vec::with_capacity(num_records);
    for i in 0..num_records {
        let right = raw[i + 1..]
            .iter()
            .find(|r| r.left > raw[i].left)
            .map(|r| r.left)
            .unwrap_or(num_loci + 1);
        records.push(CoalescenceRecord::new(
            Locus::new(raw[i].left),
            Locus::new(right),
            NodeId::from(raw[i].parent),
            [NodeId::from(raw[i].child0), NodeId::from(raw[i].child1)],
            Time::new(raw[i].time as f64),
        ));
    }

    Ok(TreeSequence::from_records(sample_size, num_loci, records))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::newtypes::Time as T;

    #[test]
    fn round_trips_single_record() {
        let rec = CoalescenceRecord::new(Locus::new(1), Locus::new(11), NodeId::from(3), [NodeId::from(1), NodeId::from(2)], T::new(1.5));
        let ts = TreeSequence::from_records(2, 10, vec![rec]);
        let path = std::env::temp_dir().join(format!("coalsim-legacy-test-{}.trees", std::process::id()));
        dump_legacy(&ts, &path, LegacyFlags::COMPLETE | LegacyFlags::SORTED, "{}", "{}").unwrap();
        let loaded = load_legacy(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.get_num_samples(), 2);
        assert_eq!(loaded.get_num_records(), 1);
        let r = loaded.get_record(0, crate::treeseq::RecordOrder::Time).unwrap();
        assert_eq!(r.left, Locus::new(1));
        assert_eq!(r.right, Locus::new(11));
    }

    #[test]
    fn rejects_bad_magic() {
        let path = std::env::temp_dir().join(format!("coalsim-legacy-bad-{}.trees", std::process::id()));
        std::fs::write(&path, vec![0u8; HEADER_LEN]).unwrap();
        let err = load_legacy(&path);
        std::fs::remove_file(&path).ok();
        assert!(err.is_err());
    }
}
