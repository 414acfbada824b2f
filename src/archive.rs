//! Pure-Rust archive container: the preferred on-disk format for a
//! [`TreeSequence`], replacing the teacher's HDF5/kastore binding with a
//! `bincode`+`serde` encoding of the same logical schema (see `DESIGN.md`).
//!
//! Every dataset's serialized bytes carry a Fletcher32 checksum, verified on
//! load before the bytes are trusted.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::newtypes::{Locus, NodeId, Time};
use crate::record::CoalescenceRecord;
use crate::treeseq::TreeSequence;

const FORMAT_VERSION: (u32, u32) = (1, 0);

bitflags::bitflags! {
    /// Reserved for interface compatibility with the teacher's table-collection
    /// flags; this container has no library handle to skip tearing down, so no
    /// bit currently changes behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ArchiveFlags: u32 {
        const NONE = 0;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Checksummed {
    bytes: Vec<u8>,
    checksum: u32,
}

impl Checksummed {
    fn encode<T: Serialize>(value: &T) -> Result<Self> {
        let bytes = bincode::serialize(value).map_err(|e| SimError::FileFormat(e.to_string()))?;
        let checksum = fletcher32(&bytes);
        Ok(Self { bytes, checksum })
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        if fletcher32(&self.bytes) != self.checksum {
            return Err(SimError::FileFormat("fletcher32 checksum mismatch".into()));
        }
        bincode::deserialize(&self.bytes).map_err(|e| SimError::FileFormat(e.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TreesData {
    left: Vec<u32>,
    right: Vec<u32>,
    node: Vec<u32>,
    children: Vec<[u32; 2]>,
    time: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MutationsData {
    node: Vec<u32>,
    position: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveFile {
    format_version: (u32, u32),
    sample_size: u32,
    num_loci: u32,
    environment: String,
    parameters: String,
    trees: Checksummed,
    mutations: Option<Checksummed>,
}

/// Compute the Fletcher-32 checksum of `data`, padding an odd trailing byte
/// with zero as the standard defines.
fn fletcher32(data: &[u8]) -> u32 {
    let mut c0: u32 = 0;
    let mut c1: u32 = 0;
    for chunk in data.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_le_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_le_bytes([chunk[0], 0])
        };
        c0 = (c0 + word as u32) % 0xFFFF;
        c1 = (c1 + c0) % 0xFFFF;
    }
    (c1 << 16) | c0
}

/// Write `ts` to `path` in the archive format, tagging it with free-form
/// `environment`/`parameters` JSON strings.
pub fn dump(ts: &TreeSequence, path: impl AsRef<Path>, environment: &str, parameters: &str, _flags: ArchiveFlags) -> Result<()> {
    let trees = TreesData {
        left: ts.left_col().iter().map(|l| l.get()).collect(),
        right: ts.right_col().iter().map(|l| l.get()).collect(),
        node: ts.node_col().iter().map(|n| n.get()).collect(),
        children: ts.children_col().iter().map(|c| [c[0].get(), c[1].get()]).collect(),
        time: ts.time_col().iter().map(|t| t.get()).collect(),
    };
    let mutations = if ts.get_num_mutations() > 0 {
        let (node, position): (Vec<u32>, Vec<f64>) = ts.mutations().map(|(n, p)| (n.get(), p)).unzip();
        Some(Checksummed::encode(&MutationsData { node, position })?)
    } else {
        None
    };

    let file = ArchiveFile {
        format_version: FORMAT_VERSION,
        sample_size: ts.get_num_samples(),
        num_loci: ts.get_num_loci(),
        environment: environment.to_string(),
        parameters: parameters.to_string(),
        trees: Checksummed::encode(&trees)?,
        mutations,
    };

    let bytes = bincode::serialize(&file).map_err(|e| SimError::FileFormat(e.to_string()))?;
    let mut f = File::create(path)?;
    f.write_all(&bytes)?;
    Ok(())
}

/// Load a tree sequence previously written by [`dump`], rejecting a
/// mismatched major format version.
pub fn load(path: impl AsRef<Path>, _flags: ArchiveFlags) -> Result<TreeSequence> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    let file: ArchiveFile =
        bincode::deserialize(&bytes).map_err(|_| SimError::FileFormat("not a coalsim archive".into()))?;

    if file.format_version.0 != FORMAT_VERSION.0 {
        return Err(SimError::FileVersion {
            found: file.format_version,
            expected: FORMAT_VERSION,
        });
    }

    let trees: TreesData = file.trees.decode()?;
    let r = trees.left.len();
    let mut records = Vec::with_capacity(r);
    for i in 0..r {
        records.push(CoalescenceRecord::new(
            Locus::new(trees.left[i]),
            Locus::new(trees.right[i]),
            NodeId::from(trees.node[i]),
            [NodeId::from(trees.children[i][0]), NodeId::from(trees.children[i][1])],
            Time::new(trees.time[i]),
        ));
    }
    let mut ts = TreeSequence::from_records(file.sample_size, file.num_loci, records);

    if let Some(m) = file.mutations {
        let m: MutationsData = m.decode()?;
        let pairs = m.node.into_iter().map(NodeId::from).zip(m.position).collect();
        ts.set_mutations(pairs)?;
    }

    Ok(ts)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::newtypes::Time as T;

    fn sample_ts() -> TreeSequence {
        let rec = CoalescenceRecord::new(Locus::new(1), Locus::new(11), NodeId::from(3), [NodeId::from(1), NodeId::from(2)], T::new(1.5));
        TreeSequence::from_records(2, 10, vec![rec])
    }

    #[test]
    fn round_trips_through_a_temp_file() {
        let ts = sample_ts();
        let path = std::env::temp_dir().join(format!("coalsim-archive-test-{}.bin", std::process::id()));
        dump(&ts, &path, "{}", "{}", ArchiveFlags::empty()).unwrap();
        let loaded = load(&path, ArchiveFlags::empty()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.get_num_samples(), ts.get_num_samples());
        assert_eq!(loaded.get_num_records(), ts.get_num_records());
        assert_eq!(loaded.get_record(0, crate::treeseq::RecordOrder::Time), ts.get_record(0, crate::treeseq::RecordOrder::Time));
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let ts = sample_ts();
        let path = std::env::temp_dir().join(format!("coalsim-archive-corrupt-{}.bin", std::process::id()));
        dump(&ts, &path, "{}", "{}", ArchiveFlags::empty()).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();
        let err = load(&path, ArchiveFlags::empty());
        std::fs::remove_file(&path).ok();
        assert!(err.is_err());
    }

    #[test]
    fn fletcher32_matches_known_vector() {
        assert_eq!(fletcher32(b"abcde"), 0xF04FC729);
    }
}
