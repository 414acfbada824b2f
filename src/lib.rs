//! A coalescent-with-recombination simulator and tree-sequence toolkit.
//!
//! The core is a discrete-event simulation over ancestral segments
//! ([`simulator`]) that emits [`record::CoalescenceRecord`]s, which are then
//! assembled into a columnar [`treeseq::TreeSequence`] supporting efficient
//! left-to-right traversal of the marginal trees along the genome.

pub mod archive;
pub mod avl;
pub mod config;
pub mod diff;
pub mod error;
pub mod fenwick;
pub mod haplotypes;
pub mod legacy;
pub mod mutations;
pub mod newick;
pub mod newtypes;
pub mod node_mapping;
pub mod pool;
pub mod popmodel;
pub mod population;
pub mod record;
pub mod rng;
pub mod segment;
pub mod simulator;
pub mod sparsetree;
pub mod treeseq;

pub use config::SimulationConfig;
pub use error::{Result, SimError};
pub use newtypes::{Locus, MutationId, NodeId, Time};
pub use popmodel::{PopulationModel, PopulationModelKind};
pub use record::CoalescenceRecord;
pub use rng::{RandomSource, RngSource};
pub use simulator::{PauseReason, RunLimits, RunStatus, SimParams, Simulator};
pub use sparsetree::{SparseTree, TreeFlags};
pub use treeseq::{RecordOrder, TreeSequence};
