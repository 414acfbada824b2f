//! Strongly-typed wrappers around the small integer/float values that flow
//! through the simulator and tree sequence, so that a node id can never be
//! silently compared against a locus or a time value.

use std::fmt;

macro_rules! impl_id_traits {
    ($name:ident, $null:expr) => {
        #[repr(transparent)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
        pub struct $name(u32);

        impl $name {
            /// Sentinel value meaning "no such id".
            pub const NULL: $name = $name($null);

            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u32 {
                self.0
            }

            pub fn is_null(self) -> bool {
                self.0 == $null
            }

            pub fn as_usize(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_null() {
                    write!(f, "NULL")
                } else {
                    write!(f, "{}", self.0)
                }
            }
        }

        impl PartialEq<u32> for $name {
            fn eq(&self, other: &u32) -> bool {
                self.0 == *other
            }
        }
    };
}

// An integer identifying an individual in the ancestral recombination graph.
//
// Sample nodes occupy `1..=n`; internal nodes are assigned in strictly increasing
// order as coalescences occur. The value `0` is never a live node id under this
// crate's convention — it is reserved as the "null parent" sentinel inside the dense
// arrays maintained by the sparse tree; see `NodeId::NULL` for the distinct "no such
// node at all" sentinel used elsewhere (e.g. an empty children slot).
//
// assert_eq!(NodeId::from(1), 1u32);
// assert!(NodeId::from(1) < NodeId::from(2));
// assert_eq!(format!("{}", NodeId::NULL), "NULL");
impl_id_traits!(NodeId, u32::MAX);

// A mutation ID: a row index into a tree sequence's mutation columns.
impl_id_traits!(MutationId, u32::MAX);

impl NodeId {
    /// `true` for sample nodes, i.e. ids in `1..=n`.
    pub fn is_sample(self, n: u32) -> bool {
        self.0 >= 1 && self.0 <= n
    }
}

/// A 1-based genomic locus in `1..=m`, or a half-open interval endpoint.
///
/// Wraps [`u32`]. Subtracting two loci yields a raw link count.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Locus(u32);

impl Locus {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Locus {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Locus> for u32 {
    fn from(value: Locus) -> Self {
        value.0
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Sub for Locus {
    type Output = u32;
    fn sub(self, rhs: Self) -> u32 {
        self.0 - rhs.0
    }
}

/// A point in time, measured backwards from the present (time `0`) towards the
/// past. Wraps [`f64`].
///
/// # Examples
///
/// ```
/// use coalsim::Time;
///
/// let t0 = Time::from(2.0);
/// let t1 = Time::from(10.0);
/// assert_eq!((t0 + t1).get(), 12.0);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(f64);

impl Time {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> f64 {
        self.0
    }
}

impl From<f64> for Time {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Time> for f64 {
    fn from(value: Time) -> Self {
        value.0
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Time {
    type Output = Time;
    fn add(self, rhs: Self) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Time {
    type Output = Time;
    fn sub(self, rhs: Self) -> Time {
        Time(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn node_id_null_displays_as_null() {
        assert_eq!(format!("{}", NodeId::NULL), "NULL");
        assert_eq!(format!("{}", NodeId::from(7u32)), "7");
    }

    #[test]
    fn node_id_compares_to_raw_integer() {
        let n = NodeId::from(3u32);
        assert_eq!(n, 3u32);
        assert!(n < NodeId::from(4u32));
    }

    #[test]
    fn locus_subtraction_gives_link_count() {
        let l = Locus::new(10);
        let r = Locus::new(13);
        assert_eq!(r - l, 3);
    }
}
