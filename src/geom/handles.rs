//! Arena index handles.
//!
//! Sectors, linedefs and sides would otherwise need raw back-pointers
//! (sector ↔ linedef ↔ sector) to cross-reference each other. Plain
//! integer indices into level-owned `Vec`s break that cycle instead.

use std::fmt;

macro_rules! handle {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle!(VertexId);
handle!(LinedefId);
handle!(SectorId);
handle!(LightId);
