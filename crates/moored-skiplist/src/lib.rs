//! An ordered multiset built on circular per-level doubly-linked rings.
//!
//! [`RingSkiplist`] keeps its elements sorted under a caller-supplied [`Comparator`],
//! hands out stable [`SkipNode`] handles on insertion, and supports handle-based
//! deletion, level-0 neighbor walks, and iteration. Each node and the head vector live
//! in single-allocation header blocks from [`moored_core`]; node heights are sampled
//! from the deterministic [`moored_core::Lcg64`].

mod head;
mod list;
mod node;


pub use self::list::{Iter, RingSkiplist};
pub use self::node::SkipNode;

pub use moored_core::{Comparator, OrdComparator};
