use std::fmt::Debug;

/// Id of the living leaf in the store's hash function.
pub(crate) const ALIVE_ID: u32 = 2;

/// Id of the dead leaf in the store's hash function.
pub(crate) const DEAD_ID: u32 = 3;

/// Internal nodes get dense ids starting here.
pub(crate) const FIRST_ID: u32 = 4;

/// A handle to a node owned by a [`crate::store::Store`].
///
/// Handles are stable for as long as the node stays reachable from the universe: they survive
/// rehashes and garbage collections, while [`Node::id`] does not. Once a node is collected its
/// slot may be handed to a different node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);

impl NodeRef {
    /// The dead leaf, a 1x1 empty region.
    pub const DEAD: NodeRef = NodeRef(0);

    /// The living leaf.
    pub const ALIVE: NodeRef = NodeRef(1);

    pub const fn leaf(alive: bool) -> Self {
        if alive { Self::ALIVE } else { Self::DEAD }
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::DEAD => write!(f, "#dead"),
            Self::ALIVE => write!(f, "#alive"),
            NodeRef(i) => write!(f, "#{i}"),
        }
    }
}

/// A memoized future of a node, valid only under the epoch it was computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Memo {
    pub result: NodeRef,
    pub epoch: u32,
}

/// A `2^level` square made of four `2^(level - 1)` squares.
#[derive(Debug, Clone)]
pub struct Internal {
    /// `nw`, `ne`, `sw`, `se`
    pub(crate) children: [NodeRef; 4],

    pub(crate) level: u8,

    pub(crate) population: u128,

    /// Dense id used by the hash function. Reassigned on every rehash.
    pub(crate) id: u32,

    /// Next node in the same hash bucket
    pub(crate) next: Option<NodeRef>,

    /// This node, `2^step` generations later
    pub(crate) cache: Option<Memo>,

    /// This node, `2^(level - 2)` generations later
    pub(crate) quick_cache: Option<Memo>,
}

#[derive(Debug, Clone)]
pub enum Node {
    Leaf { alive: bool },
    Internal(Internal),
}

impl Node {
    pub fn level(&self) -> u8 {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal(n) => n.level,
        }
    }

    /// Number of living cells in the region
    pub fn population(&self) -> u128 {
        match self {
            Node::Leaf { alive } => *alive as u128,
            Node::Internal(n) => n.population,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Node::Leaf { alive: true } => ALIVE_ID,
            Node::Leaf { alive: false } => DEAD_ID,
            Node::Internal(n) => n.id,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// The `nw`, `ne`, `sw` and `se` quadrants, or `None` for a leaf.
    pub fn children(&self) -> Option<[NodeRef; 4]> {
        match self {
            Node::Leaf { .. } => None,
            Node::Internal(n) => Some(n.children),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Node;
    use super::NodeRef;

    #[test]
    fn leaves() {
        let alive = Node::Leaf { alive: true };
        let dead = Node::Leaf { alive: false };

        assert_eq!(alive.population(), 1);
        assert_eq!(dead.population(), 0);
        assert_eq!(alive.level(), 0);
        assert!(dead.is_leaf());
        assert_eq!(dead.children(), None);
        assert_ne!(alive.id(), dead.id());
    }

    #[test]
    fn leaf_refs() {
        assert_eq!(NodeRef::leaf(true), NodeRef::ALIVE);
        assert_eq!(NodeRef::leaf(false), NodeRef::DEAD);
        assert_eq!(format!("{:?}", NodeRef::from_index(7)), "#7");
    }
}
