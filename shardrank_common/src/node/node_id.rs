use ::core::fmt::Display;

/// Identity of an accepted worker connection.
/// Identities are handed out in increasing order starting at 1, and the
/// zero-based partition index of a node is its identity minus one.
#[derive(Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub struct NodeId(u64);

impl NodeId {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn new(id: u64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Zero-based index of the partition owned by this node.
    pub fn partition_index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
