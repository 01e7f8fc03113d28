use siphasher::sip::SipHasher24;
use std::collections::BTreeMap;
use std::hash::Hasher;

/// Virtual nodes placed per physical node unless configured otherwise.
pub const DEFAULT_VIRTUAL_NODE_COUNT: usize = 500;

/// Anything that can be placed on the ring under a stable string key.
pub trait RingNode {
    fn key(&self) -> String;
}

/// 64-bit hash used for ring positions.
pub trait HashFunction {
    fn hash(&self, key: &str) -> u64;
}

/// SipHash-2-4 over the key bytes with zero keys. Every process computes the
/// same ring positions regardless of toolchain.
#[derive(Debug, Clone, Copy, Default)]
pub struct SipHashFunction;

impl HashFunction for SipHashFunction {
    fn hash(&self, key: &str) -> u64 {
        let mut hasher = SipHasher24::new_with_keys(0, 0);
        hasher.write(key.as_bytes());
        hasher.finish()
    }
}

/// One slice of a physical node's ownership of the ring.
#[derive(Debug, Clone)]
pub struct VirtualNode<T> {
    physical: T,
    replica_index: usize,
}

impl<T: RingNode + PartialEq> VirtualNode<T> {
    pub fn new(physical: T, replica_index: usize) -> Self {
        Self {
            physical,
            replica_index,
        }
    }

    pub fn physical(&self) -> &T {
        &self.physical
    }

    pub fn replica_index(&self) -> usize {
        self.replica_index
    }

    pub fn is_virtual_node_of(&self, node: &T) -> bool {
        &self.physical == node
    }
}

impl<T: RingNode> RingNode for VirtualNode<T> {
    fn key(&self) -> String {
        format!("{}-{}", self.physical.key(), self.replica_index)
    }
}

pub struct ConsistentHashRouter<T, H = SipHashFunction> {
    ring: BTreeMap<u64, VirtualNode<T>>,
    hash_function: H,
}

impl<T> ConsistentHashRouter<T, SipHashFunction>
where
    T: RingNode + Clone + PartialEq,
{
    pub fn new<I>(nodes: I, virtual_node_count: usize) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::with_hash_function(nodes, virtual_node_count, SipHashFunction)
    }
}

impl<T, H> ConsistentHashRouter<T, H>
where
    T: RingNode + Clone + PartialEq,
    H: HashFunction,
{
    pub fn with_hash_function<I>(nodes: I, virtual_node_count: usize, hash_function: H) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut router = Self {
            ring: BTreeMap::new(),
            hash_function,
        };
        for node in nodes {
            router.add_node(node, virtual_node_count);
        }
        router
    }

    /// Places `virtual_node_count` more virtual nodes for `node`. Indexes
    /// continue after the ones already on the ring, so repeated calls extend
    /// the node's share instead of overwriting it.
    pub fn add_node(&mut self, node: T, virtual_node_count: usize) {
        let existing = self.existing_replicas(&node);
        for i in 0..virtual_node_count {
            let vnode = VirtualNode::new(node.clone(), existing + i);
            let position = self.hash_function.hash(&vnode.key());
            self.ring.insert(position, vnode);
        }
        tracing::debug!(
            "Added {} virtual nodes for {} (ring size {})",
            virtual_node_count,
            node.key(),
            self.ring.len()
        );
    }

    pub fn remove_node(&mut self, node: &T) {
        self.ring.retain(|_, vnode| !vnode.is_virtual_node_of(node));
    }

    /// Returns the physical node owning `key`, or `None` on an empty ring.
    pub fn route_node(&self, key: &str) -> Option<&T> {
        let hash = self.hash_function.hash(key);
        self.ring
            .range(hash..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, vnode)| vnode.physical())
    }

    pub fn existing_replicas(&self, node: &T) -> usize {
        self.ring
            .values()
            .filter(|vnode| vnode.is_virtual_node_of(node))
            .count()
    }

    /// Distinct physical nodes currently placed on the ring.
    pub fn nodes(&self) -> Vec<T> {
        let mut nodes: Vec<T> = Vec::new();
        for vnode in self.ring.values() {
            if !nodes.contains(vnode.physical()) {
                nodes.push(vnode.physical().clone());
            }
        }
        nodes
    }

    /// Number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
