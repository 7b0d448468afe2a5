//! Bounded best-first frontier.
//!
//! Nodes are kept sorted by ascending cost in a fixed-capacity vector;
//! pushing beyond capacity drops the costliest entry. The frontier is small
//! (around a hundred nodes), so ordered insertion beats heap bookkeeping.

use super::dic_node::DicNode;

pub(crate) struct DicNodeVector {
    nodes: Vec<DicNode>,
    capacity: usize,
}

impl DicNodeVector {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: DicNode) {
        let at = self.nodes.partition_point(|n| n.cost <= node.cost);
        if at >= self.capacity {
            return;
        }
        self.nodes.insert(at, node);
        self.nodes.truncate(self.capacity);
    }

    /// Remove and return the lowest-cost node.
    pub fn pop_best(&mut self) -> Option<DicNode> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(self.nodes.remove(0))
        }
    }

    pub fn best_cost(&self) -> Option<f32> {
        self.nodes.first().map(|n| n.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::NOT_A_DICT_POS;

    fn node_with_cost(cost: f32) -> DicNode {
        let mut node = DicNode::root(0, NOT_A_DICT_POS);
        node.cost = cost;
        node
    }

    #[test]
    fn test_pops_in_cost_order() {
        let mut frontier = DicNodeVector::new(8);
        for cost in [3.0, 1.0, 2.0] {
            frontier.push(node_with_cost(cost));
        }
        assert_eq!(frontier.best_cost(), Some(1.0));
        assert_eq!(frontier.pop_best().unwrap().cost, 1.0);
        assert_eq!(frontier.pop_best().unwrap().cost, 2.0);
        assert_eq!(frontier.pop_best().unwrap().cost, 3.0);
        assert!(frontier.pop_best().is_none());
    }

    #[test]
    fn test_capacity_drops_costliest() {
        let mut frontier = DicNodeVector::new(2);
        frontier.push(node_with_cost(1.0));
        frontier.push(node_with_cost(5.0));
        frontier.push(node_with_cost(2.0));
        assert_eq!(frontier.pop_best().unwrap().cost, 1.0);
        assert_eq!(frontier.pop_best().unwrap().cost, 2.0);
        assert!(frontier.pop_best().is_none());
    }
}
