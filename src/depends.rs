use std::collections::BTreeMap;
use std::collections::VecDeque;

/// A dependency graph over values of `T`, sorted with Kahn's algorithm.
///
/// The sort is deterministic: ties are broken by insertion order, so a fixed
/// set of nodes and edges always yields the same order.
#[derive(Debug, Clone)]
pub struct Depends<T> {
    nodes: Vec<T>,
    edges: Vec<(usize, usize)>,
}

/// The nodes that could not be ordered because they sit on a cycle,
/// in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDetected<T>(pub Vec<T>);

impl<T: Eq + Clone + Ord + std::fmt::Debug> Depends<T> {
    pub fn new() -> Depends<T> {
        Depends {
            nodes: vec![],
            edges: vec![],
        }
    }

    pub fn add(&mut self, t: T) {
        if !self.nodes.contains(&t) {
            self.nodes.push(t);
        }
    }

    /// Record that `after` depends on `before`.
    pub fn add_dependency(&mut self, before: T, after: T) {
        self.add(before.clone());
        self.add(after.clone());

        let edge = (self.index_of(&before), self.index_of(&after));
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    fn index_of(&self, t: &T) -> usize {
        for (i, node) in self.nodes.iter().enumerate() {
            if node == t {
                return i;
            }
        }
        unreachable!("node was added before lookup")
    }

    pub fn sort(&self) -> Result<Vec<T>, CycleDetected<T>> {
        let mut in_degree: Vec<usize> = vec![0; self.nodes.len()];
        let mut dependents: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (before, after) in &self.edges {
            in_degree[*after] += 1;
            dependents.entry(*before).or_default().push(*after);
        }

        let mut queue: VecDeque<usize> = VecDeque::new();
        for (i, degree) in in_degree.iter().enumerate() {
            if *degree == 0 {
                queue.push_back(i);
            }
        }

        let mut order: Vec<usize> = vec![];
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &dependent in dependents.get(&i).map(|ds| ds.as_slice()).unwrap_or(&[]) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let mut ordered = vec![false; self.nodes.len()];
            for &i in &order {
                ordered[i] = true;
            }
            let stuck = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| !ordered[*i])
                .map(|(_, node)| node.clone())
                .collect();
            return Err(CycleDetected(stuck));
        }

        Ok(order.into_iter().map(|i| self.nodes[i].clone()).collect())
    }
}
