//! Dependency graph and cycle detection
//!
//! Edges point from a task to each id it depends on. Ids that no task in the
//! batch carries still become nodes, they simply have no outgoing edges.

use std::collections::HashMap;

use crate::models::Task;

/// Visitation state of a node during the depth-first walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Adjacency-list view of a batch's "depends on" relation
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    ids: Vec<&'a str>,
    index: HashMap<&'a str, usize>,
    edges: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// Builds the graph; tasks sharing an id collapse into a single node
    pub fn build(tasks: &'a [Task]) -> Self {
        let mut graph = Self {
            ids: Vec::with_capacity(tasks.len()),
            index: HashMap::with_capacity(tasks.len()),
            edges: Vec::with_capacity(tasks.len()),
        };

        for task in tasks {
            let from = graph.intern(&task.id);
            for dependency in &task.dependencies {
                let to = graph.intern(dependency);
                graph.edges[from].push(to);
            }
        }

        graph
    }

    fn intern(&mut self, id: &'a str) -> usize {
        if let Some(&node) = self.index.get(id) {
            return node;
        }
        let node = self.ids.len();
        self.ids.push(id);
        self.index.insert(id, node);
        self.edges.push(Vec::new());
        node
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Returns the first cycle reached by an iterative three-color DFS.
    ///
    /// Every unvisited node is used as a root, in first-seen order, so
    /// disconnected components are all covered. Runs in O(V + E).
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut state = vec![Visit::Unvisited; self.ids.len()];
        // (node, index of the next outgoing edge to follow)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.ids.len() {
            if state[root] != Visit::Unvisited {
                continue;
            }
            state[root] = Visit::InProgress;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                match self.edges[node].get(frame.1) {
                    Some(&next) => {
                        frame.1 += 1;
                        match state[next] {
                            Visit::Unvisited => {
                                state[next] = Visit::InProgress;
                                stack.push((next, 0));
                            }
                            Visit::InProgress => return Some(self.cycle_path(&stack, next)),
                            Visit::Done => {}
                        }
                    }
                    None => {
                        state[node] = Visit::Done;
                        stack.pop();
                    }
                }
            }
        }

        None
    }

    /// The stack suffix starting at `start`, closed by repeating `start`
    fn cycle_path(&self, stack: &[(usize, usize)], start: usize) -> Vec<String> {
        let from = stack
            .iter()
            .position(|&(node, _)| node == start)
            .unwrap_or(0);

        stack[from..]
            .iter()
            .map(|&(node, _)| self.ids[node])
            .chain(std::iter::once(self.ids[start]))
            .map(str::to_string)
            .collect()
    }
}

/// True iff following `dependencies` from some task eventually returns to it
pub fn has_cycle(tasks: &[Task]) -> bool {
    find_cycle(tasks).is_some()
}

/// The first dependency cycle found, as an id path such as `A -> B -> A`
pub fn find_cycle(tasks: &[Task]) -> Option<Vec<String>> {
    DependencyGraph::build(tasks).find_cycle()
}
