//! Conflict graph over a build.
//!
//! Nodes are the build's components; an undirected edge joins two components
//! whose pair failed at least one blocking rule, weighted by the number of
//! failing rules. The most connected node is the component whose replacement
//! clears the most conflicts.

use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzer::checker::PairReport;
use crate::model::ComponentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hotspot {
    pub component: ComponentId,
    /// Number of distinct components it conflicts with.
    pub degree: usize,
    /// Failing rules across all of its conflicts.
    pub failing_rules: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConflictGraph {
    graph: UnGraph<ComponentId, usize>,
    nodes: BTreeMap<ComponentId, NodeIndex>,
}

impl ConflictGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reports<'r>(reports: impl IntoIterator<Item = &'r PairReport>) -> Self {
        let mut graph = Self::new();
        for report in reports {
            let blocking = report.blocking_failures().count();
            if blocking > 0 {
                graph.add_conflict(report.first, report.second, blocking);
            }
        }
        graph
    }

    fn node(&mut self, id: ComponentId) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id);
        self.nodes.insert(id, idx);
        idx
    }

    /// Record `weight` failing rules between `a` and `b`.
    pub fn add_conflict(&mut self, a: ComponentId, b: ComponentId, weight: usize) {
        let (ia, ib) = (self.node(a), self.node(b));
        match self.graph.find_edge(ia, ib) {
            Some(edge) => self.graph[edge] += weight,
            None => {
                self.graph.add_edge(ia, ib, weight);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn conflict_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Components `id` conflicts with, in id order.
    pub fn neighbors(&self, id: ComponentId) -> Vec<ComponentId> {
        let Some(&idx) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut out: Vec<ComponentId> = self.graph.neighbors(idx).map(|n| self.graph[n]).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Components ordered by conflict degree, then failing rules, then id.
    pub fn hotspots(&self) -> Vec<Hotspot> {
        let mut spots: Vec<Hotspot> = self
            .nodes
            .iter()
            .map(|(&component, &idx)| Hotspot {
                component,
                degree: self.graph.neighbors(idx).count(),
                failing_rules: self.graph.edges(idx).map(|e| *e.weight()).sum(),
            })
            .collect();
        spots.sort_by(|a, b| {
            b.degree
                .cmp(&a.degree)
                .then(b.failing_rules.cmp(&a.failing_rules))
                .then(a.component.cmp(&b.component))
        });
        spots
    }

    /// Top hotspot, if it conflicts with at least `min_degree` components.
    pub fn top_hotspot(&self, min_degree: usize) -> Option<Hotspot> {
        self.hotspots().into_iter().next().filter(|h| h.degree >= min_degree)
    }
}
