use crate::adapters::ForecastSource;
use crate::api::lib::formula_token;
use crate::core_logic::comparison::compare;
use crate::core_logic::metadata::Metadata;
use crate::core_logic::models::{ComparisonResult, Horizon, LeafResult, TimeSeriesPoint};
use crate::error::{Error, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// Area nodes with one child per formula.
    ByArea,
    /// Formula nodes with one child per area.
    ByFormula,
}

impl GroupingMode {
    /// `(area, formula)` for a child of the node called `node`.
    pub fn pair<'a>(self, node: &'a str, child: &'a str) -> (&'a str, &'a str) {
        match self {
            GroupingMode::ByArea => (node, child),
            GroupingMode::ByFormula => (child, node),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ChildState {
    NotFetched,
    Pending,
    Loaded(LeafResult),
    Unavailable { reason: String },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub total_forecast: f64,
    pub available: usize,
    pub unavailable: usize,
    /// Comparison over the pooled data of every available child.
    pub comparison: Option<ComparisonResult>,
}

#[derive(Serialize, Debug, Clone)]
pub struct AggregationNode {
    pub name: String,
    pub mode: GroupingMode,
    pub expanded: bool,
    pub children: BTreeMap<String, ChildState>,
    pub summary: Option<NodeSummary>,
    #[serde(skip)]
    generation: u64,
    /// Generation of the fetch currently outstanding, if any.
    #[serde(skip)]
    in_flight: Option<u64>,
    #[serde(skip)]
    loaded_horizon: Option<Horizon>,
}

impl AggregationNode {
    pub fn new(mode: GroupingMode, name: impl Into<String>, children: Vec<String>) -> Self {
        Self {
            name: name.into(),
            mode,
            expanded: false,
            children: children
                .into_iter()
                .map(|child| (child, ChildState::NotFetched))
                .collect(),
            summary: None,
            generation: 0,
            in_flight: None,
            loaded_horizon: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True once every child of the current expansion has settled.
    pub fn is_loaded(&self) -> bool {
        self.summary.is_some()
    }

    pub fn leaf(&self, child: &str) -> Option<&LeafResult> {
        match self.children.get(child) {
            Some(ChildState::Loaded(leaf)) => Some(leaf),
            _ => None,
        }
    }

    fn start_fetch(&mut self, horizon: Horizon) -> ExpansionTicket {
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.summary = None;
        self.loaded_horizon = None;
        for state in self.children.values_mut() {
            *state = ChildState::Pending;
        }

        ExpansionTicket {
            node: self.name.clone(),
            mode: self.mode,
            generation: self.generation,
            horizon,
            children: self.children.keys().cloned().collect(),
        }
    }

    /// Abandons the outstanding fetch, if any. Its outcome will no longer
    /// match the node's generation.
    fn cancel_fetch(&mut self) {
        if self.in_flight.is_some() {
            self.generation += 1;
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.in_flight = None;
        self.summary = None;
        self.loaded_horizon = None;
        for state in self.children.values_mut() {
            *state = ChildState::NotFetched;
        }
    }
}

/// The fetch work for one expansion of one node.
#[derive(Debug, Clone)]
pub struct ExpansionTicket {
    pub node: String,
    pub mode: GroupingMode,
    pub generation: u64,
    pub horizon: Horizon,
    pub children: Vec<String>,
}

impl ExpansionTicket {
    /// Fetches every child concurrently and waits for all of them to settle.
    /// A failed child becomes `Unavailable` without affecting its siblings.
    pub async fn run<S>(&self, source: &S) -> ExpansionOutcome
    where
        S: ForecastSource + ?Sized,
    {
        log::debug!(
            "fetching {} children of {} for {}",
            self.children.len(),
            self.node,
            self.horizon
        );

        let fetches = self.children.iter().map(|child| async move {
            let (area, formula) = self.mode.pair(&self.node, child);
            let state = match source.forecast(area, formula, self.horizon).await {
                Ok(series) => {
                    let comparison = compare(&series.historical, &series.forecast);
                    ChildState::Loaded(LeafResult { series, comparison })
                }
                Err(e) => {
                    log::warn!("forecast for {} / {} unavailable: {}", area, formula, e);
                    ChildState::Unavailable {
                        reason: e.to_string(),
                    }
                }
            };
            (child.clone(), state)
        });

        ExpansionOutcome {
            node: self.node.clone(),
            generation: self.generation,
            horizon: self.horizon,
            results: join_all(fetches).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpansionOutcome {
    pub node: String,
    pub generation: u64,
    pub horizon: Horizon,
    pub results: Vec<(String, ChildState)>,
}

/// Summed totals and pooled comparison over the loaded children. Children
/// are visited in key order so the result does not depend on the order in
/// which fetches finished.
pub fn summarize(children: &BTreeMap<String, ChildState>) -> NodeSummary {
    let leaves: Vec<&LeafResult> = children
        .values()
        .filter_map(|state| match state {
            ChildState::Loaded(leaf) => Some(leaf),
            _ => None,
        })
        .collect();
    let unavailable = children
        .values()
        .filter(|state| matches!(state, ChildState::Unavailable { .. }))
        .count();

    let historical: Vec<TimeSeriesPoint> = leaves
        .iter()
        .flat_map(|leaf| leaf.series.historical.iter().copied())
        .collect();
    let forecast: Vec<TimeSeriesPoint> = leaves
        .iter()
        .flat_map(|leaf| leaf.series.forecast.iter().copied())
        .collect();

    NodeSummary {
        total_forecast: leaves.iter().map(|leaf| leaf.series.total_forecast).sum(),
        available: leaves.len(),
        unavailable,
        comparison: compare(&historical, &forecast),
    }
}

/// Lazily loaded per-area or per-formula forecast tree.
///
/// Nodes are expanded with [`ForecastTree::expand`], which hands out an
/// [`ExpansionTicket`] when a fetch is needed. The ticket runs without
/// borrowing the tree, and its outcome is merged back with
/// [`ForecastTree::apply`]. Every fetch carries the node's generation at the
/// time it started; outcomes from an older generation, a different horizon
/// or for a node that has since been collapsed are dropped.
#[derive(Serialize, Debug, Clone)]
pub struct ForecastTree {
    mode: GroupingMode,
    horizon: Horizon,
    nodes: BTreeMap<String, AggregationNode>,
}

impl ForecastTree {
    /// Areas that list no formulas get no node in [`GroupingMode::ByArea`].
    pub fn new(mode: GroupingMode, metadata: &Metadata, horizon: Horizon) -> Self {
        let nodes = match mode {
            GroupingMode::ByArea => metadata
                .areas
                .iter()
                .map(|area| (area.clone(), metadata.formulas_for(area)))
                .filter(|(_, formulas)| !formulas.is_empty())
                .collect::<Vec<_>>(),
            GroupingMode::ByFormula => metadata
                .formulas
                .iter()
                .map(|formula| (formula.clone(), metadata.areas_for(formula)))
                .collect::<Vec<_>>(),
        };

        Self {
            mode,
            horizon,
            nodes: nodes
                .into_iter()
                .map(|(name, children)| {
                    let node = AggregationNode::new(mode, name.clone(), children);
                    (name, node)
                })
                .collect(),
        }
    }

    /// Keeps only the node called `name`. Formula names also match in their
    /// underscore token form.
    pub fn with_filter(mut self, name: &str) -> Self {
        self.nodes
            .retain(|key, _| key == name || formula_token(key) == name);
        self
    }

    pub fn mode(&self) -> GroupingMode {
        self.mode
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn node(&self, name: &str) -> Option<&AggregationNode> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &AggregationNode> {
        self.nodes.values()
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut AggregationNode> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| Error::UnknownNode(name.to_string()))
    }

    /// Marks the node expanded. Returns a ticket when its children have to be
    /// fetched; `None` when they are already loaded for the current horizon or
    /// a fetch for them is still in flight.
    pub fn expand(&mut self, name: &str) -> Result<Option<ExpansionTicket>> {
        let horizon = self.horizon;
        let node = self.node_mut(name)?;
        node.expanded = true;

        if node.is_pending() {
            log::debug!("{} already has a fetch in flight", name);
            return Ok(None);
        }
        if node.loaded_horizon == Some(horizon) {
            return Ok(None);
        }
        Ok(Some(node.start_fetch(horizon)))
    }

    /// Collapsing a node with a fetch in flight abandons that fetch: its
    /// children return to `NotFetched` and the late outcome is dropped.
    pub fn collapse(&mut self, name: &str) -> Result<()> {
        let node = self.node_mut(name)?;
        node.expanded = false;
        if node.is_pending() {
            log::debug!("abandoning in-flight fetch for collapsed node {}", name);
            node.cancel_fetch();
        }
        Ok(())
    }

    /// Merges a finished expansion. Returns whether it was applied.
    pub fn apply(&mut self, outcome: ExpansionOutcome) -> bool {
        let horizon = self.horizon;
        let Some(node) = self.nodes.get_mut(&outcome.node) else {
            return false;
        };

        if node.in_flight != Some(outcome.generation) || outcome.horizon != horizon {
            log::debug!(
                "dropping stale results for {} (generation {}, current {})",
                outcome.node,
                outcome.generation,
                node.generation
            );
            return false;
        }

        let mut children = node.children.clone();
        for (child, state) in outcome.results {
            if let Some(slot) = children.get_mut(&child) {
                *slot = state;
            }
        }
        node.summary = Some(summarize(&children));
        node.children = children;
        node.in_flight = None;
        node.loaded_horizon = Some(outcome.horizon);
        true
    }

    /// Switches the horizon. Every node is invalidated and each expanded node
    /// gets its own ticket for an immediate refetch.
    pub fn set_horizon(&mut self, horizon: Horizon) -> Vec<ExpansionTicket> {
        if horizon == self.horizon {
            return Vec::new();
        }
        self.horizon = horizon;

        let mut tickets = Vec::new();
        for node in self.nodes.values_mut() {
            if node.expanded {
                tickets.push(node.start_fetch(horizon));
            } else {
                node.generation += 1;
                node.reset();
            }
        }
        tickets
    }

    /// Expands `name` and waits for its children. If the returned future is
    /// dropped before it finishes, the fetch is abandoned and the node can be
    /// expanded again.
    pub async fn expand_and_load<S>(
        &mut self,
        name: &str,
        source: &S,
    ) -> Result<&AggregationNode>
    where
        S: ForecastSource + ?Sized,
    {
        if let Some(ticket) = self.expand(name)? {
            let mut guard = FetchGuard::new(self, std::slice::from_ref(&ticket));
            let outcome = ticket.run(source).await;
            guard.tree.apply(outcome);
        }
        self.node(name)
            .ok_or_else(|| Error::UnknownNode(name.to_string()))
    }

    /// Changes the horizon and reloads all expanded nodes concurrently.
    /// Returns how many nodes were reloaded.
    pub async fn change_horizon<S>(&mut self, horizon: Horizon, source: &S) -> usize
    where
        S: ForecastSource + ?Sized,
    {
        let tickets = self.set_horizon(horizon);
        let mut guard = FetchGuard::new(self, &tickets);
        let outcomes = join_all(tickets.iter().map(|ticket| ticket.run(source))).await;
        outcomes
            .into_iter()
            .map(|outcome| guard.tree.apply(outcome))
            .filter(|applied| *applied)
            .count()
    }
}

/// Abandons the fetches of its tickets that are still outstanding when
/// dropped. A no-op for every outcome that has been applied.
struct FetchGuard<'a> {
    tree: &'a mut ForecastTree,
    fetches: Vec<(String, u64)>,
}

impl<'a> FetchGuard<'a> {
    fn new(tree: &'a mut ForecastTree, tickets: &[ExpansionTicket]) -> Self {
        let fetches = tickets
            .iter()
            .map(|ticket| (ticket.node.clone(), ticket.generation))
            .collect();
        Self { tree, fetches }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        for (name, generation) in &self.fetches {
            if let Some(node) = self.tree.nodes.get_mut(name) {
                if node.in_flight == Some(*generation) {
                    log::debug!("fetch for {} was cancelled", name);
                    node.cancel_fetch();
                }
            }
        }
    }
}
