//! Execution Planner
//!
//! Chooses an [`OrchestrationPattern`] and stage layout for ranked matches.
//! Decision rules, in order:
//!
//! 1. A matched handler with `hand_off_to` → **HandOff**: `[{source}, {target}]`.
//!    The highest-ranked such handler wins; the remaining matches are not planned.
//! 2. Exactly one match → **Single**.
//! 3. No dependency between matched handlers → **Parallel**, one stage.
//! 4. Otherwise → **Sequential**, stages are the topological layers of the
//!    dependency graph (`B` depends on `A` when `B.depends_on` intersects
//!    `A.domains`). A cycle fails with [`DomainError::CyclicDependency`].
//!
//! If any planned handler has `requires_aggregation`, Single/Parallel/Sequential
//! plans become **Hierarchical** (same stages) and every plan gets
//! `aggregation_step = true`.
//!
//! Within a stage handlers keep match order, so identical matches always
//! produce an identical plan.

use crate::core::error::DomainError;
use crate::handler::descriptor::HandlerDescriptor;
use crate::handler::registry::HandlerRegistry;
use crate::planning::plan::{ExecutionPlan, HandOff, OrchestrationPattern, Stage};
use crate::routing::classifier::Match;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Stateless planner over a registry snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionPlanner;

impl ExecutionPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(
        &self,
        matches: &[Match],
        registry: &HandlerRegistry,
    ) -> Result<ExecutionPlan, DomainError> {
        if matches.is_empty() {
            return Err(DomainError::NoMatch);
        }

        let mut seen = HashSet::new();
        let mut descriptors: Vec<&Arc<HandlerDescriptor>> = Vec::with_capacity(matches.len());
        for m in matches {
            if seen.insert(m.handler.as_str()) {
                descriptors.push(registry.lookup(&m.handler)?);
            }
        }

        if let Some(source) = descriptors.iter().find(|d| d.hand_off_to.is_some()) {
            return Self::plan_hand_off(source, registry);
        }

        let requires_aggregation = descriptors.iter().any(|d| d.requires_aggregation);

        let (pattern, stages, upstream) = if descriptors.len() == 1 {
            (
                OrchestrationPattern::Single,
                vec![Stage::new([descriptors[0].name.clone()])],
                BTreeMap::new(),
            )
        } else {
            let upstream = Self::dependency_edges(&descriptors);
            if upstream.is_empty() {
                (
                    OrchestrationPattern::Parallel,
                    vec![Stage::new(descriptors.iter().map(|d| d.name.clone()))],
                    upstream,
                )
            } else {
                let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
                let stages = topological_stages(&names, &upstream)?;
                (OrchestrationPattern::Sequential, stages, upstream)
            }
        };

        let pattern = if requires_aggregation {
            OrchestrationPattern::Hierarchical
        } else {
            pattern
        };

        Ok(ExecutionPlan {
            pattern,
            stages,
            aggregation_step: requires_aggregation,
            upstream,
            hand_off: None,
        })
    }

    fn plan_hand_off(
        source: &HandlerDescriptor,
        registry: &HandlerRegistry,
    ) -> Result<ExecutionPlan, DomainError> {
        let target_name = source.hand_off_to.as_deref().unwrap_or_default();
        let target = registry.lookup(target_name)?;

        Ok(ExecutionPlan {
            pattern: OrchestrationPattern::HandOff,
            stages: vec![
                Stage::new([source.name.clone()]),
                Stage::new([target.name.clone()]),
            ],
            aggregation_step: source.requires_aggregation || target.requires_aggregation,
            upstream: BTreeMap::from([(target.name.clone(), vec![source.name.clone()])]),
            hand_off: Some(HandOff {
                from: source.name.clone(),
                to: target.name.clone(),
            }),
        })
    }

    /// Handler -> upstream handlers, both in match order. Handlers with no
    /// upstream are omitted.
    fn dependency_edges(descriptors: &[&Arc<HandlerDescriptor>]) -> BTreeMap<String, Vec<String>> {
        let mut upstream = BTreeMap::new();
        for dependent in descriptors {
            let sources: Vec<String> = descriptors
                .iter()
                .filter(|candidate| dependent.depends_on_handler(candidate))
                .map(|candidate| candidate.name.clone())
                .collect();
            if !sources.is_empty() {
                upstream.insert(dependent.name.clone(), sources);
            }
        }
        upstream
    }
}

/// Kahn's algorithm, one layer at a time. A layer holds every remaining
/// node whose upstream nodes are all placed, in the order of `nodes`.
fn topological_stages(
    nodes: &[&str],
    upstream: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<Stage>, DomainError> {
    let mut in_degree: HashMap<&str, usize> = nodes
        .iter()
        .map(|&n| (n, upstream.get(n).map_or(0, Vec::len)))
        .collect();

    let mut downstream: HashMap<&str, Vec<&str>> = HashMap::new();
    for (node, sources) in upstream {
        for source in sources {
            downstream
                .entry(source.as_str())
                .or_default()
                .push(node.as_str());
        }
    }

    let mut placed: HashSet<&str> = HashSet::new();
    let mut stages = Vec::new();

    while placed.len() < nodes.len() {
        let layer: Vec<&str> = nodes
            .iter()
            .copied()
            .filter(|n| !placed.contains(n) && in_degree[n] == 0)
            .collect();

        if layer.is_empty() {
            let remaining: Vec<&str> = nodes
                .iter()
                .copied()
                .filter(|n| !placed.contains(n))
                .collect();
            return Err(DomainError::CyclicDependency(find_cycle(
                &remaining, upstream,
            )));
        }

        for node in &layer {
            placed.insert(*node);
            for next in downstream.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                }
            }
        }

        stages.push(Stage::new(layer.iter().map(|n| n.to_string())));
    }

    Ok(stages)
}

/// Walk upstream edges from the first unplaced node until a node repeats;
/// returns the closed path, e.g. `[a, b, a]`.
fn find_cycle(remaining: &[&str], upstream: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let remaining_set: HashSet<&str> = remaining.iter().copied().collect();
    let Some(&start) = remaining.first() else {
        return Vec::new();
    };

    let mut path: Vec<&str> = vec![start];
    let mut current = start;
    loop {
        // Every unplaced node has at least one unplaced upstream node.
        let Some(next) = upstream
            .get(current)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|n| remaining_set.contains(n))
        else {
            return path.iter().map(|n| n.to_string()).collect();
        };

        if let Some(pos) = path.iter().position(|&n| n == next) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|n| n.to_string()).collect();
            cycle.push(next.to_string());
            cycle.reverse();
            return cycle;
        }
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn matched(names: &[&str]) -> Vec<Match> {
        names
            .iter()
            .map(|n| Match {
                handler: n.to_string(),
                score: 1,
                matched_triggers: BTreeSet::new(),
                matched_domains: BTreeSet::new(),
            })
            .collect()
    }

    fn registry(descriptors: Vec<HandlerDescriptor>) -> HandlerRegistry {
        HandlerRegistry::from_descriptors(descriptors).unwrap()
    }

    fn stage_names(plan: &ExecutionPlan) -> Vec<Vec<&str>> {
        plan.stages
            .iter()
            .map(|s| s.handlers.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_empty_matches_is_no_match() {
        let result = ExecutionPlanner::new().plan(&[], &HandlerRegistry::new());
        assert_eq!(result, Err(DomainError::NoMatch));
    }

    #[test]
    fn test_single_match() {
        let reg = registry(vec![HandlerDescriptor::new("A")]);
        let plan = ExecutionPlanner::new().plan(&matched(&["A"]), &reg).unwrap();

        assert_eq!(plan.pattern, OrchestrationPattern::Single);
        assert_eq!(stage_names(&plan), vec![vec!["A"]]);
        assert!(!plan.aggregation_step);
    }

    #[test]
    fn test_independent_matches_are_parallel() {
        let reg = registry(vec![
            HandlerDescriptor::new("A").with_domain("iac"),
            HandlerDescriptor::new("B").with_domain("containers"),
        ]);
        let plan = ExecutionPlanner::new()
            .plan(&matched(&["A", "B"]), &reg)
            .unwrap();

        assert_eq!(plan.pattern, OrchestrationPattern::Parallel);
        assert_eq!(stage_names(&plan), vec![vec!["A", "B"]]);
        assert!(plan.upstream.is_empty());
    }

    #[test]
    fn test_dependency_makes_sequential() {
        let reg = registry(vec![
            HandlerDescriptor::new("A").with_domain("iac"),
            HandlerDescriptor::new("B")
                .with_domain("containers")
                .depends_on("iac"),
        ]);
        let plan = ExecutionPlanner::new()
            .plan(&matched(&["A", "B"]), &reg)
            .unwrap();

        assert_eq!(plan.pattern, OrchestrationPattern::Sequential);
        assert_eq!(stage_names(&plan), vec![vec!["A"], vec!["B"]]);
        assert_eq!(plan.upstream_of("B"), ["A".to_string()]);
    }

    #[test]
    fn test_dependent_ranked_first_still_runs_after_upstream() {
        let reg = registry(vec![
            HandlerDescriptor::new("A").with_domain("iac"),
            HandlerDescriptor::new("B").depends_on("iac"),
        ]);
        let plan = ExecutionPlanner::new()
            .plan(&matched(&["B", "A"]), &reg)
            .unwrap();

        assert_eq!(stage_names(&plan), vec![vec!["A"], vec!["B"]]);
    }

    #[test]
    fn test_stages_are_topological_layers() {
        // D depends on B and C; B and C depend on A; E is independent.
        let reg = registry(vec![
            HandlerDescriptor::new("A").with_domain("a"),
            HandlerDescriptor::new("B").with_domain("b").depends_on("a"),
            HandlerDescriptor::new("C").with_domain("c").depends_on("a"),
            HandlerDescriptor::new("D").depends_on("b").depends_on("c"),
            HandlerDescriptor::new("E"),
        ]);
        let plan = ExecutionPlanner::new()
            .plan(&matched(&["D", "C", "B", "A", "E"]), &reg)
            .unwrap();

        assert_eq!(
            stage_names(&plan),
            vec![vec!["A", "E"], vec!["C", "B"], vec!["D"]]
        );

        // Every upstream handler sits in a strictly earlier stage.
        for (handler, sources) in &plan.upstream {
            let stage = plan.stage_of(handler).unwrap();
            for source in sources {
                assert!(plan.stage_of(source).unwrap() < stage);
            }
        }
    }

    #[test]
    fn test_cycle_is_rejected() {
        let reg = registry(vec![
            HandlerDescriptor::new("A").with_domain("a").depends_on("b"),
            HandlerDescriptor::new("B").with_domain("b").depends_on("a"),
            HandlerDescriptor::new("C"),
        ]);
        let result = ExecutionPlanner::new().plan(&matched(&["A", "B", "C"]), &reg);

        match result {
            Err(DomainError::CyclicDependency(path)) => {
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&"A".to_string()));
                assert!(path.contains(&"B".to_string()));
                assert!(!path.contains(&"C".to_string()));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_dependency_on_unmatched_domain_is_ignored() {
        let reg = registry(vec![
            HandlerDescriptor::new("A"),
            HandlerDescriptor::new("B").depends_on("nowhere"),
        ]);
        let plan = ExecutionPlanner::new()
            .plan(&matched(&["A", "B"]), &reg)
            .unwrap();
        assert_eq!(plan.pattern, OrchestrationPattern::Parallel);
    }

    #[test]
    fn test_requires_aggregation_makes_hierarchical() {
        let reg = registry(vec![
            HandlerDescriptor::new("A").with_domain("a"),
            HandlerDescriptor::new("B")
                .depends_on("a")
                .requiring_aggregation(),
        ]);
        let plan = ExecutionPlanner::new()
            .plan(&matched(&["A", "B"]), &reg)
            .unwrap();

        assert_eq!(plan.pattern, OrchestrationPattern::Hierarchical);
        assert!(plan.aggregation_step);
        assert_eq!(stage_names(&plan), vec![vec!["A"], vec!["B"]]);
    }

    #[test]
    fn test_hand_off_plan() {
        let reg = registry(vec![
            HandlerDescriptor::new("planner").hand_off_to("executor"),
            HandlerDescriptor::new("executor"),
            HandlerDescriptor::new("other"),
        ]);
        let plan = ExecutionPlanner::new()
            .plan(&matched(&["other", "planner"]), &reg)
            .unwrap();

        assert_eq!(plan.pattern, OrchestrationPattern::HandOff);
        assert_eq!(stage_names(&plan), vec![vec!["planner"], vec!["executor"]]);
        assert_eq!(
            plan.hand_off,
            Some(HandOff {
                from: "planner".to_string(),
                to: "executor".to_string()
            })
        );
        assert_eq!(plan.upstream_of("executor"), ["planner".to_string()]);
    }

    #[test]
    fn test_hand_off_to_unknown_handler_fails() {
        let reg = registry(vec![HandlerDescriptor::new("planner").hand_off_to("ghost")]);
        let result = ExecutionPlanner::new().plan(&matched(&["planner"]), &reg);
        assert_eq!(result, Err(DomainError::UnknownHandler("ghost".to_string())));
    }

    #[test]
    fn test_unknown_match_fails() {
        let result = ExecutionPlanner::new().plan(&matched(&["nope"]), &HandlerRegistry::new());
        assert_eq!(result, Err(DomainError::UnknownHandler("nope".to_string())));
    }

    #[test]
    fn test_planning_is_deterministic() {
        let reg = registry(vec![
            HandlerDescriptor::new("A").with_domain("a"),
            HandlerDescriptor::new("B").depends_on("a"),
            HandlerDescriptor::new("C"),
        ]);
        let matches = matched(&["C", "B", "A"]);
        let planner = ExecutionPlanner::new();

        assert_eq!(
            planner.plan(&matches, &reg).unwrap(),
            planner.plan(&matches, &reg).unwrap()
        );
    }
}
