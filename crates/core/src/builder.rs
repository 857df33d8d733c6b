//! Tree building
//!
//! Reconstructs the parent/child hierarchy from a flat, unordered list of
//! process records. Malformed input never fails the build: every anomaly
//! becomes a [`Warning`] and the result is still a valid forest.

use crate::models::{Forest, ProcessNode, ProcessRecord, Warning, PRIMARY_ROOT_PID};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of building a forest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// The rooted trees, primary root first
    pub forest: Forest,
    /// Anomalies found in the input
    pub warnings: Vec<Warning>,
}

/// Build a forest from process records
///
/// Children keep the order in which they appear in `records`. Roots are the
/// primary root (PID 1) if present, then every other root candidate in input
/// order.
pub fn build_forest(records: &[ProcessRecord]) -> BuildOutcome {
    let mut warnings = Vec::new();

    // First record wins for each PID
    let mut unique: Vec<&ProcessRecord> = Vec::with_capacity(records.len());
    let mut index: HashMap<u32, &ProcessRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if record.pid == 0 {
            debug!(name = %record.name, "skipping record with pid 0");
            warnings.push(Warning::InvalidRecord {
                name: record.name.clone(),
            });
            continue;
        }
        match index.get(&record.pid) {
            Some(kept) => {
                debug!(pid = record.pid, "dropping duplicate record");
                warnings.push(Warning::DuplicatePid {
                    pid: record.pid,
                    kept: kept.name.clone(),
                    dropped: record.name.clone(),
                });
            }
            None => {
                index.insert(record.pid, record);
                unique.push(record);
            }
        }
    }

    // Checked after filtering so a snapshot of only invalid records counts as empty
    if unique.is_empty() {
        debug!("no usable records, nothing to build");
        warnings.push(Warning::NoRecords);
        return BuildOutcome {
            forest: Forest::default(),
            warnings,
        };
    }

    let mut roots: HashSet<u32> = HashSet::new();
    for record in &unique {
        if record.declares_no_parent() {
            roots.insert(record.pid);
        } else if !index.contains_key(&record.ppid) {
            debug!(pid = record.pid, ppid = record.ppid, "parent not in snapshot");
            warnings.push(Warning::ParentMissing {
                pid: record.pid,
                ppid: record.ppid,
            });
            roots.insert(record.pid);
        }
    }

    // Ascending PID order makes the promoted member of each cycle its lowest
    // PID, whatever order the collector produced.
    let mut by_pid: Vec<&ProcessRecord> = unique.clone();
    by_pid.sort_unstable_by_key(|record| record.pid);
    let mut broken: Vec<u32> = Vec::new();
    let mut settled: HashSet<u32> = HashSet::new();
    for record in by_pid {
        if roots.contains(&record.pid) || settled.contains(&record.pid) {
            continue;
        }
        if walks_back_to_self(record, &index, &roots, &mut settled, unique.len()) {
            debug!(pid = record.pid, ppid = record.ppid, "breaking parent cycle");
            roots.insert(record.pid);
            broken.push(record.pid);
        }
    }
    for pid in broken {
        if let Some(record) = index.get(&pid) {
            warnings.push(Warning::CycleBroken {
                pid,
                ppid: record.ppid,
            });
        }
    }

    let mut children: HashMap<u32, Vec<&ProcessRecord>> = HashMap::new();
    let mut root_order: Vec<&ProcessRecord> = Vec::new();
    for record in &unique {
        if roots.contains(&record.pid) {
            root_order.push(*record);
        } else {
            children.entry(record.ppid).or_default().push(*record);
        }
    }

    if let Some(pos) = root_order.iter().position(|r| r.pid == PRIMARY_ROOT_PID) {
        let primary = root_order.remove(pos);
        root_order.insert(0, primary);
    } else {
        warnings.push(Warning::NoRootFound {
            expected_pid: PRIMARY_ROOT_PID,
        });
    }

    let forest = Forest {
        roots: root_order
            .into_iter()
            .map(|root| assemble(root, &children))
            .collect(),
    };

    debug!(
        records = records.len(),
        roots = forest.roots.len(),
        warnings = warnings.len(),
        "built process forest"
    );

    BuildOutcome { forest, warnings }
}

/// Follow the parent chain from `record` and report whether it loops back
///
/// The walk stops at the first root or at a PID already known to reach one
/// (`settled`), and is bounded by `limit` hops. A chain that spins in some
/// other cycle without reaching `record` is left alone: that cycle is broken
/// when its own lowest member is visited.
fn walks_back_to_self(
    record: &ProcessRecord,
    index: &HashMap<u32, &ProcessRecord>,
    roots: &HashSet<u32>,
    settled: &mut HashSet<u32>,
    limit: usize,
) -> bool {
    let mut path = Vec::new();
    let mut current = record.ppid;
    for _ in 0..limit {
        if current == record.pid {
            // The caller promotes `record`, so everything on the loop reaches it
            settled.extend(path);
            return true;
        }
        if roots.contains(&current) || settled.contains(&current) {
            settled.extend(path);
            settled.insert(record.pid);
            return false;
        }
        match index.get(&current) {
            Some(parent) => {
                path.push(current);
                current = parent.ppid;
            }
            None => return false,
        }
    }
    false
}

/// Turn a root record and the child lists into an owned tree
///
/// Uses an explicit stack so very deep chains cannot exhaust the call stack.
fn assemble(root: &ProcessRecord, children: &HashMap<u32, Vec<&ProcessRecord>>) -> ProcessNode {
    // Each frame is a node under construction plus the children still to visit
    let mut stack = vec![(ProcessNode::from_record(root), children_of(root.pid, children))];

    while let Some((_, pending)) = stack.last_mut() {
        if let Some(child) = pending.next() {
            stack.push((ProcessNode::from_record(child), children_of(child.pid, children)));
            continue;
        }
        let Some((done, _)) = stack.pop() else {
            break;
        };
        match stack.last_mut() {
            Some((parent, _)) => parent.children.push(done),
            None => return done,
        }
    }

    ProcessNode::from_record(root)
}

fn children_of<'a>(
    pid: u32,
    children: &'a HashMap<u32, Vec<&'a ProcessRecord>>,
) -> std::slice::Iter<'a, &'a ProcessRecord> {
    children.get(&pid).map(|c| c.iter()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(triples: &[(u32, u32, &str)]) -> Vec<ProcessRecord> {
        triples
            .iter()
            .map(|&(pid, ppid, name)| ProcessRecord::new(pid, ppid, name).unwrap())
            .collect()
    }

    fn child_pids(node: &ProcessNode) -> Vec<u32> {
        node.children.iter().map(|c| c.pid).collect()
    }

    #[test]
    fn test_single_root_tree() {
        let input = records(&[(1, 0, "init"), (2, 1, "shell"), (3, 2, "editor"), (4, 2, "browser")]);
        let outcome = build_forest(&input);

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.forest.roots.len(), 1);
        let root = &outcome.forest.roots[0];
        assert_eq!(root.name, "init");
        assert_eq!(child_pids(root), vec![2]);
        assert_eq!(child_pids(&root.children[0]), vec![3, 4]);
        assert_eq!(outcome.forest.node_count(), 4);
    }

    #[test]
    fn test_unordered_input_attaches_children() {
        let input = records(&[(4, 2, "browser"), (3, 2, "editor"), (2, 1, "shell"), (1, 0, "init")]);
        let outcome = build_forest(&input);

        assert_eq!(outcome.forest.roots.len(), 1);
        let shell = outcome.forest.find(2).unwrap();
        // Insertion order from input
        assert_eq!(child_pids(shell), vec![4, 3]);
    }

    #[test]
    fn test_empty_input_reports_no_records() {
        let outcome = build_forest(&[]);
        assert!(outcome.forest.is_empty());
        assert_eq!(outcome.warnings, vec![Warning::NoRecords]);
    }

    #[test]
    fn test_duplicate_pid_keeps_first() {
        let input = records(&[(1, 0, "init"), (5, 1, "first"), (5, 1, "second")]);
        let outcome = build_forest(&input);

        assert_eq!(outcome.forest.node_count(), 2);
        assert_eq!(outcome.forest.find(5).unwrap().name, "first");
        assert_eq!(
            outcome.warnings,
            vec![Warning::DuplicatePid {
                pid: 5,
                kept: "first".to_string(),
                dropped: "second".to_string(),
            }]
        );
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let input = records(&[(1, 0, "init"), (10, 11, "a"), (11, 10, "b")]);
        let outcome = build_forest(&input);

        assert_eq!(outcome.forest.node_count(), 3);
        assert!(outcome
            .warnings
            .contains(&Warning::CycleBroken { pid: 10, ppid: 11 }));
        // 10 is promoted, 11 hangs below it
        let promoted = outcome.forest.roots.iter().find(|r| r.pid == 10).unwrap();
        assert_eq!(child_pids(promoted), vec![11]);
    }

    #[test]
    fn test_cycle_choice_ignores_input_order() {
        let forward = build_forest(&records(&[(1, 0, "init"), (10, 11, "a"), (11, 10, "b")]));
        let reverse = build_forest(&records(&[(11, 10, "b"), (10, 11, "a"), (1, 0, "init")]));
        assert_eq!(forward.forest, reverse.forest);
    }

    #[test]
    fn test_tail_into_cycle_stays_attached() {
        // 20 hangs off the 10 <-> 11 loop but is not part of it
        let input = records(&[(1, 0, "init"), (20, 11, "tail"), (10, 11, "a"), (11, 10, "b")]);
        let outcome = build_forest(&input);

        let cycle_warnings = outcome
            .warnings
            .iter()
            .filter(|w| matches!(w, Warning::CycleBroken { .. }))
            .count();
        assert_eq!(cycle_warnings, 1);
        assert_eq!(outcome.forest.node_count(), 4);
        assert_eq!(child_pids(outcome.forest.find(11).unwrap()), vec![20]);
    }

    #[test]
    fn test_self_parent_is_root() {
        let input = records(&[(1, 0, "init"), (7, 7, "loner")]);
        let outcome = build_forest(&input);

        let root_pids: Vec<u32> = outcome.forest.roots.iter().map(|r| r.pid).collect();
        assert_eq!(root_pids, vec![1, 7]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_missing_primary_root() {
        let input = records(&[(5, 3, "orphan"), (6, 5, "child")]);
        let outcome = build_forest(&input);

        assert_eq!(outcome.forest.roots.len(), 1);
        assert_eq!(outcome.forest.roots[0].pid, 5);
        assert!(outcome
            .warnings
            .contains(&Warning::ParentMissing { pid: 5, ppid: 3 }));
        assert!(outcome.warnings.contains(&Warning::NoRootFound {
            expected_pid: PRIMARY_ROOT_PID
        }));
    }

    #[test]
    fn test_primary_root_listed_first() {
        let input = records(&[(2, 0, "kthreadd"), (1, 0, "init"), (3, 2, "kworker")]);
        let outcome = build_forest(&input);

        let root_pids: Vec<u32> = outcome.forest.roots.iter().map(|r| r.pid).collect();
        assert_eq!(root_pids, vec![1, 2]);
    }

    #[test]
    fn test_zero_pid_record_skipped() {
        let input = vec![
            ProcessRecord::new(1, 0, "init").unwrap(),
            ProcessRecord {
                pid: 0,
                ppid: 0,
                name: "idle".to_string(),
            },
        ];
        let outcome = build_forest(&input);

        assert_eq!(outcome.forest.node_count(), 1);
        assert_eq!(
            outcome.warnings,
            vec![Warning::InvalidRecord {
                name: "idle".to_string()
            }]
        );
    }

    #[test]
    fn test_only_zero_pid_records_is_empty() {
        let input = vec![ProcessRecord {
            pid: 0,
            ppid: 0,
            name: "idle".to_string(),
        }];
        let outcome = build_forest(&input);

        assert!(outcome.forest.is_empty());
        assert_eq!(
            outcome.warnings,
            vec![
                Warning::InvalidRecord {
                    name: "idle".to_string()
                },
                Warning::NoRecords,
            ]
        );
    }

    #[test]
    fn test_deep_chain_builds_and_drops_without_recursion() {
        let input: Vec<ProcessRecord> = (1..=20_000u32)
            .map(|pid| ProcessRecord::new(pid, pid - 1, format!("p{}", pid)).unwrap())
            .collect();
        let outcome = build_forest(&input);

        assert_eq!(outcome.forest.roots.len(), 1);
        assert_eq!(outcome.forest.node_count(), 20_000);
        drop(outcome);
    }
}
