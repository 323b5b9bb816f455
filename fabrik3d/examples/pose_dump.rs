use fabrik3d::{ChainTree, FabrikSolver, RigData, SolverConfig, Target};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

const DEMO_RIG: &str = r#"{
  "joints": [
    { "name": "root", "position": [0, 0, 0] },
    { "name": "spine", "parent": 0, "position": [0, 1, 0] },
    { "name": "hub", "parent": 1, "position": [0, 2, 0] },
    { "name": "l1", "parent": 2, "position": [-1, 2, 0] },
    { "name": "l2", "parent": 3, "position": [-2, 2, 0] },
    { "name": "r1", "parent": 2, "position": [1, 2, 0] },
    { "name": "r2", "parent": 5, "position": [2, 2, 0],
      "limit": { "type": "cone", "degrees": 60 } }
  ]
}"#;

const DEMO_TARGETS: &str = r#"{
  "hub-l2": { "position": [-1.5, 2.5, 0] },
  "hub-r2": { "position": [1.5, 2.5, 0] }
}"#;

fn read_or(path: Option<&String>, fallback: &str) -> String {
    match path {
        Some(path) => std::fs::read_to_string(PathBuf::from(path)).expect("read input"),
        None => fallback.to_string(),
    }
}

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut config_path: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config_path = args.get(i + 1).cloned();
                i += 2;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let rig: RigData =
        serde_json::from_str(&read_or(positional.first(), DEMO_RIG)).expect("parse rig");
    let targets: BTreeMap<String, Target> =
        serde_json::from_str(&read_or(positional.get(1), DEMO_TARGETS)).expect("parse targets");
    let config: SolverConfig = match config_path {
        Some(path) => serde_json::from_str(&read_or(Some(&path), "")).expect("parse config"),
        None => SolverConfig::default(),
    };

    let mut tree = ChainTree::build(&rig).expect("build chain tree");
    for (chain, target) in targets {
        tree.assign_target_by_name(&chain, target)
            .expect("assign target");
    }
    let solver = FabrikSolver::new(config).expect("solver config");
    let result = solver.solve(&mut tree).expect("solve");

    let name_of = |id| tree.chain(id).map(|c| c.name().to_string());
    let joints = tree
        .skeleton()
        .joints()
        .iter()
        .map(|joint| {
            json!({
                "name": joint.name(),
                "position": joint.position().to_array(),
                "rotation": joint.rotation().to_array(),
            })
        })
        .collect::<Vec<_>>();

    let out = json!({
        "iterations": result.iterations,
        "converged": result.converged_leaves.iter().filter_map(|id| name_of(*id)).collect::<Vec<_>>(),
        "unconverged": result.unconverged_leaves.iter().filter_map(|id| name_of(*id)).collect::<Vec<_>>(),
        "unsolved": result.unsolved_leaves.iter().filter_map(|id| name_of(*id)).collect::<Vec<_>>(),
        "joints": joints,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).expect("serialize pose")
    );
}
