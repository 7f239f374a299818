use std::collections::HashMap;

use crate::core::process_models::dcr::ByteDcrGraph;

/// Every distinct state reachable from the current state of `graph`, with the number of
/// activities runnable in it
///
/// The current state itself is included.
pub fn find_unique_states_with_runnable_count(graph: &ByteDcrGraph) -> HashMap<Vec<u8>, usize> {
    let mut states = HashMap::new();
    let mut stack = vec![graph.clone()];
    states.insert(graph.state().to_vec(), graph.runnable_indexes().len());

    while let Some(current) = stack.pop() {
        for activity in current.runnable_indexes() {
            let mut next = current.clone();
            next.execute(activity);
            if !states.contains_key(next.state()) {
                states.insert(next.state().to_vec(), next.runnable_indexes().len());
                stack.push(next);
            }
        }
    }
    states
}

#[cfg(test)]
mod tests {
    use crate::core::process_models::dcr::DcrGraph;
    use crate::core::process_models::dcr::byte_dcr_graph::{EXECUTED, INCLUDED, PENDING, RUNNABLE};

    use super::*;

    #[test]
    fn states_of_a_two_step_sequence() {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.add_activity("B", "B").unwrap();
        g.set_included("A", true).unwrap();
        g.add_include_exclude(true, "A", "B").unwrap();
        g.add_include_exclude(false, "A", "A").unwrap();
        g.add_include_exclude(false, "B", "B").unwrap();
        g.add_response("A", "B").unwrap();

        let states = find_unique_states_with_runnable_count(&ByteDcrGraph::compile(&g).unwrap());
        assert_eq!(states.len(), 3);
        assert_eq!(states[[RUNNABLE | INCLUDED | PENDING, PENDING].as_slice()], 1);
        assert_eq!(states[[EXECUTED, RUNNABLE | INCLUDED | PENDING].as_slice()], 1);
        assert_eq!(states[[EXECUTED, EXECUTED].as_slice()], 0);
    }

    #[test]
    fn start_state_without_runnable_activities() {
        let states = find_unique_states_with_runnable_count(
            &ByteDcrGraph::compile(&DcrGraph::default()).unwrap(),
        );
        let empty: &[u8] = &[];
        assert_eq!(states.len(), 1);
        assert_eq!(states[empty], 0);
    }
}
