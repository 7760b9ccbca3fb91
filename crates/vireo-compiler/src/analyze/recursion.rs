//! Recursion detection: Tarjan's strongly connected components over
//! the rule call graph.

use indexmap::{IndexMap, IndexSet};

use crate::ast::Grammar;

use super::refs::call_graph;

/// Rules that lie on some call cycle (directly or mutually recursive).
pub fn recursive_set(grammar: &Grammar) -> IndexSet<String> {
    let graph = call_graph(grammar);
    let mut out = IndexSet::new();
    for scc in sccs(&graph) {
        if scc.len() > 1 {
            out.extend(scc.iter().map(|s| s.to_string()));
        } else if let Some(&name) = scc.first()
            && graph.get(name).is_some_and(|refs| refs.contains(name))
        {
            out.insert(name.to_string());
        }
    }
    out
}

/// Tarjan's algorithm. Grammars are small; the recursive formulation
/// is fine.
pub(crate) fn sccs<'g, 'a>(
    graph: &'g IndexMap<&'a str, IndexSet<&'a str>>,
) -> Vec<Vec<&'a str>> {
    struct State<'g, 'a> {
        graph: &'g IndexMap<&'a str, IndexSet<&'a str>>,
        index: IndexMap<&'a str, usize>,
        lowlink: IndexMap<&'a str, usize>,
        on_stack: IndexSet<&'a str>,
        stack: Vec<&'a str>,
        next_index: usize,
        out: Vec<Vec<&'a str>>,
    }

    impl<'g, 'a> State<'g, 'a> {
        fn visit(&mut self, v: &'a str) {
            self.index.insert(v, self.next_index);
            self.lowlink.insert(v, self.next_index);
            self.next_index += 1;
            self.stack.push(v);
            self.on_stack.insert(v);

            if let Some(neighbours) = self.graph.get(v) {
                for &w in neighbours {
                    if !self.graph.contains_key(w) {
                        continue; // undefined reference, reported elsewhere
                    }
                    if !self.index.contains_key(w) {
                        self.visit(w);
                        let low = self.lowlink[w].min(self.lowlink[v]);
                        self.lowlink.insert(v, low);
                    } else if self.on_stack.contains(w) {
                        let low = self.index[w].min(self.lowlink[v]);
                        self.lowlink.insert(v, low);
                    }
                }
            }

            if self.lowlink[v] == self.index[v] {
                let mut component = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack.swap_remove(w);
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.reverse();
                self.out.push(component);
            }
        }
    }

    let mut state = State {
        graph,
        index: IndexMap::new(),
        lowlink: IndexMap::new(),
        on_stack: IndexSet::new(),
        stack: Vec::new(),
        next_index: 0,
        out: Vec::new(),
    };
    for &v in graph.keys() {
        if !state.index.contains_key(v) {
            state.visit(v);
        }
    }
    state.out
}
