// Backend extension hooks, run on the native model after it is built and
// before it is solved

use std::collections::HashMap;

use super::models::{Problem, VariableId};

/// Backend column index of every problem variable (the BUILD stage).
///
/// Indices are dense, start at zero and follow
/// [`Problem::indexed_variables`], so they are stable for a given problem.
#[derive(Debug, Clone)]
pub struct VariableIndex<V: VariableId> {
    variables: Vec<V>,
    positions: HashMap<V, usize>,
}

impl<V: VariableId> VariableIndex<V> {
    pub fn build(problem: &Problem<V>) -> Self {
        let variables = problem.indexed_variables();
        let positions = variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        Self {
            variables,
            positions,
        }
    }

    pub fn index_of(&self, variable: &V) -> Option<usize> {
        self.positions.get(variable).copied()
    }

    pub fn variable(&self, index: usize) -> Option<&V> {
        self.variables.get(index)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &V)> {
        self.variables.iter().enumerate()
    }
}

/// Handle returned by [`Hooks::add`], used to remove the hook again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(usize);

type HookFn<C, V> = Box<dyn FnMut(&mut C, &VariableIndex<V>)>;

/// Ordered hooks over the native model type `C` of one backend.
///
/// Hooks see the live model and may change it; nothing is rolled back
/// between them.
pub struct Hooks<C: ?Sized, V: VariableId> {
    next_id: usize,
    hooks: Vec<(HookId, HookFn<C, V>)>,
}

impl<C: ?Sized, V: VariableId> Default for Hooks<C, V> {
    fn default() -> Self {
        Self {
            next_id: 0,
            hooks: Vec::new(),
        }
    }
}

impl<C: ?Sized, V: VariableId> Hooks<C, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, hook: F) -> HookId
    where
        F: FnMut(&mut C, &VariableIndex<V>) + 'static,
    {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.hooks.push((id, Box::new(hook)));
        id
    }

    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(hook_id, _)| *hook_id != id);
        self.hooks.len() != before
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Call every hook in registration order.
    pub fn run(&mut self, native: &mut C, index: &VariableIndex<V>) {
        for (_, hook) in self.hooks.iter_mut() {
            hook(native, index);
        }
    }
}

impl<C: ?Sized, V: VariableId> std::fmt::Debug for Hooks<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").field("len", &self.hooks.len()).finish()
    }
}
