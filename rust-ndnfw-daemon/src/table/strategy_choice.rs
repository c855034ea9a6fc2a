//! Strategy choice table: name prefix to forwarding strategy.
//!
//! The effective strategy for any name is the one set on its longest
//! configured prefix. The root prefix always carries the default strategy,
//! so resolution cannot fail once the forwarder is constructed.

use crate::fw::strategy::Strategy;
use crate::table::name_tree::NameTree;
use rust_ndnfw_common::name::Name;
use std::sync::Arc;

pub struct StrategyChoiceEntry {
    pub prefix: Name,
    pub strategy: Arc<dyn Strategy>,
}

impl std::fmt::Debug for StrategyChoiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyChoiceEntry")
            .field("prefix", &self.prefix.to_string())
            .field("strategy", &self.strategy.strategy_name().to_string())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct StrategyChoice {
    n_entries: usize,
}

impl StrategyChoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.n_entries
    }

    pub fn is_empty(&self) -> bool {
        self.n_entries == 0
    }

    /// Sets the strategy for `prefix`, replacing any previous choice.
    pub fn insert(&mut self, tree: &mut NameTree, prefix: Name, strategy: Arc<dyn Strategy>) {
        let record = tree.lookup(&prefix);
        let prefix = record.name().clone();
        if record.strategy_choice.is_none() {
            self.n_entries += 1;
        }
        record.strategy_choice = Some(StrategyChoiceEntry { prefix, strategy });
    }

    /// Removes the choice on `prefix`. The root choice cannot be removed;
    /// names must always resolve to some strategy.
    pub fn erase(&mut self, tree: &mut NameTree, prefix: &Name) -> bool {
        if prefix.is_empty() {
            return false;
        }
        let Some(record) = tree.find_exact_match_mut(prefix) else {
            return false;
        };
        if record.strategy_choice.take().is_none() {
            return false;
        }
        self.n_entries -= 1;
        tree.delete_if_empty(prefix);
        true
    }

    pub fn get(&self, tree: &NameTree, prefix: &Name) -> Option<Arc<dyn Strategy>> {
        tree.find_exact_match(prefix)
            .and_then(|record| record.strategy_choice.as_ref())
            .map(|entry| Arc::clone(&entry.strategy))
    }

    /// Resolves the strategy responsible for `name`.
    pub fn find_effective_strategy(
        &self,
        tree: &NameTree,
        name: &Name,
    ) -> Option<Arc<dyn Strategy>> {
        tree.find_longest_prefix_match(name, |record| record.strategy_choice.is_some())
            .and_then(|record| record.strategy_choice.as_ref())
            .map(|entry| Arc::clone(&entry.strategy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fw::best_route::BestRouteStrategy;
    use crate::fw::multicast::MulticastStrategy;
    use crate::table::name_tree::DEFAULT_MAX_DEPTH;

    #[test]
    fn test_longest_prefix_resolution() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        let mut choice = StrategyChoice::new();

        choice.insert(&mut tree, Name::new(), Arc::new(BestRouteStrategy::new()));
        choice.insert(
            &mut tree,
            Name::from_string("/a/b"),
            Arc::new(MulticastStrategy::new()),
        );

        let s = choice
            .find_effective_strategy(&tree, &Name::from_string("/a/b/c"))
            .unwrap();
        assert_eq!(s.strategy_name(), &MulticastStrategy::strategy_uri());

        let s = choice
            .find_effective_strategy(&tree, &Name::from_string("/a"))
            .unwrap();
        assert_eq!(s.strategy_name(), &BestRouteStrategy::strategy_uri());
    }

    #[test]
    fn test_root_choice_cannot_be_erased() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        let mut choice = StrategyChoice::new();
        choice.insert(&mut tree, Name::new(), Arc::new(BestRouteStrategy::new()));

        assert!(!choice.erase(&mut tree, &Name::new()));
        assert_eq!(choice.len(), 1);
    }

    #[test]
    fn test_erase_restores_parent_choice() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        let mut choice = StrategyChoice::new();
        choice.insert(&mut tree, Name::new(), Arc::new(BestRouteStrategy::new()));
        choice.insert(
            &mut tree,
            Name::from_string("/a"),
            Arc::new(MulticastStrategy::new()),
        );

        assert!(choice.erase(&mut tree, &Name::from_string("/a")));
        let s = choice
            .find_effective_strategy(&tree, &Name::from_string("/a/x"))
            .unwrap();
        assert_eq!(s.strategy_name(), &BestRouteStrategy::strategy_uri());
    }
}
