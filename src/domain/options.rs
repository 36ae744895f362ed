/// What to do with the last node of a level that has an odd length.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OddNodePolicy {
    /// Pair the trailing node with itself: `H(last ++ last)`.
    #[default]
    Duplicate,
    /// Carry the trailing node up to the next level unchanged.
    Promote,
    /// Discard the trailing node. Its items no longer contribute to the root.
    Drop,
}

/// Tree construction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    pub odd_node_policy: OddNodePolicy,
    /// Hash large levels on the rayon pool.
    pub parallel: bool,
    /// Minimum level width before `parallel` kicks in.
    pub parallel_threshold: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            odd_node_policy: OddNodePolicy::Duplicate,
            parallel: true,
            parallel_threshold: 1024,
        }
    }
}

impl TreeOptions {
    pub fn with_odd_node_policy(mut self, policy: OddNodePolicy) -> Self {
        self.odd_node_policy = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub(crate) fn runs_parallel(&self, width: usize) -> bool {
        self.parallel && width >= self.parallel_threshold
    }
}
