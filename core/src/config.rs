//! Immutable recognizer configuration.
//!
//! Grounded on `libchinese_core::Config`: a single plain-data record with a
//! `Default` impl and a builder-ish set of `with_*` methods, captured once at
//! construction rather than threaded through global mutable flags (see
//! Design Notes on global mutable state in SPEC_FULL.md).

/// Strategy used to prune Gaussian components within a codebook before the
/// weighted log-sum (spec §4.1). `Safe` and `Heuristic` are deliberately
/// distinct: `Safe` keeps the top-`gaussian_top_n` components plus anything
/// within `gaussian_beam_slack` of the cutoff, so a component that's a close
/// runner-up is never silently dropped; `Heuristic` keeps a strict top-`n`
/// with no safety margin, trading that guarantee for fewer components
/// scored per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneMode {
    None,
    Safe,
    Heuristic,
    Beam,
}

/// Combiner used to pool a pseudo-phone's state set into a single score
/// (spec §4.1 `outprob_cd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdCombiner {
    Average,
    Max,
    TopKMean(usize),
}

/// LM order applied at a word-end node when a word completes (spec §4.3).
/// This is independent of the look-ahead bound pass 1 factors down the
/// WCHMM's shared prefixes (see [`crate::wchmm::WchmmNode::lookahead_max`]),
/// which always uses the unigram regardless of this setting — factoring
/// needs a cheap, context-free bound to stay admissible across every
/// predecessor a shared prefix might have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoringMode {
    Bigram,
    Unigram,
}

/// Lexicon tree prefix-sharing policy (spec §4.2 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreePolicy {
    /// Isolate short words (<= short_word_len phones) from the shared tree
    /// to preserve cross-word LM accuracy.
    IsolateShortWords,
    /// Share everything; favors memory over cross-word LM precision.
    LowMemory,
}

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    // --- acoustic engine ---
    pub prune_mode: PruneMode,
    pub gaussian_top_n: usize,
    pub gaussian_beam_slack: f32,
    pub cd_combiner: CdCombiner,
    /// Top-`m` Gaussian-mixture-selection clusters consulted before
    /// per-component pruning for a tied-mixture codebook (spec §4.1). `None`
    /// skips GMS and scores every component in the codebook directly.
    pub gms_top_m: Option<usize>,
    pub states_per_phone: usize,

    // --- WCHMM build ---
    pub tree_policy: TreePolicy,
    pub short_word_len: usize,
    pub factoring_mode: FactoringMode,

    // --- pass 1 ---
    pub beam_width: f32,
    pub hypo_count_limit: Option<usize>,
    /// Merge tokens that agree on `(node, state)` but disagree only on
    /// which word preceded them (spec §4.4 step 3). Narrows the beam at the
    /// cost of losing the exact predecessor identity for bigram scoring.
    pub word_pair_approximation: bool,
    pub insertion_penalty: f32,

    // --- pass 2 ---
    /// Upper bound on how many hypotheses the pass-2 priority queue holds at
    /// once (spec §4.4/§4.5 "enforce stack_size"); the lowest-scoring
    /// overflow is dropped after each expansion.
    pub stack_size: usize,
    pub hypo_overflow: usize,
    pub nbest: usize,
    /// How many frames past a dead-end hypothesis's last word pass 2 looks
    /// for any other word ending nearby before accepting the dead end as a
    /// genuine completion rather than a token-merging artifact (spec §4.5
    /// step 2 / §8 window property).
    pub lookup_range: usize,
    pub envelope_width: usize,
    pub enable_mbr: bool,
    /// Resolve a word-initial boundary's left context from the actual
    /// predecessor word's last phone (pass 1) instead of falling back to a
    /// monophone. The symmetric right-context case is never resolved since
    /// the following word isn't known during frame-synchronous search.
    pub precise_cross_word_context: bool,

    // --- input rejection (spec §7/§8 scenario 4 & 6) ---
    pub reject_short_len: usize,
    pub reject_long_len: usize,
    pub power_threshold: Option<f32>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            prune_mode: PruneMode::Beam,
            gaussian_top_n: 8,
            gaussian_beam_slack: 5.0,
            cd_combiner: CdCombiner::Max,
            gms_top_m: None,
            states_per_phone: 3,

            tree_policy: TreePolicy::IsolateShortWords,
            short_word_len: 2,
            factoring_mode: FactoringMode::Bigram,

            beam_width: 150.0,
            hypo_count_limit: None,
            word_pair_approximation: false,
            insertion_penalty: 0.0,

            stack_size: 500,
            hypo_overflow: 2000,
            nbest: 10,
            lookup_range: 2,
            envelope_width: 50,
            enable_mbr: false,
            precise_cross_word_context: true,

            reject_short_len: 1,
            reject_long_len: usize::MAX,
            power_threshold: None,
        }
    }
}

impl RecognizerConfig {
    pub fn with_beam_width(mut self, beam_width: f32) -> Self {
        self.beam_width = beam_width;
        self
    }

    pub fn with_nbest(mut self, nbest: usize) -> Self {
        self.nbest = nbest;
        self
    }

    pub fn with_prune_mode(mut self, mode: PruneMode) -> Self {
        self.prune_mode = mode;
        self
    }

    pub fn with_mbr(mut self, enable: bool) -> Self {
        self.enable_mbr = enable;
        self
    }

    pub fn with_reject_long_len(mut self, len: usize) -> Self {
        self.reject_long_len = len;
        self
    }

    pub fn with_reject_short_len(mut self, len: usize) -> Self {
        self.reject_short_len = len;
        self
    }
}
