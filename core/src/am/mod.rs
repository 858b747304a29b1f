//! The acoustic model: trained physical HMMs, their Gaussian codebooks, and
//! the logical-to-physical (or pseudo) resolution table the WCHMM and
//! search modules score against.

pub mod gaussian;
pub mod hmm;
pub mod state;

use crate::acoustic::gms::GmsTable;
use crate::config::{CdCombiner, PruneMode};
use crate::error::{DecoderError, Result, LOG_ZERO};
use crate::feature::FeatureFrame;
use gaussian::Codebook;
use hmm::{parse_phone_name, HmmSet, LogicalHmm, LogicalResolution, PhoneContext, PhysicalHmm};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AcousticModel {
    pub hmm: HmmSet,
    pub codebooks: Vec<Codebook>,
    pub states_per_phone: usize,
    /// GMS coarse tables, index-aligned with `codebooks`, built once from
    /// each codebook's densities (spec §4.1). Rebuilt from `codebooks` by
    /// the builder rather than serialized: it's derived data, not trained
    /// state.
    #[serde(skip)]
    pub gms_tables: Vec<GmsTable>,
}

impl AcousticModel {
    /// Output log-probability for one logical HMM's emitting state against
    /// `frame`. Resolves `Defined` names to a single mixture lookup and
    /// `Pseudo` names to a pooled-and-combined score (spec §4.1).
    #[allow(clippy::too_many_arguments)]
    pub fn output_prob(
        &self,
        logical_name: &str,
        state_idx: usize,
        frame: &FeatureFrame,
        prune_mode: PruneMode,
        gaussian_top_n: usize,
        gaussian_beam_slack: f32,
        combiner: CdCombiner,
        gms_top_m: Option<usize>,
        precomputed_densities: Option<&[f32]>,
    ) -> f32 {
        let Some(logical) = self.hmm.lookup_logical(logical_name) else {
            return LOG_ZERO;
        };
        match &logical.resolution {
            LogicalResolution::Defined { physical } => {
                let Some(phys) = self.hmm.lookup_physical(physical) else {
                    return LOG_ZERO;
                };
                let Some(state) = phys.states.get(state_idx) else {
                    return LOG_ZERO;
                };
                state.pdf.log_prob(
                    frame,
                    &self.codebooks,
                    &self.gms_tables,
                    prune_mode,
                    gaussian_top_n,
                    gaussian_beam_slack,
                    gms_top_m,
                    precomputed_densities,
                )
            }
            LogicalResolution::Pseudo { state_members } => {
                let Some(members) = state_members.get(state_idx) else {
                    return LOG_ZERO;
                };
                let scores: Vec<f32> = members
                    .iter()
                    .filter_map(|(phys_name, st_idx)| {
                        let phys = self.hmm.lookup_physical(phys_name)?;
                        let state = phys.states.get(*st_idx)?;
                        Some(state.pdf.log_prob(
                            frame,
                            &self.codebooks,
                            &self.gms_tables,
                            prune_mode,
                            gaussian_top_n,
                            gaussian_beam_slack,
                            gms_top_m,
                            None,
                        ))
                    })
                    .collect();
                state::combine_cd_scores(&scores, combiner)
            }
        }
    }

    /// The tied-mixture codebook id backing `logical_name`'s `state_idx`-th
    /// state, if any. `Pseudo` resolutions pool several physical states
    /// (possibly across different codebooks), so they never report one.
    pub fn tied_codebook_of(&self, logical_name: &str, state_idx: usize) -> Option<usize> {
        let logical = self.hmm.lookup_logical(logical_name)?;
        let LogicalResolution::Defined { physical } = &logical.resolution else {
            return None;
        };
        let phys = self.hmm.lookup_physical(physical)?;
        let state = phys.states.get(state_idx)?;
        match &state.pdf {
            state::MixturePdf::Tied { codebook_id, .. } => Some(*codebook_id),
            state::MixturePdf::Owned { .. } => None,
        }
    }

    /// Transition log-probabilities for a logical name's physical topology.
    /// Pseudo HMMs borrow the topology of their first pooled member, since
    /// transition structure (unlike output distribution) is not
    /// context-dependent in this model (spec §3).
    pub fn transitions(&self, logical_name: &str) -> Option<(&[f32], &[f32], Option<f32>)> {
        let logical = self.hmm.lookup_logical(logical_name)?;
        let physical_name = match &logical.resolution {
            LogicalResolution::Defined { physical } => physical,
            LogicalResolution::Pseudo { state_members } => {
                &state_members.iter().flatten().next()?.0
            }
        };
        let phys = self.hmm.lookup_physical(physical_name)?;
        Some((
            &phys.self_loop_logprob,
            &phys.forward_logprob,
            phys.skip_logprob,
        ))
    }

    pub fn num_states(&self, logical_name: &str) -> usize {
        self.hmm
            .lookup_logical(logical_name)
            .map(|_| self.states_per_phone)
            .unwrap_or(0)
    }

    /// Resolves a dynamically-determined triphone context at search time
    /// (cross-word boundary phones, whose neighbor is only known once the
    /// preceding/following word is chosen). Falls back through biphone to
    /// monophone exactly as the build-time pseudo-phone table does, so a
    /// context unseen in training still yields a usable logical name.
    pub fn resolve_dynamic_context(&self, left: &str, center: &str, right: &str) -> String {
        let triphone = format!("{left}-{center}+{right}");
        if self.hmm.logical.contains_key(&triphone) {
            return triphone;
        }
        let left_bi = format!("{left}-{center}");
        if self.hmm.logical.contains_key(&left_bi) {
            return left_bi;
        }
        let right_bi = format!("{center}+{right}");
        if self.hmm.logical.contains_key(&right_bi) {
            return right_bi;
        }
        center.to_string()
    }
}

/// Builds an [`AcousticModel`] from trained physical HMMs plus the set of
/// logical names the lexicon actually references, eagerly resolving each
/// referenced name to `Defined` or `Pseudo` (scope decision: pseudo tables
/// are built only for names implied by the explicit set, not combinatorially
/// over all phone pairs — see DESIGN.md).
#[derive(Debug, Default)]
pub struct AcousticModelBuilder {
    physical: HashMap<String, PhysicalHmm>,
    physical_contexts: HashMap<PhoneContext, Vec<String>>,
    explicit_logical_names: HashSet<String>,
    states_per_phone: usize,
    codebooks: Vec<Codebook>,
    gms_cluster_size: usize,
}

impl AcousticModelBuilder {
    pub fn new(states_per_phone: usize) -> Self {
        Self {
            states_per_phone,
            gms_cluster_size: 4,
            ..Default::default()
        }
    }

    /// Number of mixture components grouped per GMS coarse cluster (spec
    /// §4.1). Only matters once `gms_top_m` is set at decode time; ignored
    /// otherwise.
    pub fn with_gms_cluster_size(mut self, size: usize) -> Self {
        self.gms_cluster_size = size;
        self
    }

    pub fn add_codebook(&mut self, codebook: Codebook) -> &mut Self {
        self.codebooks.push(codebook);
        self
    }

    pub fn add_physical(&mut self, hmm: PhysicalHmm) -> Result<&mut Self> {
        let ctx = parse_phone_name(&hmm.name)?;
        self.physical_contexts
            .entry(ctx)
            .or_default()
            .push(hmm.name.clone());
        self.physical.insert(hmm.name.clone(), hmm);
        Ok(self)
    }

    /// Registers a logical name referenced by the lexicon; the builder
    /// guarantees it resolves to something scoreable once [`Self::build`]
    /// succeeds.
    pub fn add_logical_name(&mut self, name: &str) -> &mut Self {
        self.explicit_logical_names.insert(name.to_string());
        self
    }

    pub fn build(self) -> Result<AcousticModel> {
        let mut logical = HashMap::new();
        for name in &self.explicit_logical_names {
            let context = parse_phone_name(name)?;
            let resolution = if self.physical.contains_key(name) {
                LogicalResolution::Defined {
                    physical: name.clone(),
                }
            } else {
                self.build_pseudo(&context)?
            };
            logical.insert(
                name.clone(),
                LogicalHmm {
                    name: name.clone(),
                    context,
                    resolution,
                },
            );
        }

        if logical.is_empty() {
            return Err(DecoderError::InvalidAcousticModel(
                "no logical HMM names registered".into(),
            ));
        }

        debug!(
            physical = self.physical.len(),
            logical = logical.len(),
            "built acoustic model"
        );

        let gms_tables = self
            .codebooks
            .iter()
            .map(|cb| GmsTable::build(&cb.densities, self.gms_cluster_size))
            .collect();

        Ok(AcousticModel {
            hmm: HmmSet {
                physical: self.physical,
                logical,
            },
            codebooks: self.codebooks,
            states_per_phone: self.states_per_phone,
            gms_tables,
        })
    }

    fn build_pseudo(&self, context: &PhoneContext) -> Result<LogicalResolution> {
        let mut member_names: Vec<String> = Vec::new();
        for candidate in context.backoff_contexts() {
            if let Some(names) = self.physical_contexts.get(&candidate) {
                member_names.extend(names.iter().cloned());
            }
        }
        member_names.sort();
        member_names.dedup();

        if member_names.is_empty() {
            warn!(center = context.center(), "no pseudo-phone members found for unseen context");
            return Err(DecoderError::WchmmBuild(format!(
                "cannot build pseudo phone for context centered on '{}': no biphone or monophone backoff available",
                context.center()
            )));
        }

        let mut state_members = vec![Vec::new(); self.states_per_phone];
        for name in &member_names {
            let Some(phys) = self.physical.get(name) else {
                continue;
            };
            for state_idx in 0..self.states_per_phone.min(phys.num_states()) {
                state_members[state_idx].push((name.clone(), state_idx));
            }
        }
        Ok(LogicalResolution::Pseudo { state_members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::am::gaussian::GaussianDensity;
    use crate::am::state::{MixturePdf, State};

    fn toy_physical(name: &str, mean: f32) -> PhysicalHmm {
        let density = GaussianDensity::new(vec![mean], vec![1.0]).unwrap();
        let pdf = MixturePdf::Owned {
            densities: vec![density],
            log_weights: vec![0.0],
        };
        PhysicalHmm {
            name: name.to_string(),
            states: vec![State::new(pdf)],
            self_loop_logprob: vec![-0.5],
            forward_logprob: vec![-0.9],
            skip_logprob: None,
        }
    }

    #[test]
    fn unseen_triphone_pools_biphone_members() {
        let mut builder = AcousticModelBuilder::new(1);
        builder.add_physical(toy_physical("a-b", 0.1)).unwrap();
        builder.add_physical(toy_physical("b+c", 0.2)).unwrap();
        builder.add_logical_name("a-b+c");
        let model = builder.build().unwrap();

        let resolved = model.hmm.lookup_logical("a-b+c").unwrap();
        match &resolved.resolution {
            LogicalResolution::Pseudo { state_members } => {
                assert_eq!(state_members[0].len(), 2);
            }
            LogicalResolution::Defined { .. } => panic!("expected a pooled pseudo phone"),
        }
    }

    #[test]
    fn unresolvable_context_is_an_error() {
        let mut builder = AcousticModelBuilder::new(1);
        builder.add_logical_name("x-y+z");
        assert!(builder.build().is_err());
    }

    #[test]
    fn defined_triphone_is_used_directly() {
        let mut builder = AcousticModelBuilder::new(1);
        builder.add_physical(toy_physical("a-b+c", 0.0)).unwrap();
        builder.add_logical_name("a-b+c");
        let model = builder.build().unwrap();
        assert!(matches!(
            model.hmm.lookup_logical("a-b+c").unwrap().resolution,
            LogicalResolution::Defined { .. }
        ));
    }
}
