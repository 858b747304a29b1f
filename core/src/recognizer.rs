//! The recognizer facade: wires the acoustic model, language model,
//! dictionary, and WCHMM together and drives one utterance through both
//! passes, reporting progress through a callback trait (spec §4.6).
//!
//! Grounded on the teacher's `Engine<P>` in `engine.rs` (a single facade
//! type owning the model pieces, exposing one entry point per request) and
//! generalized from an in-process method call returning a value to one
//! that also drives caller-supplied callbacks, the way Julius's own
//! `callback.c` hook points (`CALLBACK_EVENT_PASS1_BEGIN`, etc, in
//! `original_source/libjulius/src/callback.c`) notify a module-mode client
//! as recognition proceeds.

use crate::am::AcousticModel;
use crate::config::RecognizerConfig;
use crate::error::Status;
use crate::feature::Utterance;
use crate::lexicon::Dictionary;
use crate::lm::LanguageModel;
use crate::pass1::run_pass1;
use crate::pass2::lattice::{ConfusionNetwork, Lattice};
use crate::pass2::mbr::select_mbr;
use crate::pass2::stack::StackDecoder;
use crate::result::{build_results, RecognitionResult};
use crate::wchmm::Wchmm;
use tracing::{info, warn};

/// Callback order is fixed and always paired:
/// `recog_begin -> [pass1_begin -> pass1_frame* -> pass1_end -> pass2_begin
/// -> result* -> pass2_end] -> recog_end`. The pass-1/pass-2 block is
/// skipped entirely when the utterance is rejected before search begins.
#[allow(unused_variables)]
pub trait RecognizerCallbacks {
    fn recog_begin(&mut self) {}
    fn pass1_begin(&mut self) {}
    fn pass1_frame(&mut self, frame_idx: usize) {}
    fn pass1_end(&mut self, best_score: f32) {}
    fn pass2_begin(&mut self) {}
    fn result(&mut self, result: &RecognitionResult) {}
    fn pass2_end(&mut self) {}
    fn recog_end(&mut self, status: Status) {}
}

#[derive(Default)]
pub struct NullCallbacks;
impl RecognizerCallbacks for NullCallbacks {}

#[derive(Debug, Clone, Default)]
pub struct RecognitionOutcome {
    pub status: Status,
    pub results: Vec<RecognitionResult>,
    pub lattice: Option<Lattice>,
    pub confusion: Option<ConfusionNetwork>,
}

pub struct Recognizer {
    pub am: AcousticModel,
    pub lm: LanguageModel,
    pub dict: Dictionary,
    pub wchmm: Wchmm,
    pub cfg: RecognizerConfig,
}

impl Recognizer {
    pub fn build(
        am: AcousticModel,
        lm: LanguageModel,
        dict: Dictionary,
        cfg: RecognizerConfig,
    ) -> crate::error::Result<Self> {
        let mut wchmm = Wchmm::build(&dict, &cfg)?;
        wchmm.annotate_lookahead(&dict, &lm);
        info!(words = dict.len(), nodes = wchmm.num_nodes(), "recognizer ready");
        Ok(Self {
            am,
            lm,
            dict,
            wchmm,
            cfg,
        })
    }

    fn reject(&self, utterance: &Utterance) -> Option<Status> {
        if utterance.is_empty() || utterance.len() < self.cfg.reject_short_len {
            return Some(Status::RejectShort);
        }
        if utterance.len() > self.cfg.reject_long_len {
            return Some(Status::RejectLong);
        }
        if let Some(threshold) = self.cfg.power_threshold {
            if let Some(mean) = utterance.mean_power() {
                if mean < threshold {
                    return Some(Status::RejectPower);
                }
            }
        }
        None
    }

    /// Runs both search passes over `utterance`, driving `callbacks` at
    /// each stage boundary, and returns the final outcome.
    pub fn recognize(
        &self,
        utterance: &Utterance,
        callbacks: &mut impl RecognizerCallbacks,
    ) -> RecognitionOutcome {
        callbacks.recog_begin();

        if let Some(status) = self.reject(utterance) {
            callbacks.recog_end(status);
            return RecognitionOutcome {
                status,
                ..Default::default()
            };
        }

        callbacks.pass1_begin();
        let pass1 = match run_pass1(&self.wchmm, &self.dict, &self.am, &self.lm, &self.cfg, utterance) {
            Ok(r) => r,
            Err(err) => {
                warn!(error = %err, "pass 1 failed");
                callbacks.recog_end(Status::SearchFailed);
                return RecognitionOutcome {
                    status: Status::SearchFailed,
                    ..Default::default()
                };
            }
        };
        for t in 0..pass1.frames_searched {
            callbacks.pass1_frame(t);
        }
        callbacks.pass1_end(pass1.best_final_score);

        if pass1.trellis.entries.is_empty() {
            callbacks.recog_end(Status::SearchFailed);
            return RecognitionOutcome {
                status: Status::SearchFailed,
                ..Default::default()
            };
        }

        callbacks.pass2_begin();
        let decoder = StackDecoder::new(&pass1.trellis, &self.lm, &self.cfg);
        let hypotheses = decoder.run();
        if hypotheses.is_empty() {
            callbacks.pass2_end();
            callbacks.recog_end(Status::SearchFailed);
            return RecognitionOutcome {
                status: Status::SearchFailed,
                ..Default::default()
            };
        }

        let confusion = ConfusionNetwork::from_nbest(&hypotheses);
        let lattice = Lattice::from_hypotheses(&hypotheses);
        let mut results = build_results(&hypotheses, &confusion, &self.lm);

        if self.cfg.enable_mbr {
            if let Some(best_idx) = select_mbr(&hypotheses) {
                results.swap(0, best_idx);
            }
        }

        for result in &results {
            callbacks.result(result);
        }
        callbacks.pass2_end();
        callbacks.recog_end(Status::Ok);

        RecognitionOutcome {
            status: Status::Ok,
            results,
            lattice: Some(lattice),
            confusion: Some(confusion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_utterance_is_rejected_before_search() {
        struct Recorder {
            order: Vec<&'static str>,
        }
        impl RecognizerCallbacks for Recorder {
            fn recog_begin(&mut self) {
                self.order.push("begin");
            }
            fn pass1_begin(&mut self) {
                self.order.push("pass1_begin");
            }
            fn recog_end(&mut self, _status: Status) {
                self.order.push("end");
            }
        }

        let recognizer = Recognizer {
            am: AcousticModel::default(),
            lm: LanguageModel::Ngram(crate::lm::ngram::NgramModel::new()),
            dict: Dictionary::new(),
            wchmm: Wchmm {
                nodes: vec![],
                root: 0,
            },
            cfg: RecognizerConfig::default(),
        };
        let mut recorder = Recorder { order: vec![] };
        let outcome = recognizer.recognize(&Utterance::default(), &mut recorder);
        assert_eq!(outcome.status, Status::RejectShort);
        assert_eq!(recorder.order, vec!["begin", "end"]);
    }
}
