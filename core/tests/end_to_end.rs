//! End-to-end exercise of `Recognizer::recognize` against a tiny synthetic
//! model, covering the scenarios SPEC_FULL.md §8 describes: a normal
//! decode producing both passes' output, short/long/power rejection, and
//! forced alignment over the winning hypothesis.

use speech_core::am::gaussian::GaussianDensity;
use speech_core::am::hmm::PhysicalHmm;
use speech_core::am::state::{MixturePdf, State};
use speech_core::am::AcousticModelBuilder;
use speech_core::config::RecognizerConfig;
use speech_core::feature::{FeatureFrame, Utterance};
use speech_core::lexicon::{Dictionary, Word};
use speech_core::lm::dfa::{DfaArc, DfaGrammar};
use speech_core::lm::ngram::NgramModel;
use speech_core::lm::LanguageModel;
use speech_core::recognizer::{NullCallbacks, Recognizer};
use speech_core::result::forced_align;
use speech_core::Status;
use std::collections::{HashMap, HashSet};

fn toy_phone(name: &str, mean: f32) -> PhysicalHmm {
    let density = GaussianDensity::new(vec![mean], vec![1.0]).unwrap();
    let pdf = MixturePdf::Owned {
        densities: vec![density],
        log_weights: vec![0.0],
    };
    PhysicalHmm {
        name: name.to_string(),
        states: vec![State::new(pdf)],
        self_loop_logprob: vec![-0.3],
        forward_logprob: vec![-1.3],
        skip_logprob: None,
    }
}

fn build_recognizer(cfg: RecognizerConfig) -> Recognizer {
    let mut lm = NgramModel::new();
    let go = lm.intern("go");
    let no = lm.intern("no");
    lm.unigram.insert(go, -0.5);
    lm.unigram.insert(no, -0.9);
    build_recognizer_with_lm(cfg, LanguageModel::Ngram(lm))
}

fn build_recognizer_with_lm(cfg: RecognizerConfig, lm: LanguageModel) -> Recognizer {
    let mut dict = Dictionary::new();
    dict.insert(Word {
        surface: "go".into(),
        phones: vec!["g".into(), "ow".into()],
        word_id: 0,
        category: Some("VERB".into()),
    });
    dict.insert(Word {
        surface: "no".into(),
        phones: vec!["n".into(), "ow".into()],
        word_id: 1,
        category: Some("NEG".into()),
    });

    let mut builder = AcousticModelBuilder::new(1);
    for (name, mean) in [("g", -1.0), ("n", 1.0), ("ow", 0.0)] {
        builder.add_physical(toy_phone(name, mean)).unwrap();
    }
    for (_, word) in dict.iter() {
        for phone in &word.phones {
            builder.add_logical_name(phone);
        }
    }
    let am = builder.build().unwrap();

    Recognizer::build(am, lm, dict, cfg).unwrap()
}

fn frames(values: &[f32]) -> Utterance {
    Utterance {
        frames: values.iter().map(|&v| FeatureFrame::new(vec![v])).collect(),
        power: vec![1.0; values.len()],
    }
}

#[test]
fn decodes_a_short_synthetic_utterance() {
    let recognizer = build_recognizer(RecognizerConfig::default());
    let utterance = frames(&[-1.0, -1.0, 0.0, 0.0]);
    let mut callbacks = NullCallbacks;
    let outcome = recognizer.recognize(&utterance, &mut callbacks);
    assert_eq!(outcome.status, Status::Ok);
    assert!(!outcome.results.is_empty());
    assert!(outcome.lattice.is_some());
    assert!(outcome.confusion.is_some());
}

#[test]
fn rejects_empty_utterance_as_too_short() {
    let recognizer = build_recognizer(RecognizerConfig::default());
    let utterance = Utterance::default();
    let mut callbacks = NullCallbacks;
    let outcome = recognizer.recognize(&utterance, &mut callbacks);
    assert_eq!(outcome.status, Status::RejectShort);
    assert!(outcome.results.is_empty());
}

#[test]
fn rejects_utterance_exceeding_configured_max_length() {
    let cfg = RecognizerConfig {
        reject_long_len: 2,
        ..RecognizerConfig::default()
    };
    let recognizer = build_recognizer(cfg);
    let utterance = frames(&[-1.0, -1.0, 0.0, 0.0]);
    let mut callbacks = NullCallbacks;
    let outcome = recognizer.recognize(&utterance, &mut callbacks);
    assert_eq!(outcome.status, Status::RejectLong);
}

#[test]
fn rejects_low_power_utterance() {
    let cfg = RecognizerConfig {
        power_threshold: Some(0.5),
        ..RecognizerConfig::default()
    };
    let recognizer = build_recognizer(cfg);
    let mut utterance = frames(&[-1.0, -1.0, 0.0, 0.0]);
    utterance.power = vec![0.1; 4];
    let mut callbacks = NullCallbacks;
    let outcome = recognizer.recognize(&utterance, &mut callbacks);
    assert_eq!(outcome.status, Status::RejectPower);
}

#[test]
fn forced_alignment_segments_every_phone() {
    let recognizer = build_recognizer(RecognizerConfig::default());
    let utterance = frames(&[-1.0, -1.0, 0.0, 0.0]);
    let word_go = recognizer.dict.get(0).unwrap();
    let aligned = forced_align(&[word_go], &[0], &recognizer.am, &recognizer.cfg, &utterance).unwrap();
    assert_eq!(aligned.len(), word_go.phones.len());
    assert_eq!(aligned.first().unwrap().start_frame, 0);
    assert_eq!(aligned.last().unwrap().end_frame, utterance.len() - 1);
}

#[test]
fn dfa_grammar_with_no_admissible_start_category_fails_the_search() {
    let grammar = DfaGrammar {
        start_state: 0,
        accept_states: HashSet::from([1]),
        arcs: vec![
            vec![DfaArc {
                category: "ADJECTIVE".into(),
                next_state: 1,
            }],
            vec![],
        ],
        category_words: HashMap::new(),
    };
    let recognizer = build_recognizer_with_lm(RecognizerConfig::default(), LanguageModel::Dfa(grammar));
    let utterance = frames(&[-1.0, -1.0, 0.0, 0.0]);
    let mut callbacks = NullCallbacks;
    let outcome = recognizer.recognize(&utterance, &mut callbacks);
    assert_eq!(outcome.status, Status::SearchFailed);
}

#[test]
fn permissive_dfa_grammar_still_lets_recognition_succeed() {
    let grammar = DfaGrammar {
        start_state: 0,
        accept_states: HashSet::from([1]),
        arcs: vec![
            vec![
                DfaArc {
                    category: "VERB".into(),
                    next_state: 1,
                },
                DfaArc {
                    category: "NEG".into(),
                    next_state: 1,
                },
            ],
            vec![
                DfaArc {
                    category: "VERB".into(),
                    next_state: 1,
                },
                DfaArc {
                    category: "NEG".into(),
                    next_state: 1,
                },
            ],
        ],
        category_words: HashMap::from([
            ("VERB".to_string(), HashSet::from([0])),
            ("NEG".to_string(), HashSet::from([1])),
        ]),
    };
    let recognizer = build_recognizer_with_lm(RecognizerConfig::default(), LanguageModel::Dfa(grammar));
    let utterance = frames(&[-1.0, -1.0, 0.0, 0.0]);
    let mut callbacks = NullCallbacks;
    let outcome = recognizer.recognize(&utterance, &mut callbacks);
    assert_eq!(outcome.status, Status::Ok);
    assert!(!outcome.results.is_empty());
}
