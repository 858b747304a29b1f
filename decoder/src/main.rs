//! Demonstration CLI driving `speech_core::Recognizer` against a small
//! synthetic acoustic/language model, in the absence of real HTK/ARPA/
//! Julius binary-format loaders (out of scope for the core crate).
//!
//! Styled after the teacher's `libpinyin` binary: build a fallback
//! in-memory demo model, then run one request and print the result.

use clap::Parser;
use speech_core::am::gaussian::GaussianDensity;
use speech_core::am::hmm::PhysicalHmm;
use speech_core::am::state::{MixturePdf, State};
use speech_core::am::AcousticModelBuilder;
use speech_core::config::RecognizerConfig;
use speech_core::feature::{FeatureFrame, Utterance};
use speech_core::lexicon::{Dictionary, Word};
use speech_core::lm::ngram::NgramModel;
use speech_core::lm::LanguageModel;
use speech_core::recognizer::{NullCallbacks, Recognizer};
use speech_core::result::format_plain_text;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "speech-decoder", about = "Two-pass Viterbi decoder demo")]
struct Args {
    /// Number of synthetic frames to decode.
    #[arg(long, default_value_t = 12)]
    frames: usize,

    /// Pass-2 n-best list size.
    #[arg(long, default_value_t = 5)]
    nbest: usize,

    /// Pass-1 beam width, in log-probability.
    #[arg(long, default_value_t = 150.0)]
    beam_width: f32,

    /// Re-rank the n-best list by minimum Bayes risk instead of raw score.
    #[arg(long)]
    mbr: bool,
}

/// One phone, one Gaussian, one emitting state: enough to exercise the
/// search machinery without a real trained model.
fn toy_phone(name: &str, mean: f32) -> PhysicalHmm {
    let density = GaussianDensity::new(vec![mean], vec![1.0]).expect("valid toy density");
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

fn build_demo_recognizer() -> Recognizer {
    info!("using fallback in-memory demo model");

    let mut dict = Dictionary::new();
    let yes_id = dict.insert(Word {
        surface: "yes".into(),
        phones: vec!["y".into(), "eh".into(), "s".into()],
        word_id: 0,
        category: None,
    });
    let no_id = dict.insert(Word {
        surface: "no".into(),
        phones: vec!["n".into(), "ow".into()],
        word_id: 1,
        category: None,
    });
    let _ = (yes_id, no_id);

    let mut am_builder = AcousticModelBuilder::new(1);
    for (i, (name, mean)) in [
        ("y-eh+s", 0.5),
        ("n-ow", -1.0),
        ("y", 0.3),
        ("eh", 0.0),
        ("s", 1.0),
        ("n", -1.2),
        ("ow", -0.8),
    ]
    .into_iter()
    .enumerate()
    {
        let _ = i;
        am_builder.add_physical(toy_phone(name, mean)).expect("toy phone builds");
    }
    for (_, word) in dict.iter() {
        for (i, phone) in word.phones.iter().enumerate() {
            let name = if i == 0 || i == word.phones.len() - 1 {
                phone.clone()
            } else {
                format!("{}-{}+{}", word.phones[i - 1], phone, word.phones[i + 1])
            };
            am_builder.add_logical_name(&name);
        }
    }
    let am = am_builder.build().expect("toy acoustic model builds");

    let mut lm = NgramModel::new();
    let yes = lm.intern("yes");
    let no = lm.intern("no");
    lm.unigram.insert(yes, -0.7);
    lm.unigram.insert(no, -0.7);

    let cfg = RecognizerConfig::default();
    Recognizer::build(am, LanguageModel::Ngram(lm), dict, cfg).expect("recognizer builds")
}

fn synthetic_utterance(frames: usize) -> Utterance {
    let values: Vec<FeatureFrame> = (0..frames)
        .map(|i| FeatureFrame::new(vec![((i % 5) as f32) * 0.2 - 0.4]))
        .collect();
    Utterance {
        frames: values,
        power: vec![1.0; frames],
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    println!("===================================================");
    println!("  speech-decoder - two-pass Viterbi search demo");
    println!("===================================================");

    let mut recognizer = build_demo_recognizer();
    recognizer.cfg.nbest = args.nbest;
    recognizer.cfg.beam_width = args.beam_width;
    recognizer.cfg.enable_mbr = args.mbr;

    let utterance = synthetic_utterance(args.frames);
    let mut callbacks = NullCallbacks;
    let outcome = recognizer.recognize(&utterance, &mut callbacks);

    println!("status: {:?}", outcome.status);
    println!("{}", format_plain_text(&outcome.results, &recognizer.dict));
}
