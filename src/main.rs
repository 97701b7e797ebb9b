use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use sptag::{ChainTagger, TagVocab, TransitionMatrix, UnaryPotentials};

/// Tag sequences of unary potentials with a transition matrix.
/// The input is a JSON problem file: the tag labels, one unary potential row
/// per timestep per sequence, and optionally the gold tags.
#[derive(Debug, Parser)]
#[command(version)]
struct Argv {
    /// read a transition matrix from a file (MODEL); all-ones when omitted
    #[arg(short, long, value_name = "MODEL")]
    model: Option<PathBuf>,
    /// report accuracy and hinge loss against the gold tags in the input
    #[arg(short = 't', long = "test")]
    evaluate: bool,
    /// suppress tagging output (useful for test mode)
    #[arg(short, long)]
    quiet: bool,
    /// problem files (JSON)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct Problem {
    tags: Vec<String>,
    sequences: Vec<ProblemSeq>,
}

#[derive(Debug, Deserialize)]
struct ProblemSeq {
    unary: Vec<Vec<f64>>,
    gold: Option<Vec<String>>,
}

fn main() {
    env_logger::init();
    let argv = Argv::parse();
    log::info!("argv: {:?}", argv);

    for fpath in &argv.inputs {
        let f = File::open(fpath).expect("failed to open the input file");
        let problem: Problem =
            serde_json::from_reader(BufReader::new(f)).expect("failed to parse problem file");
        let vocab = TagVocab::from(problem.tags.clone());
        let trans = match &argv.model {
            Some(path) => TransitionMatrix::load(path).expect("failed to load model"),
            None => TransitionMatrix::ones(vocab.len()),
        };
        let mut tagger = ChainTagger::new(vocab, &trans).expect("tag counts disagree");

        let seqs: Vec<_> = problem.sequences.iter().map(|s| s.unary.clone()).collect();
        let potentials = UnaryPotentials::from_sequences(&seqs, tagger.num_tags())
            .expect("malformed unary potentials");

        let gold = if argv.evaluate {
            let vocab = tagger.vocab();
            let gold: Vec<Vec<usize>> = problem
                .sequences
                .iter()
                .map(|s| {
                    s.gold
                        .as_ref()
                        .expect("test mode needs gold tags in the input")
                        .iter()
                        .map(|label| {
                            vocab
                                .id(label)
                                .unwrap_or_else(|| panic!("unknown gold label: {}", label))
                        })
                        .collect()
                })
                .collect();
            Some(gold)
        } else {
            None
        };

        let output = tagger
            .forward(&potentials, &trans, gold.as_deref())
            .expect("forward pass failed");

        if !argv.quiet {
            let labeled = tagger
                .decode_to_labels(&output.paths)
                .expect("decoded path outside the vocabulary");
            for (labels, score) in labeled.iter().zip(&output.scores) {
                println!("{}\t{}", score, labels.join(" "));
            }
        }
        if argv.evaluate {
            println!("{}", tagger.metrics());
            if let Some(loss) = output.loss {
                println!("Hinge loss: {}", loss);
            }
            tagger.reset_metrics();
        }
    }
}
