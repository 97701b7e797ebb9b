pub mod perceptron;
pub mod score;
pub mod viterbi;
