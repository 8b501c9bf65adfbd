use super::{
    combinators::pipe,
    layers::{Learning, bias, dense, dropout, swoop},
    transform::Factory,
};

/// A dense layer with bias, a swoop activation and full dropout of half the outputs.
pub fn logical(output_size: usize, learning: Learning) -> Box<dyn Factory> {
    pipe(vec![
        dense(output_size, learning),
        bias(learning),
        swoop(),
        dropout(0.5, 1.),
    ])
}
