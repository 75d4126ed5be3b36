use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Build an int tensor from row-major values
pub fn int_tensor<B: Backend, const D: usize>(
    values: Vec<usize>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D, Int> {
    let values: Vec<B::IntElem> = values.into_iter().map(|e| (e as i64).elem()).collect();

    Tensor::from_data(Data::new(values, Shape::new(shape)), device)
}

/// Build a float tensor from row-major values
pub fn float_tensor<B: Backend, const D: usize>(
    values: Vec<f32>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D> {
    let values: Vec<B::FloatElem> = values.into_iter().map(|e| e.elem()).collect();

    Tensor::from_data(Data::new(values, Shape::new(shape)), device)
}

/// Build a 1D int tensor of lengths
pub fn lengths<B: Backend>(values: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    int_tensor(values.to_vec(), [values.len()], device)
}

/// Generate padding to a specific max length. Each row is copied into the front of a
/// `[batch_size, seq_length]` tensor, and the remaining positions hold `pad_token`.
pub fn pad_to<B: Backend, R: AsRef<[usize]>>(
    pad_token: usize,
    tokens_list: &[R],
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = tokens_list.len();

    let mut values = vec![pad_token; batch_size * seq_length];

    for (index, tokens) in tokens_list.iter().enumerate() {
        let start = index * seq_length;

        for (offset, token) in tokens.as_ref().iter().take(seq_length).enumerate() {
            values[start + offset] = *token;
        }
    }

    int_tensor(values, [batch_size, seq_length], device)
}

/// Log-sum-exp over the `from_label` dimension of a `[batch_size, from_label, to_label]` score
/// tensor, as used by CRF forward passes. Returns `[batch_size, to_label]`.
///
/// Columns that are entirely `-inf` produce `-inf` rather than NaN.
pub fn log_sum_exp<B: Backend>(vec: Tensor<B, 3>) -> Tensor<B, 2> {
    let [_, from_label, _] = vec.dims();

    // A finite max keeps `vec - max` at -inf, never -inf - -inf
    let max_scores = vec.clone().max_dim(1).clamp_min(f32::MIN);

    let max_scores_expanded = max_scores.clone().repeat(1, from_label);
    let summed = (vec - max_scores_expanded).exp().sum_dim(1).log();

    (max_scores + summed).squeeze(1)
}
