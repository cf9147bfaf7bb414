//! Core norm balancing

use crate::error::Result;
use crate::parallel::map_indexed;
use crate::tensortrain::TensorTrain;
use crate::traits::TTScalar;

/// Rescale every core to the geometric mean of the core norms.
///
/// The scale factors multiply to one, so the represented tensor does not
/// change. Batch items are balanced independently. An item with a zero
/// core is left as it is.
pub fn renormalize_tt_cores<T: TTScalar>(tt: &TensorTrain<T>) -> Result<TensorTrain<T>> {
    let _span = tracing::trace_span!("renormalize_tt_cores", ndims = tt.ndims()).entered();
    let d = tt.ndims();
    let items = tt.dims(0).batch;

    // factors[b][k] scales core k of item b
    let factors: Vec<Vec<f64>> = map_indexed(items, |b| {
        let norms: Vec<f64> = (0..d)
            .map(|k| {
                let len = tt.dims(k).item_len();
                tt.core(k).as_slice()[b * len..(b + 1) * len]
                    .iter()
                    .map(|x| x.abs_sq())
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();
        if norms.iter().any(|&n| n == 0.0) {
            tracing::debug!(item = b, "zero core, leaving batch item unscaled");
            return vec![1.0; d];
        }
        let mean_log = norms.iter().map(|n| n.ln()).sum::<f64>() / d as f64;
        let target = mean_log.exp();
        norms.iter().map(|n| target / n).collect()
    });

    let parts = map_indexed(d, |k| {
        let dims = tt.dims(k);
        let len = dims.item_len();
        let data = tt
            .core(k)
            .as_slice()
            .chunks(len.max(1))
            .zip(&factors)
            .flat_map(|(chunk, scale)| {
                let s = T::from_f64(scale[k]);
                chunk.iter().map(move |&x| x * s)
            })
            .collect();
        (dims, data)
    });
    TensorTrain::assemble(
        tt.kind(),
        tt.declared_batch_size(),
        tt.declared_ranks().to_vec(),
        parts,
    )
}
