//! Element type conversion

use crate::error::{Result, TensorTrainError};
use crate::parallel::try_map_indexed;
use crate::tensortrain::TensorTrain;
use num_traits::AsPrimitive;

/// How [`cast`] treats values the target type cannot hold exactly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CastPolicy {
    /// Convert with the usual `as` rules (rounding, truncation, saturation)
    #[default]
    Lossy,
    /// Reject any value that does not convert back to itself
    Exact,
}

/// Convert every core to element type `U`; ranks and batch size are kept.
///
/// # Errors
///
/// `CastRejected` under [`CastPolicy::Exact`] for the first value that does
/// not round-trip. NaN is accepted.
pub fn cast<T, U>(tt: &TensorTrain<T>, policy: CastPolicy) -> Result<TensorTrain<U>>
where
    T: AsPrimitive<U> + PartialEq + Send + Sync,
    U: AsPrimitive<T> + Send + Sync,
{
    let _span =
        tracing::trace_span!("cast", from = tt.dtype_name(), to = std::any::type_name::<U>())
            .entered();
    let cores = try_map_indexed(tt.ndims(), |k| {
        let core = tt.core(k);
        if policy == CastPolicy::Exact {
            let rejected = core.as_slice().iter().position(|&x| {
                let there: U = x.as_();
                let back: T = there.as_();
                back != x && !is_nan(x)
            });
            if let Some(index) = rejected {
                return Err(TensorTrainError::CastRejected { core: k, index });
            }
        }
        Ok(core.map(|&x| AsPrimitive::<U>::as_(x)))
    })?;
    TensorTrain::from_parts(
        cores,
        Some(tt.declared_ranks().to_vec()),
        tt.declared_batch_size(),
    )
}

#[allow(clippy::eq_op)]
fn is_nan<T: PartialEq + Copy>(x: T) -> bool {
    x != x
}
