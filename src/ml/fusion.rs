// ============================================================
// Layer 5 — FusionModel Trait
// ============================================================
// The one interface every assembled model exposes, so the
// factory can hand back any architecture behind a Box and
// the application layer never needs to know which it got.
//
//   forward(src_list, trg_list)  → [batch, output_width]
//
// Each list holds one [batch, n_feature_type, d_input] tensor
// per input source, in the order of the settings file.

use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};

use crate::domain::{error::ModelError, settings::ModelKind};

pub trait FusionModel<B: Backend> {
    /// The architecture this model was assembled as.
    fn kind(&self) -> ModelKind;

    /// Run every source through the model and fuse them into one prediction.
    fn forward(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Tensor<B, 2>, ModelError>;

    /// Number of trainable scalars.
    fn num_params(&self) -> usize;

    /// Mean-squared error of the prediction against `targets`
    /// (`[batch, output_width]`), returned with the prediction.
    fn forward_loss(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
        targets:  Tensor<B, 2>,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 2>), ModelError> {
        let output = self.forward(src_list, trg_list)?;
        let loss   = MseLoss::new().forward(output.clone(), targets, Reduction::Mean);
        Ok((loss, output))
    }
}

/// Check that `tensors` holds one `[_, seq_len, features]` tensor per expected shape.
pub(crate) fn check_sources<B: Backend>(
    tensors: &[Tensor<B, 3>],
    shapes:  &[(usize, usize)],
) -> Result<(), ModelError> {
    if tensors.len() != shapes.len() {
        return Err(ModelError::SourceCountMismatch {
            expected: shapes.len(),
            actual:   tensors.len(),
        });
    }
    for (index, (tensor, &(seq_len, features))) in tensors.iter().zip(shapes).enumerate() {
        let dims = tensor.dims();
        if dims[1] != seq_len || dims[2] != features {
            return Err(ModelError::SourceShapeMismatch {
                index,
                seq_len,
                features,
                actual: dims.to_vec(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_check_sources_reports_count_then_shape() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 3>::zeros([2, 3, 4], &device);
        let b = Tensor::<TestBackend, 3>::zeros([2, 1, 4], &device);

        assert!(check_sources(&[a.clone(), b.clone()], &[(3, 4), (1, 4)]).is_ok());

        assert_eq!(
            check_sources(&[a.clone()], &[(3, 4), (1, 4)]),
            Err(ModelError::SourceCountMismatch { expected: 2, actual: 1 })
        );
        assert_eq!(
            check_sources(&[a, b], &[(3, 4), (1, 5)]),
            Err(ModelError::SourceShapeMismatch {
                index:    1,
                seq_len:  1,
                features: 5,
                actual:   vec![2, 1, 4],
            })
        );
    }
}
