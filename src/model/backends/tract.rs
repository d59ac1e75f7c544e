#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tract_onnx::prelude::*;

use crate::frame::Tensor as FrameTensor;
use crate::model::backend::{FlowBackend, InputArity};
use crate::model::FlowField;
use crate::preprocess;

/// Tract-based backend for ONNX flow inference.
///
/// Loads a local model artifact and performs inference on preprocessed frame
/// pairs. The model's declared input count decides the arity branch once, at
/// load time: two named `(1,3,H,W)` inputs, or one stacked `(1,6,H,W)` input.
/// The output is accepted as `(1,2,H,W)` or `(2,H,W)` representing (dx, dy).
pub struct TractFlowBackend {
    model: TypedSimplePlan<TypedModel>,
    arity: InputArity,
    width: u32,
    height: u32,
}

impl TractFlowBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let mut inference = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?;

        let arity = match inference.inputs.len() {
            1 => InputArity::Stacked,
            2 => InputArity::Paired,
            n => bail!("flow model declares {} inputs; expected 1 or 2", n),
        };

        let height_us = height as usize;
        let width_us = width as usize;
        match arity {
            InputArity::Stacked => {
                inference = inference
                    .with_input_fact(
                        0,
                        InferenceFact::dt_shape(
                            f32::datum_type(),
                            tvec!(1, 6, height_us, width_us),
                        ),
                    )
                    .context("failed to set stacked input fact")?;
            }
            InputArity::Paired => {
                inference = inference
                    .with_input_fact(
                        0,
                        InferenceFact::dt_shape(
                            f32::datum_type(),
                            tvec!(1, 3, height_us, width_us),
                        ),
                    )
                    .context("failed to set previous-frame input fact")?
                    .with_input_fact(
                        1,
                        InferenceFact::dt_shape(
                            f32::datum_type(),
                            tvec!(1, 3, height_us, width_us),
                        ),
                    )
                    .context("failed to set current-frame input fact")?;
            }
        }

        let model = inference
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "tract flow model loaded from {} ({:?} input, {}x{})",
            model_path.display(),
            arity,
            width,
            height
        );

        Ok(Self {
            model,
            arity,
            width,
            height,
        })
    }

    fn build_input(&self, tensor: &FrameTensor) -> Result<Tensor> {
        let (channels, height, width) = tensor.shape();
        if width != self.width as usize || height != self.height as usize {
            bail!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            );
        }
        let input = tract_ndarray::Array4::from_shape_vec(
            (1, channels, height, width),
            tensor.data().to_vec(),
        )
        .context("tensor buffer did not match its declared shape")?;
        Ok(input.into_tensor())
    }

    fn extract_flow(&self, outputs: TVec<TValue>) -> Result<FlowField> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("flow output tensor was not f32")?;

        let (height, width) = match view.shape() {
            [1, 2, h, w] => (*h, *w),
            [2, h, w] => (*h, *w),
            other => bail!("unexpected flow output shape {:?}", other),
        };

        let flat = view
            .as_slice()
            .ok_or_else(|| anyhow!("flow output tensor was not contiguous"))?;
        let plane = height * width;
        let dx = flat[..plane].to_vec();
        let dy = flat[plane..2 * plane].to_vec();
        Ok(FlowField::new(width, height, dx, dy))
    }
}

impl FlowBackend for TractFlowBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_arity(&self) -> InputArity {
        self.arity
    }

    fn infer(&mut self, prev: &FrameTensor, curr: &FrameTensor) -> Result<FlowField> {
        let outputs = match self.arity {
            InputArity::Stacked => {
                let stacked = preprocess::stack_pair(prev, curr);
                self.model
                    .run(tvec!(self.build_input(&stacked)?.into()))
                    .context("ONNX flow inference failed")?
            }
            InputArity::Paired => self
                .model
                .run(tvec!(
                    self.build_input(prev)?.into(),
                    self.build_input(curr)?.into()
                ))
                .context("ONNX flow inference failed")?,
        };
        self.extract_flow(outputs)
    }
}
