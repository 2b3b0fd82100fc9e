// ============================================================
// Layer 5 — ONNX Exporter
// ============================================================
// Writes the restored best model as a standalone ONNX graph
// (opset 13) that any ONNX runtime can execute:
//
//   input  "input"  : float [batch, 4, bars]   batch is symbolic
//   output "logits" : float [batch, num_classes]
//
// Graph, per inception block b:
//
//   x ─┬─ Conv k=9  ─┐
//      ├─ Conv k=19 ─┼─ Concat(axis 1) ─ BatchNormalization ─ Relu
//      └─ Conv k=39 ─┘
//
// then GlobalAveragePool ─ Flatten(axis 1) ─ Gemm ─ logits.
//
// Batch normalisation uses the running statistics and dropout
// is omitted, matching ModelMode::Inference exactly.
//
// Weights are stored as raw little-endian f32 initializers named
// after the parameter they came from (block0.branch1.weight, ...).
//
// Reference: onnx/onnx docs/IR.md and onnx.proto, prost docs

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::prelude::*;
use prost::Message;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::CHANNELS;
use crate::ml::model::{InceptionBlock, InceptionTime, ModelMode};
use crate::ml::onnx_proto::{
    AttributeProto, Dimension, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
    TensorProto, ValueInfoProto, IR_VERSION, OPSET_VERSION,
};

pub const INPUT_NAME: &str = "input";
pub const OUTPUT_NAME: &str = "logits";
const BATCH_DIM: &str = "batch";

/// Exports models trained on series of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct OnnxExporter {
    bars: usize,
}

impl OnnxExporter {
    pub fn new(bars: usize) -> Self {
        Self { bars }
    }

    /// Build the graph and write it to `path`.
    pub fn export<B: Backend>(&self, model: &InceptionTime<B>, path: &Path) -> PipelineResult<PathBuf> {
        let proto = self.build(model)?;
        fs::write(path, proto.encode_to_vec()).map_err(|e| {
            PipelineError::Export(format!("cannot write '{}': {e}", path.display()))
        })?;
        tracing::info!(
            "Exported ONNX model ({} nodes) to '{}'",
            proto.graph.as_ref().map_or(0, |g| g.node.len()),
            path.display()
        );
        Ok(path.to_path_buf())
    }

    pub fn build<B: Backend>(&self, model: &InceptionTime<B>) -> PipelineResult<ModelProto> {
        self.check_shapes(model)?;

        let mut graph = GraphBuilder::default();
        let mut x = INPUT_NAME.to_string();
        for (b, block) in model.blocks.iter().enumerate() {
            x = graph.inception_block(b, block, x)?;
        }

        let pooled = graph.node("GlobalAveragePool", "pool".into(), vec![x], vec![]);
        let flat = graph.node(
            "Flatten",
            "flatten".into(),
            vec![pooled],
            vec![AttributeProto::int("axis", 1)],
        );
        graph.head(model, flat)?;

        let GraphBuilder { nodes, initializers } = graph;
        let batch = || Dimension::symbolic(BATCH_DIM);

        Ok(ModelProto {
            ir_version: IR_VERSION,
            opset_import: vec![OperatorSetIdProto {
                domain:  String::new(),
                version: OPSET_VERSION,
            }],
            producer_name: env!("CARGO_PKG_NAME").to_string(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            doc_string: format!(
                "InceptionTime classifier: [batch, {CHANNELS}, {}] -> [batch, {}]",
                self.bars, model.num_classes
            ),
            graph: Some(GraphProto {
                node: nodes,
                name: "inceptiontime".to_string(),
                initializer: initializers,
                input: vec![ValueInfoProto::float_tensor(
                    INPUT_NAME,
                    vec![batch(), Dimension::fixed(CHANNELS), Dimension::fixed(self.bars)],
                )],
                output: vec![ValueInfoProto::float_tensor(
                    OUTPUT_NAME,
                    vec![batch(), Dimension::fixed(model.num_classes)],
                )],
            }),
        })
    }

    /// A [1, 4, bars] input must come out as [1, num_classes].
    fn check_shapes<B: Backend>(&self, model: &InceptionTime<B>) -> PipelineResult<()> {
        if self.bars == 0 {
            return Err(PipelineError::Export("series length must be positive".into()));
        }
        if model.in_channels != CHANNELS {
            return Err(PipelineError::Export(format!(
                "model expects {} input channels, exported graph takes {CHANNELS}",
                model.in_channels
            )));
        }

        let device = model.head.weight.val().device();
        let input  = Tensor::<B, 3>::zeros([1, CHANNELS, self.bars], &device);
        let dims   = model.forward(input, ModelMode::Inference).dims();
        if dims != [1, model.num_classes] {
            return Err(PipelineError::Export(format!(
                "a single-sample forward pass has shape {dims:?}, expected [1, {}]",
                model.num_classes
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct GraphBuilder {
    nodes:        Vec<NodeProto>,
    initializers: Vec<TensorProto>,
}

impl GraphBuilder {
    /// Store `tensor` as an initializer and return its name.
    fn constant<B: Backend, const D: usize>(
        &mut self,
        name:   String,
        tensor: Tensor<B, D>,
    ) -> PipelineResult<String> {
        let dims = tensor.dims();
        let values: Vec<f32> = tensor
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| PipelineError::Export(format!("{name}: {e:?}")))?;
        self.initializers.push(TensorProto::float(name.clone(), &dims, &values));
        Ok(name)
    }

    /// Append a node whose single output shares its name.
    fn node(
        &mut self,
        op_type:   &str,
        name:      String,
        inputs:    Vec<String>,
        attribute: Vec<AttributeProto>,
    ) -> String {
        self.push(op_type, name.clone(), inputs, name, attribute)
    }

    fn push(
        &mut self,
        op_type:   &str,
        name:      String,
        input:     Vec<String>,
        output:    String,
        attribute: Vec<AttributeProto>,
    ) -> String {
        self.nodes.push(NodeProto {
            input,
            output: vec![output.clone()],
            name,
            op_type: op_type.to_string(),
            attribute,
        });
        output
    }

    fn inception_block<B: Backend>(
        &mut self,
        b:     usize,
        block: &InceptionBlock<B>,
        input: String,
    ) -> PipelineResult<String> {
        let mut branch_outputs = Vec::with_capacity(block.branches.len());

        for (i, conv) in block.branches.iter().enumerate() {
            let prefix = format!("block{b}.branch{i}");
            let weight = conv.weight.val();
            let [_, _, kernel] = weight.dims();
            if kernel % 2 == 0 {
                return Err(PipelineError::Export(format!(
                    "{prefix}: even kernel {kernel} has no symmetric same padding"
                )));
            }

            let mut inputs = vec![input.clone(), self.constant(format!("{prefix}.weight"), weight)?];
            if let Some(bias) = &conv.bias {
                inputs.push(self.constant(format!("{prefix}.bias"), bias.val())?);
            }

            let half = (kernel / 2) as i64;
            branch_outputs.push(self.node(
                "Conv",
                prefix,
                inputs,
                vec![
                    AttributeProto::ints("kernel_shape", &[kernel as i64]),
                    AttributeProto::ints("pads", &[half, half]),
                    AttributeProto::ints("strides", &[1]),
                    AttributeProto::ints("dilations", &[1]),
                    AttributeProto::int("group", 1),
                ],
            ));
        }

        let concat = self.node(
            "Concat",
            format!("block{b}.concat"),
            branch_outputs,
            vec![AttributeProto::int("axis", 1)],
        );

        let norm = &block.norm;
        let inputs = vec![
            concat,
            self.constant(format!("block{b}.norm.gamma"), norm.gamma.val())?,
            self.constant(format!("block{b}.norm.beta"), norm.beta.val())?,
            self.constant(format!("block{b}.norm.running_mean"), norm.running_mean.value())?,
            self.constant(format!("block{b}.norm.running_var"), norm.running_var.value())?,
        ];
        let normed = self.node(
            "BatchNormalization",
            format!("block{b}.norm"),
            inputs,
            vec![AttributeProto::float("epsilon", norm.epsilon as f32)],
        );

        Ok(self.node("Relu", format!("block{b}.relu"), vec![normed], vec![]))
    }

    fn head<B: Backend>(&mut self, model: &InceptionTime<B>, input: String) -> PipelineResult<()> {
        let weight = model.head.weight.val();
        let [rows, cols] = weight.dims();

        // Burn stores Linear weights as [in, out]; accept [out, in] too.
        let trans_b = if cols == model.num_classes {
            0
        } else if rows == model.num_classes {
            1
        } else {
            return Err(PipelineError::Export(format!(
                "head weight {rows}x{cols} does not produce {} classes",
                model.num_classes
            )));
        };

        let mut inputs = vec![input, self.constant("head.weight".into(), weight)?];
        if let Some(bias) = &model.head.bias {
            inputs.push(self.constant("head.bias".into(), bias.val())?);
        }

        self.push(
            "Gemm",
            "head".into(),
            inputs,
            OUTPUT_NAME.to_string(),
            vec![
                AttributeProto::float("alpha", 1.0),
                AttributeProto::float("beta", 1.0),
                AttributeProto::int("transA", 0),
                AttributeProto::int("transB", trans_b),
            ],
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ml::model::backend_rng_lock;
    use crate::ml::model::InceptionTimeConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// Run an exported file with tract and return the flattened logits.
    pub(crate) fn run_onnx(path: &Path, input: Vec<f32>, shape: [usize; 3]) -> Vec<f32> {
        use tract_onnx::prelude::*;

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .unwrap()
            .with_input_fact(0, f32::fact(shape).into())
            .unwrap()
            .into_optimized()
            .unwrap()
            .into_runnable()
            .unwrap();

        let array = tract_ndarray::Array3::from_shape_vec((shape[0], shape[1], shape[2]), input).unwrap();
        let outputs = plan.run(tvec!(Tensor::from(array).into())).unwrap();
        outputs[0].to_array_view::<f32>().unwrap().iter().copied().collect()
    }

    fn small_model(num_classes: usize) -> InceptionTime<TestBackend> {
        InceptionTimeConfig::new(num_classes)
            .with_filters(4)
            .with_depth(2)
            .init(&Default::default())
    }

    fn graph(model: &InceptionTime<TestBackend>, bars: usize) -> GraphProto {
        OnnxExporter::new(bars).build(model).unwrap().graph.unwrap()
    }

    #[test]
    fn test_graph_layout() {
        let _rng = backend_rng_lock();
        let g = graph(&small_model(3), 20);
        let ops: Vec<&str> = g.node.iter().map(|n| n.op_type.as_str()).collect();

        let block = ["Conv", "Conv", "Conv", "Concat", "BatchNormalization", "Relu"];
        let mut expected: Vec<&str> = block.iter().chain(block.iter()).copied().collect();
        expected.extend(["GlobalAveragePool", "Flatten", "Gemm"]);
        assert_eq!(ops, expected);

        assert_eq!(g.node.last().unwrap().output, vec![OUTPUT_NAME.to_string()]);
        assert_eq!(g.input[0].name, INPUT_NAME);
        assert_eq!(g.output[0].name, OUTPUT_NAME);
    }

    #[test]
    fn test_io_shapes_have_symbolic_batch() {
        let _rng = backend_rng_lock();
        let g = graph(&small_model(5), 30);
        let dims = |v: &ValueInfoProto| -> Vec<Dimension> {
            v.r#type.clone().unwrap().tensor_type.unwrap().shape.unwrap().dim
        };

        let input = dims(&g.input[0]);
        assert_eq!(input[0], Dimension::symbolic("batch"));
        assert_eq!(input[1], Dimension::fixed(4));
        assert_eq!(input[2], Dimension::fixed(30));

        let output = dims(&g.output[0]);
        assert_eq!(output[0], Dimension::symbolic("batch"));
        assert_eq!(output[1], Dimension::fixed(5));
    }

    #[test]
    fn test_initializers_match_parameters() {
        let _rng = backend_rng_lock();
        let model = small_model(2);
        let g = graph(&model, 12);
        let find = |name: &str| g.initializer.iter().find(|t| t.name == name).unwrap().clone();

        let w = find("block0.branch2.weight");
        assert_eq!(w.dims, vec![4, 4, 39]);
        let expected: Vec<f32> = model.blocks[0].branches[2].weight.val().into_data().to_vec().unwrap();
        assert_eq!(w.float_values(), expected);

        assert_eq!(find("block1.norm.running_var").dims, vec![12]);
        assert_eq!(find("head.weight").dims, vec![12, 2]);
    }

    #[test]
    fn test_conv_padding_keeps_length() {
        let _rng = backend_rng_lock();
        let g = graph(&small_model(2), 12);
        let conv = g.node.iter().find(|n| n.name == "block0.branch1").unwrap();
        let pads = conv.attribute.iter().find(|a| a.name == "pads").unwrap();
        assert_eq!(pads.ints, vec![9, 9]);
    }

    #[test]
    fn test_rejects_zero_bars() {
        let _rng = backend_rng_lock();
        let err = OnnxExporter::new(0).build(&small_model(2)).unwrap_err();
        assert!(matches!(err, PipelineError::Export(_)));
    }

    #[test]
    fn test_rejects_wrong_channel_count() {
        let _rng = backend_rng_lock();
        let model: InceptionTime<TestBackend> = InceptionTimeConfig::new(2)
            .with_in_channels(3)
            .with_filters(4)
            .with_depth(1)
            .init(&Default::default());
        let err = OnnxExporter::new(10).build(&model).unwrap_err();
        assert!(matches!(err, PipelineError::Export(_)));
    }

    #[test]
    fn test_encoded_file_decodes() {
        let _rng = backend_rng_lock();
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.onnx");
        let model = small_model(3);
        OnnxExporter::new(16).export(&model, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        let decoded = ModelProto::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.ir_version, IR_VERSION);
        assert_eq!(decoded.opset_import[0].version, OPSET_VERSION);
        assert_eq!(decoded, OnnxExporter::new(16).build(&model).unwrap());
    }

    #[test]
    fn test_runtime_matches_inference_logits() {
        let _rng = backend_rng_lock();
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("m.onnx");
        let model = small_model(3);
        OnnxExporter::new(20).export(&model, &path).unwrap();

        for batch in [1usize, 3] {
            let input: Vec<f32> = (0..batch * 4 * 20).map(|i| ((i * 7 % 23) as f32 - 11.0) / 5.0).collect();
            let x = Tensor::<TestBackend, 3>::from_data(
                TensorData::new(input.clone(), [batch, 4, 20]),
                &Default::default(),
            );
            let expected: Vec<f32> = model.forward(x, ModelMode::Inference).into_data().to_vec().unwrap();
            let actual = run_onnx(&path, input, [batch, 4, 20]);

            assert_eq!(actual.len(), batch * 3);
            for (a, e) in actual.iter().zip(&expected) {
                assert!((a - e).abs() < 1e-4, "onnx {a} vs burn {e}");
            }
        }
    }
}
