//! Named-parameter checkpoints.
//!
//! A checkpoint is a safetensors file mapping canonical parameter names to
//! f32 tensors. Loading is non-strict: a literal `module.` prefix left by
//! distributed-training wrappers is stripped from every key, unknown names
//! are ignored, and parameters absent from the file keep their initialized
//! values. A missing checkpoint file is a hard error.

use std::collections::HashMap;
use std::path::Path;

use burn::module::Param;
use burn::nn::conv::{Conv2d, ConvTranspose2d};
use burn::prelude::*;
use safetensors::tensor::TensorView;
use safetensors::{serialize, Dtype, SafeTensors};
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::flownet::{CascadeStage, FlowCascade};

/// Distributed-training wrappers prepend this to every parameter name.
const DISTRIBUTED_PREFIX: &str = "module.";

/// In-memory view of a checkpoint: name to (shape, row-major f32 data).
#[derive(Debug, Default)]
pub struct ParamStore {
    entries: HashMap<String, (Vec<usize>, Vec<f32>)>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) {
        self.entries.insert(name.into(), (shape, data));
    }

    pub fn take(&mut self, name: &str) -> Option<(Vec<usize>, Vec<f32>)> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Read a checkpoint file, stripping the distributed prefix from keys.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ModelError::missing_resource(format!("checkpoint {}", path.display()))
            } else {
                ModelError::checkpoint(format!("reading {}: {err}", path.display()))
            }
        })?;
        let tensors = SafeTensors::deserialize(&bytes)
            .map_err(|err| ModelError::checkpoint(format!("parsing {}: {err}", path.display())))?;

        let mut store = Self::new();
        for (name, view) in tensors.tensors() {
            if view.dtype() != Dtype::F32 {
                return Err(ModelError::checkpoint(format!(
                    "parameter {name} has dtype {:?}, expected F32",
                    view.dtype()
                )));
            }
            let data: Vec<f32> = view
                .data()
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            let key = name
                .strip_prefix(DISTRIBUTED_PREFIX)
                .unwrap_or(name.as_str())
                .to_string();
            store.insert(key, view.shape().to_vec(), data);
        }
        Ok(store)
    }

    /// Serialize every entry to a safetensors file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();

        let buffers: Vec<(String, Vec<usize>, Vec<u8>)> = names
            .into_iter()
            .map(|name| {
                let (shape, data) = &self.entries[name];
                let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
                (name.clone(), shape.clone(), bytes)
            })
            .collect();

        let mut views = Vec::with_capacity(buffers.len());
        for (name, shape, bytes) in &buffers {
            let view = TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map_err(|err| ModelError::checkpoint(format!("{name}: {err}")))?;
            views.push((name.clone(), view));
        }

        let payload = serialize(views, &None)
            .map_err(|err| ModelError::checkpoint(format!("serializing: {err}")))?;
        std::fs::write(path, payload)
            .map_err(|err| ModelError::checkpoint(format!("writing {}: {err}", path.display())))
    }
}

/// Write every cascade parameter under its canonical name.
pub fn save_cascade<B: Backend>(cascade: &FlowCascade<B>, path: &Path) -> Result<()> {
    let mut store = ParamStore::new();
    for (i, stage) in cascade.stages.iter().enumerate() {
        collect_stage(&mut store, &format!("stages.{i}"), stage)?;
    }
    store.write(path)
}

/// Install checkpoint parameters into the cascade (non-strict).
pub fn load_cascade<B: Backend>(
    cascade: &mut FlowCascade<B>,
    path: &Path,
    device: &B::Device,
) -> Result<()> {
    let mut store = ParamStore::read(path)?;
    apply_store(cascade, &mut store, device)?;
    if !store.is_empty() {
        debug!(
            ignored = store.len(),
            "checkpoint carried parameters with no counterpart in the cascade"
        );
    }
    Ok(())
}

/// Install parameters from an already-parsed store (non-strict).
pub fn apply_store<B: Backend>(
    cascade: &mut FlowCascade<B>,
    store: &mut ParamStore,
    device: &B::Device,
) -> Result<()> {
    for (i, stage) in cascade.stages.iter_mut().enumerate() {
        install_stage(store, &format!("stages.{i}"), stage, device)?;
    }
    Ok(())
}

fn collect_stage<B: Backend>(
    store: &mut ParamStore,
    prefix: &str,
    stage: &CascadeStage<B>,
) -> Result<()> {
    collect_conv(store, &format!("{prefix}.conv0"), &stage.conv0)?;
    collect_conv(store, &format!("{prefix}.conv1"), &stage.conv1)?;
    for (j, block) in stage.blocks.iter().enumerate() {
        collect_conv(store, &format!("{prefix}.blocks.{j}.conv"), &block.conv)?;
    }
    collect_conv_transpose(store, &format!("{prefix}.head"), &stage.head)
}

fn install_stage<B: Backend>(
    store: &mut ParamStore,
    prefix: &str,
    stage: &mut CascadeStage<B>,
    device: &B::Device,
) -> Result<()> {
    install_conv(store, &format!("{prefix}.conv0"), &mut stage.conv0, device)?;
    install_conv(store, &format!("{prefix}.conv1"), &mut stage.conv1, device)?;
    for (j, block) in stage.blocks.iter_mut().enumerate() {
        install_conv(
            store,
            &format!("{prefix}.blocks.{j}.conv"),
            &mut block.conv,
            device,
        )?;
    }
    install_conv_transpose(store, &format!("{prefix}.head"), &mut stage.head, device)
}

fn collect_conv<B: Backend>(store: &mut ParamStore, prefix: &str, conv: &Conv2d<B>) -> Result<()> {
    collect_param(store, &format!("{prefix}.weight"), &conv.weight)?;
    if let Some(bias) = &conv.bias {
        collect_param(store, &format!("{prefix}.bias"), bias)?;
    }
    Ok(())
}

fn collect_conv_transpose<B: Backend>(
    store: &mut ParamStore,
    prefix: &str,
    conv: &ConvTranspose2d<B>,
) -> Result<()> {
    collect_param(store, &format!("{prefix}.weight"), &conv.weight)?;
    if let Some(bias) = &conv.bias {
        collect_param(store, &format!("{prefix}.bias"), bias)?;
    }
    Ok(())
}

fn install_conv<B: Backend>(
    store: &mut ParamStore,
    prefix: &str,
    conv: &mut Conv2d<B>,
    device: &B::Device,
) -> Result<()> {
    if let Some(weight) = take_param(store, &format!("{prefix}.weight"), &conv.weight, device)? {
        conv.weight = Param::from_tensor(weight);
    }
    if let Some(bias_param) = &conv.bias {
        if let Some(bias) = take_param(store, &format!("{prefix}.bias"), bias_param, device)? {
            conv.bias = Some(Param::from_tensor(bias));
        }
    }
    Ok(())
}

fn install_conv_transpose<B: Backend>(
    store: &mut ParamStore,
    prefix: &str,
    conv: &mut ConvTranspose2d<B>,
    device: &B::Device,
) -> Result<()> {
    if let Some(weight) = take_param(store, &format!("{prefix}.weight"), &conv.weight, device)? {
        conv.weight = Param::from_tensor(weight);
    }
    if let Some(bias_param) = &conv.bias {
        if let Some(bias) = take_param(store, &format!("{prefix}.bias"), bias_param, device)? {
            conv.bias = Some(Param::from_tensor(bias));
        }
    }
    Ok(())
}

fn collect_param<B: Backend, const D: usize>(
    store: &mut ParamStore,
    name: &str,
    param: &Param<Tensor<B, D>>,
) -> Result<()> {
    let tensor = param.val();
    let shape = tensor.dims().to_vec();
    let data = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| ModelError::checkpoint(format!("{name}: {err:?}")))?;
    store.insert(name, shape, data);
    Ok(())
}

fn take_param<B: Backend, const D: usize>(
    store: &mut ParamStore,
    name: &str,
    current: &Param<Tensor<B, D>>,
    device: &B::Device,
) -> Result<Option<Tensor<B, D>>> {
    let Some((shape, data)) = store.take(name) else {
        return Ok(None);
    };
    let expected = current.val().dims().to_vec();
    if shape != expected {
        return Err(ModelError::ShapeMismatch {
            expected,
            actual: shape,
        });
    }
    Ok(Some(Tensor::from_data(
        burn::tensor::TensorData::new(data, shape),
        device,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flownet::FlowCascadeConfig;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.safetensors");

        let mut store = ParamStore::new();
        store.insert("a.weight", vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        store.insert("b.bias", vec![3], vec![0.5, -0.5, 0.0]);
        store.write(&path).unwrap();

        let mut restored = ParamStore::read(&path).unwrap();
        assert_eq!(restored.len(), 2);
        let (shape, data) = restored.take("a.weight").unwrap();
        assert_eq!(shape, vec![2, 2]);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_read_strips_distributed_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddp.safetensors");

        let mut store = ParamStore::new();
        store.insert("module.stages.0.conv0.weight", vec![1], vec![7.0]);
        store.write(&path).unwrap();

        let mut restored = ParamStore::read(&path).unwrap();
        assert!(restored.take("stages.0.conv0.weight").is_some());
    }

    #[test]
    fn test_missing_file_is_missing_resource() {
        let err = ParamStore::read(Path::new("/nonexistent/params.safetensors")).unwrap_err();
        assert!(matches!(err, ModelError::MissingResource(_)));
    }

    #[test]
    fn test_cascade_save_load_round_trip() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.safetensors");

        let cascade = FlowCascadeConfig::tiny().init::<TestBackend>(&device);
        save_cascade(&cascade, &path).unwrap();

        let mut other = FlowCascadeConfig::tiny().init::<TestBackend>(&device);
        load_cascade(&mut other, &path, &device).unwrap();

        let original = cascade.stages[0].conv0.weight.val();
        let loaded = other.stages[0].conv0.weight.val();
        let diff = (original - loaded).abs().max().into_scalar();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_load_tolerates_extra_keys() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.safetensors");

        let cascade = FlowCascadeConfig::tiny().init::<TestBackend>(&device);
        save_cascade(&cascade, &path).unwrap();

        // Append a parameter no cascade has ever heard of.
        let mut store = ParamStore::read(&path).unwrap();
        store.insert("auxiliary.discriminator.weight", vec![2], vec![1.0, 2.0]);
        store.write(&path).unwrap();

        let mut other = FlowCascadeConfig::tiny().init::<TestBackend>(&device);
        load_cascade(&mut other, &path, &device).unwrap();
    }

    #[test]
    fn test_load_rejects_shape_mismatch() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.safetensors");

        let mut store = ParamStore::new();
        store.insert("stages.0.conv0.weight", vec![1, 1, 1, 1], vec![1.0]);
        store.write(&path).unwrap();

        let mut cascade = FlowCascadeConfig::tiny().init::<TestBackend>(&device);
        let err = load_cascade(&mut cascade, &path, &device).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }
}
