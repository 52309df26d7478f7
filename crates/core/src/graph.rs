//! Typed job graph for the reconstruction tool.
//!
//! The tool consumes a JSON document of named stages whose inputs refer to
//! other stages with `{Stage.attribute}` placeholders. Here those references
//! are [`Handle`] values built from the [`Stage`] and [`Attribute`] enums, and
//! [`PipelineGraph::add_stage`] refuses any handle that does not resolve to a
//! stage added earlier. The wire format is unchanged.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::CoreError;

/// Intrinsic marker for every viewpoint; calibration is left to the tool.
pub const UNKNOWN_INTRINSIC: &str = "unknown";

// ---------------------------------------------------------------------------
// Stages and attributes
// ---------------------------------------------------------------------------

/// A node type understood by the reconstruction tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CameraInit,
    FeatureExtraction,
    ImageMatching,
    FeatureMatching,
    StructureFromMotion,
    PrepareDenseScene,
    DepthMap,
    DepthMapFilter,
    Meshing,
    MeshFiltering,
    Texturing,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 11] = [
        Stage::CameraInit,
        Stage::FeatureExtraction,
        Stage::ImageMatching,
        Stage::FeatureMatching,
        Stage::StructureFromMotion,
        Stage::PrepareDenseScene,
        Stage::DepthMap,
        Stage::DepthMapFilter,
        Stage::Meshing,
        Stage::MeshFiltering,
        Stage::Texturing,
    ];

    /// Node name as the tool expects it.
    pub fn name(self) -> &'static str {
        match self {
            Stage::CameraInit => "CameraInit",
            Stage::FeatureExtraction => "FeatureExtraction",
            Stage::ImageMatching => "ImageMatching",
            Stage::FeatureMatching => "FeatureMatching",
            Stage::StructureFromMotion => "StructureFromMotion",
            Stage::PrepareDenseScene => "PrepareDenseScene",
            Stage::DepthMap => "DepthMap",
            Stage::DepthMapFilter => "DepthMapFilter",
            Stage::Meshing => "Meshing",
            Stage::MeshFiltering => "MeshFiltering",
            Stage::Texturing => "Texturing",
        }
    }

    /// Outputs beyond the `output` every stage produces.
    fn extra_outputs(self) -> &'static [Attribute] {
        match self {
            Stage::MeshFiltering => &[Attribute::OutputMesh],
            _ => &[],
        }
    }

    /// Build a handle to one of this stage's attributes.
    pub fn attr(self, attribute: Attribute) -> Handle {
        Handle {
            stage: self,
            attribute,
        }
    }

    pub fn output(self) -> Handle {
        self.attr(Attribute::Output)
    }

    pub fn input(self) -> Handle {
        self.attr(Attribute::Input)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage attribute that another stage may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Input,
    Output,
    OutputMesh,
    DepthMapsFolder,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Input => "input",
            Attribute::Output => "output",
            Attribute::OutputMesh => "outputMesh",
            Attribute::DepthMapsFolder => "depthMapsFolder",
        }
    }
}

/// A reference to `stage.attribute`, rendered as `{Stage.attribute}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub stage: Stage,
    pub attribute: Attribute,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}.{}}}", self.stage.name(), self.attribute.name())
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// One photo entry of the CameraInit stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewpoint {
    pub path: String,
    pub intrinsic: &'static str,
}

impl Viewpoint {
    pub fn unknown_intrinsic(path: &Path) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            intrinsic: UNKNOWN_INTRINSIC,
        }
    }
}

/// Value bound to a stage input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InputValue {
    Ref(Handle),
    Viewpoints(Vec<Viewpoint>),
}

impl From<Handle> for InputValue {
    fn from(handle: Handle) -> Self {
        InputValue::Ref(handle)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub stage: Stage,
    pub inputs: Vec<(&'static str, InputValue)>,
}

impl Node {
    fn declares_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|(key, _)| *key == name)
    }

    /// Whether `attribute` can be referenced on this node.
    fn exposes(&self, attribute: Attribute) -> bool {
        matches!(attribute, Attribute::Input | Attribute::Output)
            || self.stage.extra_outputs().contains(&attribute)
            || self.declares_input(attribute.name())
    }

    pub fn references(&self) -> impl Iterator<Item = Handle> + '_ {
        self.inputs.iter().filter_map(|(_, value)| match value {
            InputValue::Ref(handle) => Some(*handle),
            InputValue::Viewpoints(_) => None,
        })
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Inputs<'a>(&'a [(&'static str, InputValue)]);

        impl Serialize for Inputs<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (key, value) in self.0 {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("inputs", &Inputs(&self.inputs))?;
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("stage {0} is defined more than once")]
    DuplicateStage(Stage),

    #[error("stage {stage} references {reference}, which is not defined before it")]
    UnresolvedReference { stage: Stage, reference: Handle },
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// An ordered set of stages where every reference points backwards.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    nodes: Vec<Node>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage. Each referenced handle must resolve against the
    /// stages already in the graph, which rules out forward and cyclic edges.
    pub fn add_stage(
        &mut self,
        stage: Stage,
        inputs: Vec<(&'static str, InputValue)>,
    ) -> Result<&mut Self, GraphError> {
        if self.position(stage).is_some() {
            return Err(GraphError::DuplicateStage(stage));
        }

        let node = Node { stage, inputs };
        if let Some(reference) = node
            .references()
            .find(|handle| !self.resolves(*handle, self.nodes.len()))
        {
            return Err(GraphError::UnresolvedReference { stage, reference });
        }

        self.nodes.push(node);
        Ok(self)
    }

    /// The fixed photogrammetry pipeline for `photo_paths`, in upload order.
    pub fn photogrammetry(photo_paths: &[PathBuf]) -> Result<Self, GraphError> {
        use Attribute::{DepthMapsFolder, OutputMesh};
        use Stage::*;

        let viewpoints = photo_paths
            .iter()
            .map(|p| Viewpoint::unknown_intrinsic(p))
            .collect();

        let mut graph = Self::new();
        graph
            .add_stage(
                CameraInit,
                vec![("viewpoints", InputValue::Viewpoints(viewpoints))],
            )?
            .add_stage(FeatureExtraction, vec![("input", CameraInit.output().into())])?
            .add_stage(
                ImageMatching,
                vec![
                    ("input", FeatureExtraction.input().into()),
                    ("features", FeatureExtraction.output().into()),
                ],
            )?
            .add_stage(
                FeatureMatching,
                vec![
                    ("input", ImageMatching.input().into()),
                    ("features", FeatureExtraction.output().into()),
                    ("matches", ImageMatching.output().into()),
                ],
            )?
            .add_stage(
                StructureFromMotion,
                vec![
                    ("input", FeatureMatching.input().into()),
                    ("features", FeatureExtraction.output().into()),
                    ("matches", FeatureMatching.output().into()),
                ],
            )?
            .add_stage(
                PrepareDenseScene,
                vec![("input", StructureFromMotion.output().into())],
            )?
            .add_stage(
                DepthMap,
                vec![
                    ("input", PrepareDenseScene.input().into()),
                    ("imagesFolder", PrepareDenseScene.output().into()),
                ],
            )?
            .add_stage(
                DepthMapFilter,
                vec![
                    ("input", DepthMap.input().into()),
                    ("depthMapsFolder", DepthMap.output().into()),
                ],
            )?
            .add_stage(
                Meshing,
                vec![
                    ("input", DepthMapFilter.input().into()),
                    ("depthMapsFolder", DepthMapFilter.attr(DepthMapsFolder).into()),
                    ("depthMapsFilterFolder", DepthMapFilter.output().into()),
                ],
            )?
            .add_stage(MeshFiltering, vec![("inputMesh", Meshing.output().into())])?
            .add_stage(
                Texturing,
                vec![
                    ("input", MeshFiltering.input().into()),
                    ("inputMesh", MeshFiltering.attr(OutputMesh).into()),
                ],
            )?;

        Ok(graph)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.nodes.iter().map(|n| n.stage)
    }

    /// Viewpoints of the CameraInit stage, if present.
    pub fn viewpoints(&self) -> Option<&[Viewpoint]> {
        self.nodes
            .iter()
            .filter(|n| n.stage == Stage::CameraInit)
            .flat_map(|n| n.inputs.iter())
            .find_map(|(_, value)| match value {
                InputValue::Viewpoints(v) => Some(v.as_slice()),
                InputValue::Ref(_) => None,
            })
    }

    /// Check that node order is a topological order: every reference
    /// resolves to a node strictly earlier in the graph.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (index, node) in self.nodes.iter().enumerate() {
            if self.nodes[..index].iter().any(|n| n.stage == node.stage) {
                return Err(GraphError::DuplicateStage(node.stage));
            }
            if let Some(reference) = node.references().find(|h| !self.resolves(*h, index)) {
                return Err(GraphError::UnresolvedReference {
                    stage: node.stage,
                    reference,
                });
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Internal(format!("failed to serialize pipeline graph: {e}")))
    }

    /// Serialize the graph and write it to `path`.
    pub async fn write_to(&self, path: &Path) -> Result<(), CoreError> {
        let json = self.to_json_pretty()?;
        tokio::fs::write(path, json).await.map_err(|e| {
            CoreError::filesystem(format!("failed to write {}", path.display()), e)
        })
    }

    fn position(&self, stage: Stage) -> Option<usize> {
        self.nodes.iter().position(|n| n.stage == stage)
    }

    /// Whether `handle` resolves among the first `before` nodes.
    fn resolves(&self, handle: Handle, before: usize) -> bool {
        self.nodes[..before]
            .iter()
            .find(|n| n.stage == handle.stage)
            .is_some_and(|n| n.exposes(handle.attribute))
    }
}

impl Serialize for PipelineGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Stages<'a>(&'a [Node]);

        impl Serialize for Stages<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for node in self.0 {
                    map.serialize_entry(node.stage.name(), node)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("graph", &Stages(&self.nodes))?;
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
