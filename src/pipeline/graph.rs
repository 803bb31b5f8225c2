//! Pipeline graph structure using daggy.

use crate::element::{Pad, PadDirection, Stage};
use crate::error::{Error, Result};
use daggy::{Dag, EdgeIndex, NodeIndex, Walker};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// Unique identifier for a stage in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) NodeIndex);

impl NodeId {
    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0.index()
    }
}

/// Unique identifier for a link in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub(crate) EdgeIndex);

impl LinkId {
    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0.index()
    }
}

/// State of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineState {
    /// Stages are being added and linked.
    #[default]
    Building,
    /// Setup completed; the topology is frozen.
    Ready,
    /// The owning session was stopped.
    Stopped,
}

/// A node in the pipeline graph.
#[derive(Debug)]
pub struct Node {
    stage: Stage,
    /// Pads already carrying a link.
    linked: HashSet<(PadDirection, String)>,
}

impl Node {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            linked: HashSet::new(),
        }
    }

    /// Get the node's name.
    pub fn name(&self) -> &str {
        self.stage.name()
    }

    /// Get the stage wrapped by this node.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Check whether a pad already carries a link.
    pub fn is_linked(&self, pad: &Pad) -> bool {
        self.linked
            .contains(&(pad.direction(), pad.name().to_string()))
    }

    fn free_pads(&self, direction: PadDirection) -> impl Iterator<Item = &Pad> {
        self.stage
            .pads()
            .iter()
            .filter(move |p| p.direction() == direction && !self.is_linked(p))
    }

    fn mark_linked(&mut self, pad: &Pad) {
        self.linked.insert((pad.direction(), pad.name().to_string()));
    }
}

/// How a link was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Wired by hardware medium, formats never compared.
    Direct,
    /// Wired after checking that both pads declare the same format.
    Negotiated,
}

/// A link between two stages in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Name of the upstream output pad.
    pub src_pad: String,
    /// Name of the downstream input pad.
    pub sink_pad: String,
    /// How the link was made.
    pub kind: LinkKind,
}

impl Link {
    /// Create a link between two named pads.
    pub fn new(src_pad: impl Into<String>, sink_pad: impl Into<String>, kind: LinkKind) -> Self {
        Self {
            src_pad: src_pad.into(),
            sink_pad: sink_pad.into(),
            kind,
        }
    }

    /// Check if the link was made without format negotiation.
    pub fn is_direct(&self) -> bool {
        self.kind == LinkKind::Direct
    }
}

/// A link together with its endpoints.
#[derive(Debug, Clone)]
pub struct LinkInfo {
    /// Link identifier.
    pub id: LinkId,
    /// Upstream stage.
    pub upstream: NodeId,
    /// Downstream stage.
    pub downstream: NodeId,
    /// The link itself.
    pub link: Link,
}

/// The capture graph: stages connected by links, without cycles.
///
/// # Example
///
/// ```rust
/// use rocketcap::element::{HardwareMedium, Pad, Stage, StageCategory};
/// use rocketcap::pipeline::Pipeline;
///
/// let mut pipeline = Pipeline::new();
/// let a = pipeline.add_stage(
///     Stage::hardware("Crossbar", StageCategory::Crossbar)
///         .with_pad(Pad::output("Out").with_medium(HardwareMedium::standard(1))),
/// )?;
/// let b = pipeline.add_stage(
///     Stage::hardware("Device", StageCategory::Device)
///         .with_pad(Pad::input("In").with_medium(HardwareMedium::standard(1))),
/// )?;
///
/// pipeline.connect_direct(a, b)?;
/// assert_eq!(pipeline.direct_link_count(), 1);
/// # Ok::<(), rocketcap::Error>(())
/// ```
pub struct Pipeline {
    graph: Dag<Node, Link>,
    nodes_by_name: HashMap<String, NodeId>,
    state: PipelineState,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            graph: Dag::new(),
            nodes_by_name: HashMap::new(),
            state: PipelineState::Building,
        }
    }

    /// Get the current pipeline state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Set the pipeline state.
    pub fn set_state(&mut self, state: PipelineState) {
        self.state = state;
    }

    /// Add a stage under its own name.
    ///
    /// Names are unique within a pipeline.
    pub fn add_stage(&mut self, stage: Stage) -> Result<NodeId> {
        if self.nodes_by_name.contains_key(stage.name()) {
            return Err(Error::StageCreationFailed {
                name: stage.name().to_string(),
                reason: "a stage with this name is already in the pipeline".into(),
            });
        }
        let name = stage.name().to_string();
        let id = NodeId(self.graph.add_node(Node::new(stage)));
        self.nodes_by_name.insert(name, id);
        Ok(id)
    }

    /// Get a node by ID.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(id.0)
    }

    /// Get a stage by ID.
    pub fn get_stage(&self, id: NodeId) -> Option<&Stage> {
        self.get_node(id).map(Node::stage)
    }

    /// Get a stage ID by name.
    pub fn get_stage_id(&self, name: &str) -> Option<NodeId> {
        self.nodes_by_name.get(name).copied()
    }

    /// Link two stages by hardware medium.
    ///
    /// Free output pads of `upstream` are tried in order against free input
    /// pads of `downstream`; the first pair on the same medium is wired.
    /// Formats are ignored.
    pub fn connect_direct(&mut self, upstream: NodeId, downstream: NodeId) -> Result<LinkId> {
        let (up, down) = self.endpoints(upstream, downstream)?;

        if up.free_pads(PadDirection::Output).next().is_none() {
            return Err(Error::connection(up.name(), down.name(), "no free output pad"));
        }
        let (src, sink) = up
            .free_pads(PadDirection::Output)
            .find_map(|src| {
                down.free_pads(PadDirection::Input)
                    .find(|sink| src.medium_matches(sink))
                    .map(|sink| (src.clone(), sink.clone()))
            })
            .ok_or_else(|| {
                Error::connection(up.name(), down.name(), "no free pad pair on a common medium")
            })?;

        let id = self.add_link(upstream, &src, downstream, &sink, LinkKind::Direct)?;
        tracing::debug!(
            upstream = %self.name_of(upstream),
            downstream = %self.name_of(downstream),
            src_pad = %src.name(),
            sink_pad = %sink.name(),
            "connected directly"
        );
        Ok(id)
    }

    /// Link two named pads after checking their formats agree.
    pub fn link_pads(
        &mut self,
        upstream: NodeId,
        src_pad: &str,
        downstream: NodeId,
        sink_pad: &str,
    ) -> Result<LinkId> {
        let (up, down) = self.endpoints(upstream, downstream)?;

        let src = up
            .stage()
            .pads()
            .find(PadDirection::Output, Some(src_pad))
            .ok_or_else(|| {
                Error::connection(up.name(), down.name(), format!("no output pad '{src_pad}'"))
            })?;
        let sink = down
            .stage()
            .pads()
            .find(PadDirection::Input, Some(sink_pad))
            .ok_or_else(|| {
                Error::connection(up.name(), down.name(), format!("no input pad '{sink_pad}'"))
            })?;

        if up.is_linked(src) || down.is_linked(sink) {
            return Err(Error::connection(up.name(), down.name(), "pad already linked"));
        }
        match (src.format(), sink.format()) {
            (Some(a), Some(b)) if a.compatible(b) => {}
            (a, b) => {
                return Err(Error::connection(
                    up.name(),
                    down.name(),
                    format!("format mismatch: {a:?} cannot feed {b:?}"),
                ));
            }
        }

        let (src, sink) = (src.clone(), sink.clone());
        self.add_link(upstream, &src, downstream, &sink, LinkKind::Negotiated)
    }

    fn endpoints(&self, upstream: NodeId, downstream: NodeId) -> Result<(&Node, &Node)> {
        let up = self.get_node(upstream);
        let down = self.get_node(downstream);
        match (up, down) {
            (Some(up), Some(down)) => Ok((up, down)),
            _ => Err(Error::connection(
                up.map_or("<unknown>", Node::name),
                down.map_or("<unknown>", Node::name),
                "stage is not in the pipeline",
            )),
        }
    }

    fn add_link(
        &mut self,
        upstream: NodeId,
        src: &Pad,
        downstream: NodeId,
        sink: &Pad,
        kind: LinkKind,
    ) -> Result<LinkId> {
        let link = Link::new(src.name(), sink.name(), kind);
        // daggy rejects edges that would close a cycle
        let edge = self
            .graph
            .add_edge(upstream.0, downstream.0, link)
            .map_err(|_| {
                Error::connection(
                    self.name_of(upstream),
                    self.name_of(downstream),
                    "linking would create a cycle",
                )
            })?;

        if let Some(node) = self.graph.node_weight_mut(upstream.0) {
            node.mark_linked(src);
        }
        if let Some(node) = self.graph.node_weight_mut(downstream.0) {
            node.mark_linked(sink);
        }
        Ok(LinkId(edge))
    }

    fn name_of(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("<unknown>", Node::name)
    }

    /// Iterate over all stages in insertion order.
    pub fn stages(&self) -> impl Iterator<Item = (NodeId, &Stage)> {
        self.graph
            .graph()
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(|n| (NodeId(idx), n.stage())))
    }

    /// All links in creation order.
    pub fn links(&self) -> Vec<LinkInfo> {
        self.graph
            .raw_edges()
            .iter()
            .enumerate()
            .map(|(i, edge)| LinkInfo {
                id: LinkId(EdgeIndex::new(i)),
                upstream: NodeId(edge.source()),
                downstream: NodeId(edge.target()),
                link: edge.weight.clone(),
            })
            .collect()
    }

    /// Get a link by ID.
    pub fn get_link(&self, id: LinkId) -> Option<&Link> {
        self.graph.edge_weight(id.0)
    }

    /// Get the children (downstream stages) of a stage.
    pub fn children(&self, id: NodeId) -> Vec<(NodeId, &Link)> {
        self.graph
            .children(id.0)
            .iter(&self.graph)
            .filter_map(|(edge, node)| self.graph.edge_weight(edge).map(|l| (NodeId(node), l)))
            .collect()
    }

    /// Get the parents (upstream stages) of a stage.
    pub fn parents(&self, id: NodeId) -> Vec<(NodeId, &Link)> {
        self.graph
            .parents(id.0)
            .iter(&self.graph)
            .filter_map(|(edge, node)| self.graph.edge_weight(edge).map(|l| (NodeId(node), l)))
            .collect()
    }

    /// Get the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of links in the pipeline.
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Get the number of links made by hardware medium.
    pub fn direct_link_count(&self) -> usize {
        self.graph
            .raw_edges()
            .iter()
            .filter(|e| e.weight.is_direct())
            .count()
    }

    /// Check if the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Render the graph in Graphviz DOT format.
    ///
    /// Direct links are drawn bold, negotiated links dashed.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph capture {\n    rankdir=LR;\n");
        for (id, stage) in self.stages() {
            let _ = writeln!(
                out,
                "    n{} [label=\"{}\\n({})\"];",
                id.index(),
                stage.name().replace('"', "\\\""),
                stage.category()
            );
        }
        for info in self.links() {
            let style = match info.link.kind {
                LinkKind::Direct => "bold",
                LinkKind::Negotiated => "dashed",
            };
            let _ = writeln!(
                out,
                "    n{} -> n{} [label=\"{} -> {}\", style={style}];",
                info.upstream.index(),
                info.downstream.index(),
                info.link.src_pad,
                info.link.sink_pad
            );
        }
        out.push_str("}\n");
        out
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_count())
            .field("links", &self.link_count())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{HardwareMedium, StageCategory};
    use crate::format::{AudioCodec, AudioFormat, MediaFormat};

    fn hw(name: &str, input: Option<u64>, output: Option<u64>) -> Stage {
        let mut stage = Stage::hardware(name, StageCategory::Device);
        if let Some(token) = input {
            stage.add_pad(Pad::input("In").with_medium(HardwareMedium::standard(token)));
        }
        if let Some(token) = output {
            stage.add_pad(Pad::output("Out").with_medium(HardwareMedium::standard(token)));
        }
        stage
    }

    fn audio() -> AudioFormat {
        AudioFormat::new(48000, 16, 2, AudioCodec::Aac)
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.state(), PipelineState::Building);
    }

    #[test]
    fn test_add_stages() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_stage(hw("a", None, Some(1))).unwrap();
        let b = pipeline.add_stage(hw("b", Some(1), None)).unwrap();

        assert_eq!(pipeline.stage_count(), 2);
        assert_eq!(pipeline.get_stage_id("a"), Some(a));
        assert_eq!(pipeline.get_stage(b).unwrap().name(), "b");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.add_stage(hw("a", None, None)).unwrap();
        assert!(pipeline.add_stage(hw("a", None, None)).is_err());
        assert_eq!(pipeline.stage_count(), 1);
    }

    #[test]
    fn test_connect_direct_by_medium() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_stage(hw("a", None, Some(1))).unwrap();
        let b = pipeline.add_stage(hw("b", Some(1), Some(2))).unwrap();
        let c = pipeline.add_stage(hw("c", Some(2), None)).unwrap();

        pipeline.connect_direct(a, b).unwrap();
        let id = pipeline.connect_direct(b, c).unwrap();

        assert_eq!(pipeline.direct_link_count(), 2);
        assert_eq!(pipeline.get_link(id).unwrap().src_pad, "Out");
        assert_eq!(pipeline.children(a)[0].0, b);
        assert_eq!(pipeline.parents(c)[0].0, b);
    }

    #[test]
    fn test_connect_direct_medium_mismatch() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_stage(hw("a", None, Some(1))).unwrap();
        let b = pipeline.add_stage(hw("b", Some(9), None)).unwrap();

        let err = pipeline.connect_direct(a, b).unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed { ref upstream, .. } if upstream == "a"));
        assert_eq!(pipeline.link_count(), 0);
    }

    #[test]
    fn test_connect_direct_ignores_format() {
        let mut pipeline = Pipeline::new();
        let a = pipeline
            .add_stage(
                Stage::hardware("enc", StageCategory::Encoder)
                    .with_pad(Pad::output("TS").with_format(MediaFormat::MpegTs)),
            )
            .unwrap();
        let b = pipeline
            .add_stage(
                Stage::hardware("dec", StageCategory::Demultiplexer)
                    .with_pad(Pad::input("In").with_format(audio())),
            )
            .unwrap();

        assert!(pipeline.connect_direct(a, b).is_ok());
    }

    #[test]
    fn test_connect_direct_skips_unmatched_outputs() {
        let mut pipeline = Pipeline::new();
        let crossbar = Stage::hardware("crossbar", StageCategory::Crossbar)
            .with_pad(Pad::output("Audio Out").with_medium(HardwareMedium::standard(9)))
            .with_pad(Pad::output("Video Out").with_medium(HardwareMedium::standard(1)));
        let a = pipeline.add_stage(crossbar).unwrap();
        let b = pipeline.add_stage(hw("b", Some(1), None)).unwrap();

        let id = pipeline.connect_direct(a, b).unwrap();
        assert_eq!(pipeline.get_link(id).unwrap().src_pad, "Video Out");
    }

    #[test]
    fn test_pad_used_once() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_stage(hw("a", None, Some(1))).unwrap();
        let b = pipeline.add_stage(hw("b", Some(1), None)).unwrap();
        let c = pipeline.add_stage(hw("c", Some(1), None)).unwrap();

        pipeline.connect_direct(a, b).unwrap();
        assert!(pipeline.connect_direct(a, c).is_err());
    }

    #[test]
    fn test_link_pads_checks_format() {
        let mut pipeline = Pipeline::new();
        let src = pipeline
            .add_stage(
                Stage::hardware("src", StageCategory::Demultiplexer)
                    .with_pad(Pad::output("Audio").with_format(audio())),
            )
            .unwrap();
        let good = pipeline
            .add_stage(
                Stage::hardware("good", StageCategory::Sink)
                    .with_pad(Pad::input("In").with_format(audio())),
            )
            .unwrap();
        let bad = pipeline
            .add_stage(
                Stage::hardware("bad", StageCategory::Sink)
                    .with_pad(Pad::input("In").with_format(MediaFormat::MpegTs)),
            )
            .unwrap();

        assert!(pipeline.link_pads(src, "Audio", bad, "In").is_err());
        let id = pipeline.link_pads(src, "Audio", good, "In").unwrap();
        assert_eq!(pipeline.get_link(id).unwrap().kind, LinkKind::Negotiated);
        assert_eq!(pipeline.direct_link_count(), 0);
        assert!(pipeline.link_pads(src, "Audio", good, "In").is_err());
    }

    #[test]
    fn test_cycle_detection() {
        let mut pipeline = Pipeline::new();
        let mut a = hw("a", Some(1), Some(2));
        a.add_pad(Pad::input("In2").with_medium(HardwareMedium::standard(3)));
        let a = pipeline.add_stage(a).unwrap();
        let b = pipeline.add_stage(hw("b", Some(2), Some(3))).unwrap();

        pipeline.connect_direct(a, b).unwrap();
        // b's output medium matches a's second input, but a is upstream of b
        assert!(pipeline.connect_direct(b, a).is_err());
        assert_eq!(pipeline.link_count(), 1);
    }

    #[test]
    fn test_links_and_dot() {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_stage(hw("a", None, Some(1))).unwrap();
        let b = pipeline.add_stage(hw("b", Some(1), None)).unwrap();
        pipeline.connect_direct(a, b).unwrap();

        let links = pipeline.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].upstream, a);
        assert_eq!(links[0].downstream, b);

        let dot = pipeline.to_dot();
        assert!(dot.starts_with("digraph capture {"));
        assert!(dot.contains("n0 -> n1"));
        assert!(dot.contains("style=bold"));
    }
}
