use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Backend type of composite views (dashboards)
pub const DASHBOARD_TYPE: &str = "signalfx_dashboard";

/// Sentinel used as the group reference of a dashboard exported on its own
pub const PLACEHOLDER_GROUP: &str = "PLACEHOLDER";

/// Kinds of platform resources the exporter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Group,
    CompositeView,
    Widget,
    AlertRule,
    Objective,
}

impl ResourceKind {
    pub fn all() -> [ResourceKind; 5] {
        [
            ResourceKind::Group,
            ResourceKind::CompositeView,
            ResourceKind::Widget,
            ResourceKind::AlertRule,
            ResourceKind::Objective,
        ]
    }

    /// Path segment of the platform API (`/v2/<path>/<id>`)
    pub fn api_path(&self) -> &'static str {
        match self {
            ResourceKind::Group => "dashboardgroup",
            ResourceKind::CompositeView => "dashboard",
            ResourceKind::Widget => "chart",
            ResourceKind::AlertRule => "detector",
            ResourceKind::Objective => "slo",
        }
    }

    /// Backend resource type. Widgets depend on their subtype, see [`widget_backend_type`].
    pub fn backend_type(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Group => Some("signalfx_dashboard_group"),
            ResourceKind::CompositeView => Some(DASHBOARD_TYPE),
            ResourceKind::Widget => None,
            ResourceKind::AlertRule => Some("signalfx_detector"),
            ResourceKind::Objective => Some("signalfx_slo"),
        }
    }

    /// Human readable label used in prompts and messages
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Group => "dashboard group",
            ResourceKind::CompositeView => "dashboard",
            ResourceKind::Widget => "chart",
            ResourceKind::AlertRule => "detector",
            ResourceKind::Objective => "SLO",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dg" | "group" | "dashboard group" | "dashboardgroup" => Ok(ResourceKind::Group),
            "db" | "dashboard" => Ok(ResourceKind::CompositeView),
            "ch" | "chart" => Ok(ResourceKind::Widget),
            "dt" | "detector" => Ok(ResourceKind::AlertRule),
            "sl" | "slo" => Ok(ResourceKind::Objective),
            other => anyhow::bail!("Unknown resource kind: {}", other),
        }
    }
}

fn build_widget_type_map() -> HashMap<&'static str, &'static str> {
    let mut m = HashMap::new();
    m.insert("List", "signalfx_list_chart");
    m.insert("SingleValue", "signalfx_single_value_chart");
    m.insert("Text", "signalfx_text_chart");
    m.insert("TimeSeriesChart", "signalfx_time_chart");
    m.insert("Event", "signalfx_event_feed_chart");
    m.insert("TableChart", "signalfx_table_chart");
    m.insert("Heatmap", "signalfx_heatmap_chart");
    m
}

lazy_static! {
    static ref WIDGET_TYPE_MAP: HashMap<&'static str, &'static str> = build_widget_type_map();
}

/// Map a chart subtype (`options.type`) to its backend resource type
pub fn widget_backend_type(subtype: &str) -> Option<&'static str> {
    WIDGET_TYPE_MAP.get(subtype).copied()
}

/// Check whether a backend resource type is one of the chart types
pub fn is_widget_type(resource_type: &str) -> bool {
    WIDGET_TYPE_MAP.values().any(|t| *t == resource_type)
}

/// Index of a node inside a [`ResourceGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// How a dashboard refers to the group that owns it
#[derive(Debug, Clone, PartialEq)]
pub enum GroupLink {
    /// Symbolic reference such as `signalfx_dashboard_group.Ops.id`
    Symbolic(String),
    /// Dashboard exported without its group
    Placeholder,
}

/// One platform resource in the export graph
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub id: String,
    pub kind: ResourceKind,
    pub display_name: String,
    pub identifier: String,
    pub backend_type: String,
    pub generated_text: Option<String>,
    pub group_link: Option<GroupLink>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl ResourceNode {
    pub fn new(
        id: &str,
        kind: ResourceKind,
        display_name: &str,
        identifier: &str,
        backend_type: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            kind,
            display_name: display_name.to_string(),
            identifier: identifier.to_string(),
            backend_type: backend_type.to_string(),
            generated_text: None,
            group_link: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Backend address, e.g. `signalfx_dashboard.Overview`
    pub fn address(&self) -> String {
        format!("{}.{}", self.backend_type, self.identifier)
    }

    /// Symbolic id reference other resources can point at
    pub fn symbolic_id(&self) -> String {
        format!("{}.{}.id", self.backend_type, self.identifier)
    }
}

/// Arena of resource nodes. Parents own their children by id; the parent
/// back-reference is only a lookup key.
#[derive(Debug, Default)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    root: Option<NodeId>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, attaching it to `parent` when given
    pub fn insert(&mut self, mut node: ResourceNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        self.nodes.push(node);

        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None if self.root.is_none() => self.root = Some(id),
            None => {}
        }

        id
    }

    #[cfg(test)]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &ResourceNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut ResourceNode {
        &mut self.nodes[id.0]
    }

    /// Detach all children of a node. Detached nodes are no longer reachable
    /// from the root.
    pub fn clear_children(&mut self, id: NodeId) {
        self.nodes[id.0].children.clear();
    }

    /// Nodes reachable from the root, parents before their children,
    /// siblings in insertion order
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_type_lookup() {
        assert_eq!(widget_backend_type("TimeSeriesChart"), Some("signalfx_time_chart"));
        assert_eq!(widget_backend_type("Heatmap"), Some("signalfx_heatmap_chart"));
        assert_eq!(widget_backend_type("Event"), Some("signalfx_event_feed_chart"));
        assert_eq!(widget_backend_type("LogsChart"), None);
        assert!(is_widget_type("signalfx_list_chart"));
        assert!(!is_widget_type(DASHBOARD_TYPE));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("dg".parse::<ResourceKind>().unwrap(), ResourceKind::Group);
        assert_eq!("Dashboard".parse::<ResourceKind>().unwrap(), ResourceKind::CompositeView);
        assert_eq!("slo".parse::<ResourceKind>().unwrap(), ResourceKind::Objective);
        assert!("alarm".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_node_addresses() {
        let node = ResourceNode::new("G1", ResourceKind::Group, "Ops", "Ops", "signalfx_dashboard_group");
        assert_eq!(node.address(), "signalfx_dashboard_group.Ops");
        assert_eq!(node.symbolic_id(), "signalfx_dashboard_group.Ops.id");
    }

    #[test]
    fn test_graph_walk_order() {
        let mut graph = ResourceGraph::new();
        let group = graph.insert(
            ResourceNode::new("G", ResourceKind::Group, "G", "G", "signalfx_dashboard_group"),
            None,
        );
        let first = graph.insert(
            ResourceNode::new("D1", ResourceKind::CompositeView, "D1", "D1", DASHBOARD_TYPE),
            Some(group),
        );
        let chart = graph.insert(
            ResourceNode::new("C1", ResourceKind::Widget, "C1", "C1", "signalfx_time_chart"),
            Some(first),
        );
        let second = graph.insert(
            ResourceNode::new("D2", ResourceKind::CompositeView, "D2", "D2", DASHBOARD_TYPE),
            Some(group),
        );

        assert_eq!(graph.root(), Some(group));
        assert_eq!(graph.walk(), vec![group, first, chart, second]);
        assert_eq!(graph.get(chart).parent, Some(first));

        graph.clear_children(first);
        assert_eq!(graph.walk(), vec![group, first, second]);
    }
}
