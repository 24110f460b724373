//! Static geographic hierarchies.
//!
//! Two trees exist:
//!
//! - the province tree (`BE` → region → province) used by the cases and
//!   hospital feeds
//! - the region tree (`BE` → region) used by the deaths feed
//!
//! Brussels is a leaf in both. Each tree also carries an `UNK` leaf directly
//! under the root that collects records with missing or unrecognised
//! geography.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Code of the country root.
pub const ROOT: &str = "BE";

/// Code of the bucket that collects records with no usable geography.
pub const UNASSIGNED: &str = "UNK";

/// One node of a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoNode {
    pub code: &'static str,
    pub display_name: &'static str,
    pub parent: Option<&'static str>,
    /// Spellings used by the upstream feeds for this node.
    pub labels: &'static [&'static str],
}

const fn node(
    code: &'static str,
    display_name: &'static str,
    parent: Option<&'static str>,
    labels: &'static [&'static str],
) -> GeoNode {
    GeoNode {
        code,
        display_name,
        parent,
        labels,
    }
}

const PROVINCE_NODES: &[GeoNode] = &[
    node(ROOT, "Belgium", None, &[]),
    node("FL", "Flanders", Some(ROOT), &[]),
    node("WA", "Wallonia", Some(ROOT), &[]),
    node("BR", "Brussels", Some(ROOT), &["Brussels", "Bruxelles", "Brussel"]),
    node("AN", "Antwerp", Some("FL"), &["Antwerpen"]),
    node("LI", "Limburg", Some("FL"), &["Limburg"]),
    node("OV", "East Flanders", Some("FL"), &["OostVlaanderen"]),
    node("VB", "Flemish Brabant", Some("FL"), &["VlaamsBrabant"]),
    node("WV", "West Flanders", Some("FL"), &["WestVlaanderen"]),
    node("BW", "Walloon Brabant", Some("WA"), &["BrabantWallon"]),
    node("HT", "Hainaut", Some("WA"), &["Hainaut"]),
    node("LG", "Liège", Some("WA"), &["Liège", "Liege"]),
    node("LX", "Luxembourg", Some("WA"), &["Luxembourg"]),
    node("NA", "Namur", Some("WA"), &["Namur"]),
    node(UNASSIGNED, "Unknown", Some(ROOT), &[]),
];

const REGION_NODES: &[GeoNode] = &[
    node(ROOT, "Belgium", None, &[]),
    node("FL", "Flanders", Some(ROOT), &["Flanders", "Vlaanderen"]),
    node("WA", "Wallonia", Some(ROOT), &["Wallonia", "Wallonie"]),
    node("BR", "Brussels", Some(ROOT), &["Brussels", "Bruxelles", "Brussel"]),
    node(UNASSIGNED, "Unknown", Some(ROOT), &[]),
];

static PROVINCES: LazyLock<Hierarchy> = LazyLock::new(|| Hierarchy::build("province", PROVINCE_NODES));
static REGIONS: LazyLock<Hierarchy> = LazyLock::new(|| Hierarchy::build("region", REGION_NODES));

/// Which static tree a metric is rolled up over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyKind {
    Province,
    Region,
}

impl HierarchyKind {
    pub fn hierarchy(self) -> &'static Hierarchy {
        match self {
            HierarchyKind::Province => &PROVINCES,
            HierarchyKind::Region => &REGIONS,
        }
    }
}

/// An immutable tree of [`GeoNode`]s with precomputed lookups.
#[derive(Debug)]
pub struct Hierarchy {
    name: &'static str,
    nodes: Vec<GeoNode>,
    index: HashMap<&'static str, usize>,
    children: Vec<Vec<usize>>,
    /// Children always precede their parent.
    bottom_up: Vec<usize>,
    /// Feed label or leaf code → leaf index.
    leaf_lookup: HashMap<&'static str, usize>,
}

impl Hierarchy {
    /// Build a hierarchy from a static node table.
    ///
    /// The tables are compiled in, so a malformed table is a programming error
    /// caught by the tests below; dangling parents are treated as roots.
    fn build(name: &'static str, table: &[GeoNode]) -> Self {
        let nodes = table.to_vec();
        let index: HashMap<&'static str, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.code, i)).collect();

        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        for (i, n) in nodes.iter().enumerate() {
            match n.parent.and_then(|p| index.get(p)) {
                Some(&p) => children[p].push(i),
                None => roots.push(i),
            }
        }

        let mut bottom_up = Vec::with_capacity(nodes.len());
        for root in roots {
            post_order(root, &children, &mut bottom_up);
        }

        let mut leaf_lookup = HashMap::new();
        for (i, n) in nodes.iter().enumerate() {
            if !children[i].is_empty() || n.parent.is_none() {
                continue;
            }
            leaf_lookup.insert(n.code, i);
            for label in n.labels {
                leaf_lookup.insert(*label, i);
            }
        }

        Self {
            name,
            nodes,
            index,
            children,
            bottom_up,
            leaf_lookup,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn nodes(&self) -> &[GeoNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&GeoNode> {
        self.index.get(code).map(|&i| &self.nodes[i])
    }

    pub fn position(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    /// Direct children of the node at `idx`.
    pub fn children_of(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    /// Node indices ordered so that every child comes before its parent.
    pub fn bottom_up(&self) -> &[usize] {
        &self.bottom_up
    }

    pub fn is_leaf(&self, code: &str) -> bool {
        self.position(code)
            .is_some_and(|i| self.children[i].is_empty() && self.nodes[i].parent.is_some())
    }

    /// Resolve a feed label to the code of the leaf it reports on.
    ///
    /// `None` (no geography) and labels that match no leaf both land in
    /// [`UNASSIGNED`]. The second element is `false` only when a label was
    /// present but matched nothing.
    pub fn resolve(&self, label: Option<&str>) -> (&'static str, bool) {
        let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
            return (UNASSIGNED, true);
        };
        match self.leaf_lookup.get(label) {
            Some(&i) => (self.nodes[i].code, true),
            None => (UNASSIGNED, false),
        }
    }

    /// Every node code, in table order.
    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.nodes.iter().map(|n| n.code)
    }
}

fn post_order(idx: usize, children: &[Vec<usize>], out: &mut Vec<usize>) {
    for &c in &children[idx] {
        post_order(c, children, out);
    }
    out.push(idx);
}
