use core::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::currency::Currency;
use crate::eval::evaluator::{EvalError, EvalResult};

/// Opaque identifier of an oracle ("gateway") contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayAddress(String);

impl GatewayAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A usable address is a non-empty hex string (optionally `0x`-prefixed)
    /// that does not evaluate to zero.
    pub fn is_valid(&self) -> bool {
        let digits = self
            .0
            .strip_prefix("0x")
            .or_else(|| self.0.strip_prefix("0X"))
            .unwrap_or(&self.0);
        !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_hexdigit())
            && digits.chars().any(|c| c != '0')
    }
}

impl fmt::Display for GatewayAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GatewayAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Bounds of a yet-unknown scaling factor, serialized as `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ObsRange {
    pub min: f64,
    pub max: f64,
}

impl ObsRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Default for ObsRange {
    fn default() -> Self {
        Self { min: 1.0, max: 1.2 }
    }
}

impl From<[f64; 2]> for ObsRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<ObsRange> for [f64; 2] {
    fn from(range: ObsRange) -> Self {
        [range.min, range.max]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum NodeKind {
    And,
    Or,
    If,
    Give,
    Scale,
    ScaleObs,
    Timebound,
    Zero,
    One,
}

/// A fincontract combinator tree.
///
/// Children are owned by their parent; a tree is never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeDescription", into = "NodeDescription")]
pub enum Node {
    And {
        left: Box<Node>,
        right: Box<Node>,
    },
    Or {
        left: Box<Node>,
        right: Box<Node>,
    },
    If {
        gateway: GatewayAddress,
        left: Box<Node>,
        right: Box<Node>,
    },
    Give {
        child: Box<Node>,
    },
    Scale {
        factor: f64,
        child: Box<Node>,
    },
    ScaleObs {
        gateway: GatewayAddress,
        range: Option<ObsRange>,
        child: Box<Node>,
    },
    Timebound {
        lower_bound: i64,
        upper_bound: i64,
        child: Box<Node>,
    },
    Zero,
    One {
        currency: usize,
    },
}

impl Node {
    pub fn zero() -> Self {
        Node::Zero
    }

    pub fn one(currency: impl Into<usize>) -> Self {
        Node::One {
            currency: currency.into(),
        }
    }

    pub fn give(child: Node) -> Self {
        Node::Give {
            child: Box::new(child),
        }
    }

    pub fn scale(factor: f64, child: Node) -> Self {
        Node::Scale {
            factor,
            child: Box::new(child),
        }
    }

    pub fn scale_obs(gateway: impl Into<GatewayAddress>, child: Node) -> Self {
        Node::ScaleObs {
            gateway: gateway.into(),
            range: None,
            child: Box::new(child),
        }
    }

    pub fn scale_obs_with_range(
        gateway: impl Into<GatewayAddress>,
        range: ObsRange,
        child: Node,
    ) -> Self {
        Node::ScaleObs {
            gateway: gateway.into(),
            range: Some(range),
            child: Box::new(child),
        }
    }

    pub fn timebound(lower_bound: i64, upper_bound: i64, child: Node) -> Self {
        Node::Timebound {
            lower_bound,
            upper_bound,
            child: Box::new(child),
        }
    }

    pub fn and(left: Node, right: Node) -> Self {
        Node::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Node, right: Node) -> Self {
        Node::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn if_else(gateway: impl Into<GatewayAddress>, left: Node, right: Node) -> Self {
        Node::If {
            gateway: gateway.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::And { .. } => NodeKind::And,
            Node::Or { .. } => NodeKind::Or,
            Node::If { .. } => NodeKind::If,
            Node::Give { .. } => NodeKind::Give,
            Node::Scale { .. } => NodeKind::Scale,
            Node::ScaleObs { .. } => NodeKind::ScaleObs,
            Node::Timebound { .. } => NodeKind::Timebound,
            Node::Zero => NodeKind::Zero,
            Node::One { .. } => NodeKind::One,
        }
    }

    /// Oracle referenced by this node itself (not by its descendants).
    pub fn gateway(&self) -> Option<&GatewayAddress> {
        match self {
            Node::If { gateway, .. } | Node::ScaleObs { gateway, .. } => Some(gateway),
            _ => None,
        }
    }

    /// Total number of nodes in the tree rooted here.
    pub fn size(&self) -> usize {
        match self {
            Node::Zero | Node::One { .. } => 1,
            Node::Give { child }
            | Node::Scale { child, .. }
            | Node::ScaleObs { child, .. }
            | Node::Timebound { child, .. } => 1 + child.size(),
            Node::And { left, right } | Node::Or { left, right } | Node::If { left, right, .. } => {
                1 + left.size() + right.size()
            }
        }
    }

    /// Decode a tree from its JSON description.
    pub fn from_json(json: &str) -> EvalResult<Self> {
        let description: NodeDescription =
            serde_json::from_str(json).map_err(|e| EvalError::Decode(e.to_string()))?;
        Node::try_from(description)
    }

    pub fn from_value(value: serde_json::Value) -> EvalResult<Self> {
        let description: NodeDescription =
            serde_json::from_value(value).map_err(|e| EvalError::Decode(e.to_string()))?;
        Node::try_from(description)
    }

    pub fn to_json(&self) -> EvalResult<String> {
        serde_json::to_string(self).map_err(|e| EvalError::Decode(e.to_string()))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::And { left, right } => write!(f, "And({}, {})", left, right),
            Node::Or { left, right } => write!(f, "Or({}, {})", left, right),
            Node::If {
                gateway,
                left,
                right,
            } => write!(f, "If({}, {}, {})", gateway, left, right),
            Node::Give { child } => write!(f, "Give({})", child),
            Node::Scale { factor, child } => write!(f, "Scale({}, {})", factor, child),
            Node::ScaleObs {
                gateway,
                range: Some(range),
                child,
            } => write!(
                f,
                "ScaleObs({}, [{}, {}], {})",
                gateway, range.min, range.max, child
            ),
            Node::ScaleObs { gateway, child, .. } => write!(f, "ScaleObs({}, {})", gateway, child),
            Node::Timebound {
                lower_bound,
                upper_bound,
                child,
            } => write!(f, "Timebound({}, {}, {})", lower_bound, upper_bound, child),
            Node::Zero => write!(f, "Zero"),
            Node::One { currency } => match Currency::from_index(*currency) {
                Some(c) => write!(f, "One({})", c),
                None => write!(f, "One(#{})", currency),
            },
        }
    }
}

/// A deployed fincontract: an identifier plus the description of its tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fincontract {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "rootDescription")]
    pub root: Node,
}

impl Fincontract {
    pub fn new(id: impl Into<String>, root: Node) -> Self {
        Self {
            id: id.into(),
            owner: None,
            root,
        }
    }
}

// Wire shape of a node: a `type` tag plus whichever fields the variant uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeDescription {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left: Option<Box<NodeDescription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right: Option<Box<NodeDescription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    child: Option<Box<NodeDescription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gateway_address: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<ObsRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lower_bound: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upper_bound: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    currency: Option<CurrencyRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CurrencyRef {
    Index(usize),
    Name(Currency),
}

impl NodeDescription {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    fn take_child(
        slot: Option<Box<NodeDescription>>,
        kind: NodeKind,
        field: &'static str,
    ) -> EvalResult<Box<Node>> {
        let description = slot.ok_or(EvalError::MissingField { kind, field })?;
        Ok(Box::new(Node::try_from(*description)?))
    }

    fn gateway(&self, kind: NodeKind) -> EvalResult<GatewayAddress> {
        match &self.gateway_address {
            Some(serde_json::Value::String(address)) => Ok(GatewayAddress::new(address.clone())),
            // Numeric addresses only show up as the unset `0x0` placeholder.
            Some(serde_json::Value::Number(number)) => Ok(GatewayAddress::new(number.to_string())),
            Some(other) => Err(EvalError::Decode(format!(
                "{} gatewayAddress must be a string, got {}",
                kind, other
            ))),
            None => Err(EvalError::MissingField {
                kind,
                field: "gatewayAddress",
            }),
        }
    }
}

impl TryFrom<NodeDescription> for Node {
    type Error = EvalError;

    fn try_from(description: NodeDescription) -> Result<Self, Self::Error> {
        let kind: NodeKind = description
            .kind
            .parse()
            .map_err(|_| EvalError::UnknownNode(description.kind.clone()))?;

        let node = match kind {
            NodeKind::And => Node::And {
                left: NodeDescription::take_child(description.left, kind, "left")?,
                right: NodeDescription::take_child(description.right, kind, "right")?,
            },
            NodeKind::Or => Node::Or {
                left: NodeDescription::take_child(description.left, kind, "left")?,
                right: NodeDescription::take_child(description.right, kind, "right")?,
            },
            NodeKind::If => Node::If {
                gateway: description.gateway(kind)?,
                left: NodeDescription::take_child(description.left, kind, "left")?,
                right: NodeDescription::take_child(description.right, kind, "right")?,
            },
            NodeKind::Give => Node::Give {
                child: NodeDescription::take_child(description.child, kind, "child")?,
            },
            NodeKind::Scale => Node::Scale {
                factor: description.scale.ok_or(EvalError::MissingField {
                    kind,
                    field: "scale",
                })?,
                child: NodeDescription::take_child(description.child, kind, "child")?,
            },
            NodeKind::ScaleObs => Node::ScaleObs {
                gateway: description.gateway(kind)?,
                range: description.range,
                child: NodeDescription::take_child(description.child, kind, "child")?,
            },
            NodeKind::Timebound => Node::Timebound {
                lower_bound: description.lower_bound.ok_or(EvalError::MissingField {
                    kind,
                    field: "lowerBound",
                })?,
                upper_bound: description.upper_bound.ok_or(EvalError::MissingField {
                    kind,
                    field: "upperBound",
                })?,
                child: NodeDescription::take_child(description.child, kind, "child")?,
            },
            NodeKind::Zero => Node::Zero,
            NodeKind::One => Node::One {
                currency: match description.currency {
                    Some(CurrencyRef::Index(index)) => index,
                    Some(CurrencyRef::Name(currency)) => currency.index(),
                    None => {
                        return Err(EvalError::MissingField {
                            kind,
                            field: "currency",
                        })
                    }
                },
            },
        };
        Ok(node)
    }
}

impl From<Node> for NodeDescription {
    fn from(node: Node) -> Self {
        let mut description = NodeDescription::new(node.kind());
        let boxed = |node: Box<Node>| Some(Box::new(NodeDescription::from(*node)));
        match node {
            Node::And { left, right } | Node::Or { left, right } => {
                description.left = boxed(left);
                description.right = boxed(right);
            }
            Node::If {
                gateway,
                left,
                right,
            } => {
                description.gateway_address = Some(serde_json::Value::String(gateway.0));
                description.left = boxed(left);
                description.right = boxed(right);
            }
            Node::Give { child } => description.child = boxed(child),
            Node::Scale { factor, child } => {
                description.scale = Some(factor);
                description.child = boxed(child);
            }
            Node::ScaleObs {
                gateway,
                range,
                child,
            } => {
                description.gateway_address = Some(serde_json::Value::String(gateway.0));
                description.range = range;
                description.child = boxed(child);
            }
            Node::Timebound {
                lower_bound,
                upper_bound,
                child,
            } => {
                description.lower_bound = Some(lower_bound);
                description.upper_bound = Some(upper_bound);
                description.child = boxed(child);
            }
            Node::Zero => {}
            Node::One { currency } => description.currency = Some(CurrencyRef::Index(currency)),
        }
        description
    }
}
