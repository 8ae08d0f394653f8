use serde::{Deserialize, Serialize};

use super::{de, FieldBag, QuestionId};

/// One entry of a section's structural tree.
///
/// Unknown `nodeType`s never reach this type: lists of nodes are decoded with
/// [`de::list`], which drops entries that do not match any variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all = "lowercase")]
pub enum Node {
    Question(QuestionNode),
    Composite(CompositeNode),
    Group(GroupNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionNode {
    #[serde(rename = "questionId", deserialize_with = "de::id")]
    pub question_id: QuestionId,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(
        default,
        rename = "type",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub question_type: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(
        default,
        rename = "maxMarks",
        deserialize_with = "de::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_marks: Option<f64>,
    /// Per-student mark aliases and `is_attempted`, when the upstream embedded them.
    #[serde(flatten)]
    pub fields: FieldBag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeNode {
    #[serde(rename = "questionId", deserialize_with = "de::id")]
    pub question_id: QuestionId,
    /// Ids the composite stands for in numbering, as declared upstream.
    #[serde(default, rename = "question_id", deserialize_with = "de::id_list")]
    pub declared_ids: Vec<QuestionId>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(
        default,
        rename = "totalMarks",
        deserialize_with = "de::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_marks: Option<f64>,
    #[serde(default, rename = "items", deserialize_with = "de::list")]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    #[serde(default, rename = "groupType", deserialize_with = "group_kind")]
    pub kind: GroupKind,
    #[serde(default, rename = "question_id", deserialize_with = "de::id_list")]
    pub member_ids: Vec<QuestionId>,
    #[serde(
        default,
        rename = "pickCount",
        deserialize_with = "de::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub pick_count: Option<f64>,
    #[serde(
        default,
        rename = "displayLabel",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_label: Option<String>,
    #[serde(default, rename = "items", deserialize_with = "de::list")]
    pub children: Vec<Node>,
}

/// `groupType`, matched case-insensitively. Anything other than `OR` places no
/// constraint on attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GroupKind {
    Or,
    #[default]
    And,
    Other(String),
}

impl From<String> for GroupKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "OR" => GroupKind::Or,
            "AND" | "" => GroupKind::And,
            _ => GroupKind::Other(value),
        }
    }
}

impl From<GroupKind> for String {
    fn from(value: GroupKind) -> Self {
        match value {
            GroupKind::Or => "OR".to_string(),
            GroupKind::And => "AND".to_string(),
            GroupKind::Other(raw) => raw,
        }
    }
}

fn group_kind<'de, D>(deserializer: D) -> Result<GroupKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(de::opt_string(deserializer)?.map(GroupKind::from).unwrap_or_default())
}

impl Node {
    /// Own question id for questions and composites; groups have none.
    pub fn question_id(&self) -> Option<QuestionId> {
        match self {
            Node::Question(question) => Some(question.question_id),
            Node::Composite(composite) => Some(composite.question_id),
            Node::Group(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Question(_) => &[],
            Node::Composite(composite) => &composite.children,
            Node::Group(group) => &group.children,
        }
    }
}

impl GroupNode {
    pub fn is_or(&self) -> bool {
        self.kind == GroupKind::Or
    }

    /// A missing or zero `pickCount` means one pick.
    pub fn effective_pick_count(&self) -> u32 {
        match self.pick_count {
            Some(count) if count >= 1.0 => count.trunc().min(f64::from(u32::MAX)) as u32,
            _ => 1,
        }
    }

    /// Declared member ids, or the ids of the direct children when none are declared.
    pub fn members(&self) -> Vec<QuestionId> {
        if !self.member_ids.is_empty() {
            return self.member_ids.clone();
        }
        self.children.iter().filter_map(Node::question_id).collect()
    }

    pub fn label(&self) -> &str {
        self.display_label.as_deref().unwrap_or("this OR group")
    }
}
