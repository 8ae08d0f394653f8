use std::collections::HashMap;

use crate::paper::{Node, QuestionId, Section};

/// Sequential display numbers for the visually distinct questions of one paper.
/// Members of an OR group share a number; a composite's number covers its
/// declared id list.
#[derive(Debug, Clone)]
pub struct QuestionNumbering {
    numbers: HashMap<QuestionId, u32>,
    next: u32,
}

impl Default for QuestionNumbering {
    fn default() -> Self {
        Self { numbers: HashMap::new(), next: 1 }
    }
}

impl QuestionNumbering {
    /// Numbers the trees of every section that has flat questions, in order.
    pub fn assign(sections: &[Section]) -> Self {
        let mut numbering = Self::default();
        for section in sections.iter().filter(|section| !section.questions.is_empty()) {
            numbering.visit(&section.nodes);
        }
        numbering
    }

    fn visit(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Group(group) if group.is_or() => {
                    let number = self.next;
                    for id in group.members() {
                        self.numbers.entry(id).or_insert(number);
                    }
                    self.next += 1;
                }
                Node::Question(question) => {
                    if !self.numbers.contains_key(&question.question_id) {
                        self.numbers.insert(question.question_id, self.next);
                        self.next += 1;
                    }
                }
                Node::Composite(composite) => {
                    let number = self.next;
                    self.numbers.entry(composite.question_id).or_insert(number);
                    for id in &composite.declared_ids {
                        self.numbers.entry(*id).or_insert(number);
                    }
                    self.next += 1;
                }
                Node::Group(group) => self.visit(&group.children),
            }
        }
    }

    pub fn number_of(&self, question_id: QuestionId) -> Option<u32> {
        self.numbers.get(&question_id).copied()
    }

    /// `{prefix}{n}`, or `{prefix}?` for unnumbered questions.
    pub fn label(&self, prefix: &str, question_id: QuestionId) -> String {
        match self.number_of(question_id) {
            Some(number) => format!("{prefix}{number}"),
            None => format!("{prefix}?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(items: serde_json::Value) -> Section {
        serde_json::from_value(json!({
            "section": "A",
            "questions": [{ "question_id": 1 }],
            "items": items
        }))
        .expect("section")
    }

    #[test]
    fn or_members_share_a_number() {
        let numbering = QuestionNumbering::assign(&[section(json!([
            { "nodeType": "group", "groupType": "OR", "question_id": [5, 6], "items": [
                { "nodeType": "question", "questionId": 5 },
                { "nodeType": "question", "questionId": 6 }
            ]},
            { "nodeType": "question", "questionId": 7 }
        ]))]);
        assert_eq!(numbering.number_of(5), Some(1));
        assert_eq!(numbering.number_of(6), Some(1));
        assert_eq!(numbering.number_of(7), Some(2));
        assert_eq!(numbering.label("Q", 7), "Q2");
        assert_eq!(numbering.label("Q", 8), "Q?");
    }

    #[test]
    fn composites_cover_declared_ids_not_children() {
        let numbering = QuestionNumbering::assign(&[section(json!([
            { "nodeType": "composite", "questionId": 10, "question_id": [11], "items": [
                { "nodeType": "question", "questionId": 11 },
                { "nodeType": "question", "questionId": 12 }
            ]},
            { "nodeType": "group", "groupType": "AND", "items": [
                { "nodeType": "question", "questionId": 13 },
                { "nodeType": "question", "questionId": 13 }
            ]}
        ]))]);
        assert_eq!(numbering.number_of(10), Some(1));
        assert_eq!(numbering.number_of(11), Some(1));
        assert_eq!(numbering.number_of(12), None);
        assert_eq!(numbering.number_of(13), Some(2));
    }

    #[test]
    fn sections_without_flat_questions_are_skipped() {
        let mut empty = section(json!([{ "nodeType": "question", "questionId": 3 }]));
        empty.questions.clear();
        let numbered = section(json!([{ "nodeType": "question", "questionId": 4 }]));
        let numbering = QuestionNumbering::assign(&[empty, numbered]);
        assert_eq!(numbering.number_of(3), None);
        assert_eq!(numbering.number_of(4), Some(1));
    }
}
