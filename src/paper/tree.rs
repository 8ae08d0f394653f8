use std::collections::HashSet;

use super::{AttemptedPaper, CompositeNode, Node, QuestionId, Section};

/// Preorder visit of every node, descending into composites and groups.
pub fn walk<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a Node)) {
    for node in nodes {
        visit(node);
        walk(node.children(), visit);
    }
}

impl Section {
    /// Ids that count toward the section's attempt cap, deduplicated in first-seen
    /// order: flat questions, tree questions outside composites, and composites
    /// themselves. Composite children roll into their parent.
    pub fn countable_ids(&self) -> Vec<QuestionId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut push = |id: QuestionId| {
            if seen.insert(id) {
                ids.push(id);
            }
        };

        for question in &self.questions {
            push(question.question_id);
        }
        collect_countable(&self.nodes, &mut push);
        ids
    }

    pub fn find_composite(&self, question_id: QuestionId) -> Option<&CompositeNode> {
        let mut found = None;
        walk(&self.nodes, &mut |node| {
            if found.is_some() {
                return;
            }
            if let Node::Composite(composite) = node {
                if composite.question_id == question_id {
                    found = Some(composite);
                }
            }
        });
        found
    }

    /// Upper bound for a mark entered against `question_id` in this section, if the
    /// question belongs here. The inner `Option` is `None` when no bound is recorded.
    pub fn max_marks_for(&self, question_id: QuestionId) -> Option<Option<f64>> {
        for question in &self.questions {
            if question.question_id == question_id {
                return Some(question.max_marks);
            }
            if let Some(sub) =
                question.sub_questions.iter().find(|sub| sub.question_id == question_id)
            {
                return Some(sub.max_marks.or_else(|| sub.marks()));
            }
        }

        let mut found = None;
        walk(&self.nodes, &mut |node| {
            if found.is_some() {
                return;
            }
            match node {
                Node::Question(question) if question.question_id == question_id => {
                    found = Some(question.max_marks);
                }
                Node::Composite(composite) if composite.question_id == question_id => {
                    found = Some(composite.max_marks);
                }
                _ => {}
            }
        });
        found
    }
}

fn collect_countable(nodes: &[Node], push: &mut impl FnMut(QuestionId)) {
    for node in nodes {
        match node {
            Node::Question(question) => push(question.question_id),
            Node::Composite(composite) => push(composite.question_id),
            Node::Group(group) => collect_countable(&group.children, push),
        }
    }
}

impl AttemptedPaper {
    pub fn max_marks_for(&self, question_id: QuestionId) -> Option<Option<f64>> {
        self.effective_sections().iter().find_map(|section| section.max_marks_for(question_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section() -> Section {
        serde_json::from_value(json!({
            "section": "A",
            "attemptable_questions": 2,
            "questions": [
                { "question_id": 1, "max_marks": 5 },
                { "question_id": 4, "max_marks": 6, "sub_questions": [
                    { "question_id": 41, "max_marks": 3 },
                    { "question_id": 42, "marks": 3 }
                ]}
            ],
            "items": [
                { "nodeType": "question", "questionId": 1, "maxMarks": 5 },
                { "nodeType": "group", "groupType": "OR", "question_id": [2, 3], "items": [
                    { "nodeType": "question", "questionId": 2, "maxMarks": 4 },
                    { "nodeType": "question", "questionId": 3, "maxMarks": 4 }
                ]},
                { "nodeType": "composite", "questionId": 4, "totalMarks": 6, "items": [
                    { "nodeType": "question", "questionId": 41 },
                    { "nodeType": "group", "groupType": "OR", "items": [
                        { "nodeType": "question", "questionId": 42 }
                    ]}
                ]}
            ]
        }))
        .expect("section")
    }

    #[test]
    fn countable_ids_roll_composite_children_into_parent() {
        assert_eq!(section().countable_ids(), vec![1, 4, 2, 3]);
    }

    #[test]
    fn walk_reaches_nested_nodes_in_preorder() {
        let section = section();
        let mut ids = Vec::new();
        walk(&section.nodes, &mut |node| ids.extend(node.question_id()));
        assert_eq!(ids, vec![1, 2, 3, 4, 41, 42]);
        assert!(section.find_composite(4).is_some());
        assert!(section.find_composite(2).is_none());
    }

    #[test]
    fn max_marks_lookup_covers_sub_questions_and_tree() {
        let section = section();
        assert_eq!(section.max_marks_for(1), Some(Some(5.0)));
        assert_eq!(section.max_marks_for(41), Some(Some(3.0)));
        assert_eq!(section.max_marks_for(42), Some(Some(3.0)));
        assert_eq!(section.max_marks_for(2), Some(Some(4.0)));
        assert_eq!(section.max_marks_for(99), None);
    }
}
