use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{de, FieldBag, Node, PaperId, QuestionId, RecordId};

/// Flat, denormalized entry of a section's `questions` list. Sub-questions use the
/// same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionQuestion {
    #[serde(deserialize_with = "de::id")]
    pub question_id: QuestionId,
    #[serde(
        default,
        rename = "type",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub question_type: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number", skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<f64>,
    #[serde(default, deserialize_with = "de::list", skip_serializing_if = "Vec::is_empty")]
    pub sub_questions: Vec<SectionQuestion>,
    /// `marks`, `is_attempted` and any mark aliases.
    #[serde(flatten)]
    pub fields: FieldBag,
}

impl SectionQuestion {
    pub fn new(question_id: QuestionId) -> Self {
        Self {
            question_id,
            question_type: None,
            chapter: None,
            max_marks: None,
            sub_questions: Vec::new(),
            fields: FieldBag::new(),
        }
    }

    /// The stored `marks` field, not the alias scan.
    pub fn marks(&self) -> Option<f64> {
        self.fields.number("marks")
    }

    pub fn is_attempted(&self) -> Option<bool> {
        self.fields.is_attempted()
    }

    pub fn has_sub_questions(&self) -> bool {
        !self.sub_questions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(
        default,
        rename = "section",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Zero means no cap.
    #[serde(default, deserialize_with = "de::count")]
    pub attemptable_questions: u32,
    #[serde(default, deserialize_with = "de::list")]
    pub questions: Vec<SectionQuestion>,
    #[serde(default, rename = "items", deserialize_with = "de::list")]
    pub nodes: Vec<Node>,
}

impl Section {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("this section")
    }

    pub fn question(&self, question_id: QuestionId) -> Option<&SectionQuestion> {
        self.questions.iter().find(|question| question.question_id == question_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptedPaper {
    #[serde(default, deserialize_with = "de::opt_id", skip_serializing_if = "Option::is_none")]
    pub question_paper_id: Option<PaperId>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool", skip_serializing_if = "Option::is_none")]
    pub is_attempted: Option<bool>,
    #[serde(default, rename = "allSectionData", deserialize_with = "de::list")]
    pub sections: Vec<Section>,
    /// Older payloads carry a flat list instead of sections.
    #[serde(default, deserialize_with = "de::list", skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<SectionQuestion>,
}

impl AttemptedPaper {
    /// Strictly `true`; missing or non-boolean flags do not count.
    pub fn attempted(&self) -> bool {
        self.is_attempted == Some(true)
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Sections to work with. A paper without a section tree but with a legacy flat
    /// list is presented as one unnamed, uncapped section.
    pub fn effective_sections(&self) -> Cow<'_, [Section]> {
        if self.sections.is_empty() && !self.questions.is_empty() {
            return Cow::Owned(vec![Section {
                name: None,
                attemptable_questions: 0,
                questions: self.questions.clone(),
                nodes: Vec::new(),
            }]);
        }
        Cow::Borrowed(&self.sections)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    MedicalLeave,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::MedicalLeave => "medical-leave",
            AttendanceStatus::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Titled {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub f_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub l_name: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub section: Option<Titled>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub grade: Option<Titled>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamInfo {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
}

/// One student's marks record for an exam, as returned by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentExamRecord {
    #[serde(deserialize_with = "de::id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub user: Option<StudentProfile>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub exam: Option<ExamInfo>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub attendance_status: Option<AttendanceStatus>,
    #[serde(default, rename = "question_paper", deserialize_with = "de::list")]
    pub papers: Vec<AttemptedPaper>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub obtained_marks: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub total_marks: Option<f64>,
}

impl StudentExamRecord {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            student_id: None,
            user: None,
            exam: None,
            attendance_status: None,
            papers: Vec::new(),
            obtained_marks: None,
            total_marks: None,
        }
    }

    /// Identifier used to key mark overrides: first name, else scholar id.
    pub fn student_key(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|user| user.f_name.as_deref())
            .or(self.student_id.as_deref())
            .unwrap_or("student")
    }

    pub fn display_name(&self) -> String {
        let user = self.user.as_ref();
        let first = user.and_then(|user| user.f_name.as_deref()).unwrap_or_default();
        let last = user.and_then(|user| user.l_name.as_deref()).unwrap_or_default();
        format!("{first} {last}")
    }

    pub fn section_title(&self) -> Option<&str> {
        self.user.as_ref()?.section.as_ref()?.title.as_deref()
    }

    pub fn grade_title(&self) -> Option<&str> {
        self.user.as_ref()?.grade.as_ref()?.title.as_deref()
    }

    pub fn exam_name(&self) -> Option<&str> {
        self.exam.as_ref()?.name.as_deref()
    }

    pub fn attendance(&self) -> AttendanceStatus {
        self.attendance_status.unwrap_or_default()
    }

    pub fn paper(&self, paper_id: PaperId) -> Option<&AttemptedPaper> {
        self.papers.iter().find(|paper| paper.question_paper_id == Some(paper_id))
    }

    /// The paper the student actually answered, else the first one.
    pub fn default_paper(&self) -> Option<&AttemptedPaper> {
        self.papers.iter().find(|paper| paper.attempted()).or_else(|| self.papers.first())
    }

    /// Tag of the first answered paper. When that paper carries no tag the record
    /// belongs to no report block, even if a later answered paper is tagged.
    pub fn attempted_tag(&self) -> Option<&str> {
        self.papers.iter().find(|paper| paper.attempted())?.tag()
    }

    /// This record's paper for a report block: answered copies first.
    pub fn paper_for_tag(&self, tag: &str) -> Option<&AttemptedPaper> {
        self.papers
            .iter()
            .find(|paper| paper.tag() == Some(tag) && paper.attempted())
            .or_else(|| self.first_paper_with_tag(tag))
    }

    pub fn first_paper_with_tag(&self, tag: &str) -> Option<&AttemptedPaper> {
        self.papers.iter().find(|paper| paper.tag() == Some(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_api_record() {
        let raw = json!({
            "id": "41",
            "student_id": 2024001,
            "user": { "f_name": "Asha", "l_name": "Rao", "section": { "title": "B" }, "grade": null },
            "exam": { "name": "Midterm" },
            "attendance_status": "medical-leave",
            "question_paper": [
                { "question_paper_id": 7, "tag": "SET B", "is_attempted": "yes" },
                { "question_paper_id": "8", "tag": "SET A", "is_attempted": true, "allSectionData": [
                    { "section": "A", "attemptable_questions": "2", "questions": [
                        { "question_id": 1, "marks": "4", "max_marks": 5, "is_attempted": true },
                        { "question_id": "broken" }
                    ], "items": null }
                ]}
            ],
            "obtained_marks": "4",
            "total_marks": 5
        });

        let record: StudentExamRecord = serde_json::from_value(raw).expect("record");
        assert_eq!(record.id, 41);
        assert_eq!(record.student_id.as_deref(), Some("2024001"));
        assert_eq!(record.student_key(), "Asha");
        assert_eq!(record.display_name(), "Asha Rao");
        assert_eq!(record.section_title(), Some("B"));
        assert_eq!(record.grade_title(), None);
        assert_eq!(record.attendance(), AttendanceStatus::MedicalLeave);
        assert_eq!(record.obtained_marks, Some(4.0));
        assert_eq!(record.attempted_tag(), Some("SET A"));
        assert_eq!(record.default_paper().and_then(|paper| paper.question_paper_id), Some(8));

        let paper = record.paper(8).expect("paper 8");
        let section = &paper.sections[0];
        assert_eq!(section.attemptable_questions, 2);
        assert_eq!(section.questions.len(), 1);
        assert_eq!(section.questions[0].marks(), Some(4.0));
        assert!(section.nodes.is_empty());
    }

    #[test]
    fn unknown_attendance_falls_back_to_present() {
        let record: StudentExamRecord =
            serde_json::from_value(json!({ "id": 1, "attendance_status": "late" })).expect("record");
        assert_eq!(record.attendance(), AttendanceStatus::Present);
        assert_eq!(record.student_key(), "student");
    }

    #[test]
    fn untagged_first_answered_paper_leaves_record_untagged() {
        let record: StudentExamRecord = serde_json::from_value(json!({
            "id": 2,
            "question_paper": [
                { "question_paper_id": 1, "is_attempted": false, "tag": "SET A" },
                { "question_paper_id": 2, "is_attempted": true },
                { "question_paper_id": 3, "is_attempted": true, "tag": "SET B" }
            ]
        }))
        .expect("record");
        assert_eq!(record.attempted_tag(), None);
    }

    #[test]
    fn legacy_questions_become_single_section() {
        let paper: AttemptedPaper = serde_json::from_value(json!({
            "question_paper_id": 3,
            "questions": [{ "question_id": 10, "marks": 2 }]
        }))
        .expect("paper");
        let sections = paper.effective_sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].attemptable_questions, 0);
        assert_eq!(sections[0].questions[0].question_id, 10);
    }
}
