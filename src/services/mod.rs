pub(crate) mod exam_marks_client;
pub(crate) mod marking_session;
