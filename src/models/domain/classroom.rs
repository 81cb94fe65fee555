use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Classroom {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
    #[serde(default)]
    pub student_ids: Vec<String>,
}

impl Classroom {
    pub fn is_teacher(&self, user_id: &str) -> bool {
        self.teacher_id == user_id
    }

    /// Teachers count as members of their own class.
    pub fn is_member(&self, user_id: &str) -> bool {
        self.is_teacher(user_id) || self.student_ids.iter().any(|id| id == user_id)
    }
}
