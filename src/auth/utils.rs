use crate::{
    auth::CallerIdentity,
    errors::{AppError, AppResult},
    models::domain::Classroom,
};

pub fn require_class_member(classroom: &Classroom, caller: &CallerIdentity) -> AppResult<()> {
    if !classroom.is_member(&caller.user_id) {
        return Err(AppError::Forbidden(format!(
            "You are not a member of class {}",
            classroom.id
        )));
    }
    Ok(())
}

pub fn require_class_teacher(classroom: &Classroom, caller: &CallerIdentity) -> AppResult<()> {
    if !classroom.is_teacher(&caller.user_id) {
        return Err(AppError::Forbidden(
            "Only the class teacher can perform this action".to_string(),
        ));
    }
    Ok(())
}
