use axum::{Extension, response::IntoResponse};

use misis_corelib::http::Json;

use super::response;
use crate::models::user::User;

/// `GET /{base}/api/v1/user`
pub async fn get_user(Extension(user): Extension<User>) -> impl IntoResponse {
    let profile = user.profile.unwrap_or_default();
    Json(response::GetUser {
        id: user.user_id,
        email: user.email,
        login: user.login,
        profile: response::GetUserProfile {
            full_name: profile.full_name,
            record_book_number: profile.record_book_number,
            study_form: profile.study_form,
            preparation_level: profile.preparation_level,
            specialization: profile.specialization,
            specialty: profile.specialty,
            faculty: profile.faculty,
            course: profile.course,
            group: profile.group,
            financing_form: profile.financing_form,
            personal_email: profile.personal_email,
            personal_phone: profile.personal_phone,
            corporate_email: profile.corporate_email,
        },
    })
}

/// `GET /{base}/api/v1/user/profile`
pub async fn get_profile(Extension(user): Extension<User>) -> impl IntoResponse {
    Json(response::GetProfile {
        id: user.user_id,
        email: user.email,
        login: user.login,
        profile: user.profile.unwrap_or_default(),
    })
}
