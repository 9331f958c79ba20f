use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::auth::RoleRequirement;
use crate::domain::upload::SignedUpload;
use crate::errors::AppError;
use crate::state::AppState;

use super::Authenticated;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedUploadResponse {
    pub upload_url: String,
    pub api_key: String,
    /// Unix seconds the signature was made at.
    pub timestamp: i64,
    pub signature: String,
}

impl From<SignedUpload> for SignedUploadResponse {
    fn from(s: SignedUpload) -> Self {
        Self {
            upload_url: s.upload_url,
            api_key: s.api_key,
            timestamp: s.timestamp,
            signature: s.signature,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/images/signed-upload", web::post().to(signed_upload));
}

/// POST /images/signed-upload
///
/// Signs a direct browser upload to the image host.
#[utoipa::path(
    post,
    path = "/images/signed-upload",
    responses(
        (status = 200, description = "Upload signature", body = SignedUploadResponse),
        (status = 403, description = "Caller is not a manager"),
    ),
    security(("bearer_auth" = [])),
    tag = "images"
)]
pub async fn signed_upload(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let signed = state.uploads.sign_upload();
    Ok(HttpResponse::Ok().json(SignedUploadResponse::from(signed)))
}
