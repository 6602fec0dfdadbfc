use crate::auth::Role;
use crate::error::ApiErrorBody;
use crate::models::{HealthResponse, MessageResponse, SignUpRequest, SignUpResponse, SignUpRole, User, UserSummary};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::root,
        crate::routes::api_index,
        crate::routes::health,
        crate::routes::sign_up,
        crate::routes::sign_in,
        crate::routes::sign_out,
    ),
    components(schemas(
        Role, SignUpRole, SignUpRequest, SignUpResponse, UserSummary, User,
        HealthResponse, MessageResponse, ApiErrorBody
    )),
    tags(
        (name = "auth", description = "Sign-up and session endpoints"),
        (name = "system", description = "Liveness and index"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_auth_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/auth/sign-up"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/auth/sign-in"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/auth/sign-out"));
    }

    #[test]
    fn documents_system_routes() {
        let doc = ApiDoc::openapi();
        for route in ["/", "/api", "/health"] {
            assert!(doc.paths.paths.contains_key(route), "{route} missing from docs");
        }
    }

    #[test]
    fn sign_up_documents_token_failure() {
        let doc = ApiDoc::openapi();
        let item = &doc.paths.paths["/api/auth/sign-up"];
        let op = item.operations.values().next().unwrap();
        assert!(op.responses.responses.contains_key("500"));
    }
}
