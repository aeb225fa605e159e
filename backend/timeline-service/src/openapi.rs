/// OpenAPI documentation for the Timeline Service
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chirp Timeline Service API",
        version = "0.1.0",
        description = "Posts, retweets, likes, comments and follows. Builds the public and following timelines with visibility rules applied and viewer-relative engagement flags.",
        contact(
            name = "Chirp Team",
            email = "team@chirp.dev"
        ),
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server"),
    ),
    tags(
        (name = "health", description = "Service health checks"),
        (name = "posts", description = "Feeds, post lifecycle, likes and retweets"),
        (name = "comments", description = "Comments and replies on posts"),
        (name = "users", description = "Profiles and the follow graph"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("HS256 access token; `sub` is the user id"))
                    .build(),
            ),
        );
    }
}

impl ApiDoc {
    pub fn openapi_json_path() -> &'static str {
        "/api/openapi.json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_auth() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["info"]["title"], "Chirp Timeline Service API");
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
