pub mod backend;
pub mod batch;
pub mod runner;
pub mod source;

#[cfg(test)]
mod tests {
    use super::backend::BackendClient;
    use super::batch::{BatchOptions, SessionMode};

    #[test]
    fn validates_backend_base_url() {
        assert!(BackendClient::new("http://localhost:8000").is_ok());
        assert!(BackendClient::new("http://127.0.0.1:8000/").is_ok());
        assert!(BackendClient::new("https://igal.example.ge").is_ok());
        assert!(BackendClient::new("http://[::1]:8000").is_ok());
        assert!(BackendClient::new("http://localhost:8000/backend").is_ok());

        assert!(BackendClient::new("localhost:8000").is_err());
        assert!(BackendClient::new("ftp://localhost").is_err());
        assert!(BackendClient::new("http://").is_err());
        assert!(BackendClient::new("http://:8000").is_err());
        assert!(BackendClient::new("http://localhost:0").is_err());
        assert!(BackendClient::new("http://localhost:99999").is_err());
        assert!(BackendClient::new("http://user@evil.com").is_err());
        assert!(BackendClient::new("http://localhost:8000/?q=1").is_err());
        assert!(BackendClient::new("http://[::1").is_err());
        assert!(BackendClient::new("http://bad host:8000").is_err());
        assert!(BackendClient::new("http://local<host>").is_err());
        assert!(BackendClient::new("http://exa\tmple.com").is_err());
        assert!(BackendClient::new("http://[zz]:80").is_err());
        assert!(BackendClient::new("http://%%%").is_err());
        assert!(BackendClient::new("http://user:pw@localhost").is_err());
        assert!(BackendClient::new("http://localhost#top").is_err());
    }

    #[test]
    fn invalid_base_url_reports_its_code() {
        let err = BackendClient::new("http://bad host:8000").expect_err("invalid");
        assert_eq!(err.code, cgv_core::error::codes::BACKEND_URL_INVALID);
        assert!(err.details.as_deref().is_some_and(|d| d.contains("bad host")));
    }

    #[test]
    fn base_url_keeps_path_prefix_without_trailing_slash() {
        let c = BackendClient::new("http://localhost:8000/backend/").expect("client");
        assert_eq!(c.base_url(), "http://localhost:8000/backend");
        assert_eq!(c.chat_url(), "http://localhost:8000/backend/api/widget/");
        let c = BackendClient::new("http://[::1]:8000").expect("client");
        assert_eq!(c.health_url(), "http://[::1]:8000/health/");
    }

    #[test]
    fn builds_endpoint_urls() {
        let c = BackendClient::new("http://localhost:8000/")
            .expect("client")
            .with_chat_path("api/chat/widget/");
        assert_eq!(c.chat_url(), "http://localhost:8000/api/chat/widget/");
        assert_eq!(c.health_url(), "http://localhost:8000/health/");
    }

    #[test]
    fn session_ids_follow_mode() {
        let mut opts = BatchOptions {
            session_id_prefix: "hallucination_test".to_string(),
            ..Default::default()
        };
        assert_eq!(opts.session_id_for(0), "hallucination_test");
        opts.session_mode = SessionMode::PerQuery;
        assert_eq!(opts.session_id_for(0), "hallucination_test_1");
        assert_eq!(opts.session_id_for(2), "hallucination_test_3");
    }
}
