//! Test helper functions and fixtures

pub mod test_helpers {
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    use ahub_protocol::Agent;

    use crate::store::StoredSession;

    pub fn create_temp_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp directory")
    }

    pub fn make_agent(
        id: i64,
        name: &str,
        category: &str,
        downloads: u64,
        created_at: &str,
    ) -> Agent {
        Agent {
            id,
            name: name.to_string(),
            description: format!("{} description", name),
            category: category.to_string(),
            author_name: "tester".to_string(),
            user_id: None,
            file_path: format!("uploads/{}/{}.tar.gz", id, id),
            file_size: 1024,
            download_count: downloads,
            created_at: created_at.to_string(),
        }
    }

    pub fn make_owned_agent(id: i64, name: &str, user_id: Option<i64>) -> Agent {
        let mut agent = make_agent(id, name, "tools", 0, "2024-01-01");
        agent.user_id = user_id;
        agent
    }

    pub fn make_session(username: &str, user_id: i64) -> StoredSession {
        let now = Utc::now();
        StoredSession {
            username: username.to_string(),
            user_id,
            access_token: format!("access-{}", username),
            refresh_token: format!("refresh-{}", username),
            access_token_expires_at: now + Duration::minutes(30),
            refresh_token_expires_at: now + Duration::hours(168),
            created_at: now,
            updated_at: now,
        }
    }
}
