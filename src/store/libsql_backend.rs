//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. File databases hand every
//! background unit its own connection; an in-memory database only exists
//! behind its original connection, so contexts share it.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::matchmaking::model::{
    MentorCandidate, MentorshipSession, NewUser, SessionStatus, Skill, User, UserRole,
};
use crate::store::migrations;
use crate::store::traits::Database;

/// Domain given to skills created implicitly at registration.
const DEFAULT_SKILL_DOMAIN: &str = "Uncategorized";

/// libSQL database backend.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    in_memory: bool,
    /// Serializes transactions on the shared in-memory connection.
    tx_lock: Arc<Mutex<()>>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = connect(&db).await?;
        let backend = Self {
            db: Arc::new(db),
            conn,
            in_memory: false,
            tx_lock: Arc::new(Mutex::new(())),
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
            in_memory: true,
            tx_lock: Arc::new(Mutex::new(())),
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Open by configured path; `:memory:` selects an in-memory database.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        if path == ":memory:" {
            Self::new_memory().await
        } else {
            Self::new_local(Path::new(path)).await
        }
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn skills_for_user(&self, user_id: i64) -> Result<Vec<Skill>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT s.id, s.name, s.domain FROM skills s
                 JOIN user_skills us ON us.skill_id = s.id
                 WHERE us.user_id = ?1
                 ORDER BY s.name",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("skills_for_user: {e}")))?;

        let mut skills = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("skills_for_user: {e}")))?
        {
            skills.push(
                row_to_skill(&row)
                    .map_err(|e| DatabaseError::Query(format!("skills_for_user row parse: {e}")))?,
            );
        }
        Ok(skills)
    }

    /// Run an `UPDATE ... RETURNING` on one session.
    async fn update_session(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<MentorshipSession>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let session = row_to_session(&row)
                    .map_err(|e| DatabaseError::Query(format!("{op} row parse: {e}")))?;
                debug!(session_id = session.id, status = %session.status, "{op}");
                Ok(Some(session))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("{op}: {e}"))),
        }
    }
}

/// Open a connection and apply per-connection pragmas.
async fn connect(db: &LibSqlDatabase) -> Result<Connection, DatabaseError> {
    let conn = db
        .connect()
        .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
    // Concurrent background units write through separate connections.
    conn.query("PRAGMA busy_timeout = 5000", ())
        .await
        .map_err(|e| DatabaseError::Pool(format!("Failed to set busy timeout: {e}")))?;
    Ok(conn)
}

// ── Helper functions ────────────────────────────────────────────────

/// Case-insensitive skill lookup.
async fn select_skill(conn: &Connection, name: &str) -> Result<Option<Skill>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT id, name, domain FROM skills WHERE name = ?1 COLLATE NOCASE",
            params![name.trim()],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("get_skill_by_name: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => {
            let skill = row_to_skill(&row)
                .map_err(|e| DatabaseError::Query(format!("get_skill_by_name row parse: {e}")))?;
            Ok(Some(skill))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(DatabaseError::Query(format!("get_skill_by_name: {e}"))),
    }
}

/// Insert the skill unless a case-insensitive match exists, then load it.
async fn upsert_skill(conn: &Connection, name: &str, domain: &str) -> Result<Skill, DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO skills (name, domain) VALUES (?1, ?2)",
        params![name.trim(), domain],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("get_or_create_skill: {e}")))?;

    select_skill(conn, name)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "skill".to_string(),
            id: name.to_string(),
        })
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

/// Build a LIKE pattern matching `needle` as a literal substring.
fn like_contains(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

fn row_to_skill(row: &libsql::Row) -> Result<Skill, libsql::Error> {
    Ok(Skill {
        id: row.get(0)?,
        name: row.get(1)?,
        domain: row.get::<String>(2).ok(),
    })
}

/// Map a libsql Row to a User without skills.
///
/// Column order matches USER_COLUMNS.
fn row_to_user(row: &libsql::Row) -> Result<User, libsql::Error> {
    let role_str: String = row.get(4)?;
    let created_str: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        hashed_password: row.get(3)?,
        role: role_str.parse().unwrap_or_default(),
        trust_score: row.get(5)?,
        skills: Vec::new(),
        created_at: parse_datetime(&created_str),
    })
}

/// Map a libsql Row to a MentorshipSession.
///
/// Column order matches SESSION_COLUMNS.
fn row_to_session(row: &libsql::Row) -> Result<MentorshipSession, libsql::Error> {
    let status_str: String = row.get(4)?;
    let created_str: String = row.get(8)?;
    let scheduled_str: Option<String> = row.get::<String>(9).ok();
    let updated_str: String = row.get(10)?;

    Ok(MentorshipSession {
        id: row.get(0)?,
        mentee_id: row.get(1)?,
        mentor_id: row.get::<i64>(2).ok(),
        requested_skill_id: row.get(3)?,
        status: status_str.parse().unwrap_or_default(),
        failure_reason: row.get::<String>(5).ok(),
        transcript: row.get::<String>(6).ok(),
        summary: row.get::<String>(7).ok(),
        created_at: parse_datetime(&created_str),
        scheduled_at: parse_optional_datetime(&scheduled_str),
        updated_at: parse_datetime(&updated_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const USER_COLUMNS: &str = "id, username, email, hashed_password, role, trust_score, created_at";

const SESSION_COLUMNS: &str = "id, mentee_id, mentor_id, requested_skill_id, status, failure_reason, transcript, summary, created_at, scheduled_at, updated_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn open_context(&self) -> Result<Arc<dyn Database>, DatabaseError> {
        let conn = if self.in_memory {
            self.conn.clone()
        } else {
            connect(&self.db).await?
        };
        Ok(Arc::new(Self {
            db: Arc::clone(&self.db),
            conn,
            in_memory: self.in_memory,
            tx_lock: Arc::clone(&self.tx_lock),
        }))
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError> {
        // File databases get a private connection so the transaction never
        // captures statements from other handlers.
        let (_guard, conn) = if self.in_memory {
            (Some(self.tx_lock.lock().await), self.conn.clone())
        } else {
            (None, connect(&self.db).await?)
        };
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("create_user begin: {e}")))?;

        let now = Utc::now().to_rfc3339();
        let mut rows = tx
            .query(
                &format!(
                    "INSERT INTO users (username, email, hashed_password, role, trust_score, created_at)
                     VALUES (?1, ?2, ?3, ?4, 50.0, ?5) RETURNING {USER_COLUMNS}"
                ),
                params![
                    user.username.as_str(),
                    user.email.as_str(),
                    user.hashed_password.as_str(),
                    user.role.as_str(),
                    now,
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DatabaseError::Constraint("Username or email already exists.".to_string())
                } else {
                    DatabaseError::Query(format!("create_user: {e}"))
                }
            })?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => {
                return Err(DatabaseError::Query(
                    "create_user: insert returned no row".to_string(),
                ));
            }
            Err(e) if is_unique_violation(&e) => {
                return Err(DatabaseError::Constraint(
                    "Username or email already exists.".to_string(),
                ));
            }
            Err(e) => return Err(DatabaseError::Query(format!("create_user: {e}"))),
        };
        let mut created = row_to_user(&row)
            .map_err(|e| DatabaseError::Query(format!("create_user row parse: {e}")))?;
        drop(rows);

        for name in &user.skills {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let skill = upsert_skill(&tx, name, DEFAULT_SKILL_DOMAIN).await?;
            tx.execute(
                "INSERT OR IGNORE INTO user_skills (user_id, skill_id) VALUES (?1, ?2)",
                params![created.id, skill.id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_user link skill: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("create_user commit: {e}")))?;

        created.skills = self.skills_for_user(created.id).await?;
        debug!(user_id = created.id, role = %created.role, "User inserted into DB");
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user: {e}")))?;

        let mut user = match rows.next().await {
            Ok(Some(row)) => row_to_user(&row)
                .map_err(|e| DatabaseError::Query(format!("get_user row parse: {e}")))?,
            Ok(None) => return Ok(None),
            Err(e) => return Err(DatabaseError::Query(format!("get_user: {e}"))),
        };
        user.skills = self.skills_for_user(user.id).await?;
        Ok(Some(user))
    }

    async fn update_trust_score(&self, id: i64, trust_score: f64) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "UPDATE users SET trust_score = ?1 WHERE id = ?2",
                params![trust_score, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_trust_score: {e}")))?;

        debug!(user_id = id, trust_score, "Trust score updated in DB");
        Ok(count > 0)
    }

    // ── Skills ──────────────────────────────────────────────────────

    async fn get_skill_by_name(&self, name: &str) -> Result<Option<Skill>, DatabaseError> {
        select_skill(self.conn(), name).await
    }

    async fn get_or_create_skill(&self, name: &str, domain: &str) -> Result<Skill, DatabaseError> {
        upsert_skill(self.conn(), name, domain).await
    }

    async fn find_mentors(
        &self,
        skill_name: &str,
        min_trust_score: f64,
        limit: usize,
    ) -> Result<Vec<MentorCandidate>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT DISTINCT u.id, u.username, u.trust_score FROM users u
                 JOIN user_skills us ON us.user_id = u.id
                 JOIN skills s ON s.id = us.skill_id
                 WHERE s.name LIKE ?1 ESCAPE '\\'
                   AND u.role IN (?2, ?3)
                   AND u.trust_score > ?4
                 ORDER BY u.trust_score DESC, u.id ASC
                 LIMIT ?5",
                params![
                    like_contains(skill_name),
                    UserRole::Mentor.as_str(),
                    UserRole::Both.as_str(),
                    min_trust_score,
                    limit as i64,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_mentors: {e}")))?;

        let mut mentors = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("find_mentors: {e}")))?
        {
            mentors.push(MentorCandidate {
                id: row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("find_mentors row parse: {e}")))?,
                username: row
                    .get(1)
                    .map_err(|e| DatabaseError::Query(format!("find_mentors row parse: {e}")))?,
                trust_score: row
                    .get(2)
                    .map_err(|e| DatabaseError::Query(format!("find_mentors row parse: {e}")))?,
            });
        }
        Ok(mentors)
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn create_session(
        &self,
        mentee_id: i64,
        skill_id: i64,
    ) -> Result<MentorshipSession, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let session = self
            .update_session(
                "create_session",
                &format!(
                    "INSERT INTO mentorship_sessions (mentee_id, requested_skill_id, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {SESSION_COLUMNS}"
                ),
                params![mentee_id, skill_id, SessionStatus::Pending.as_str(), now],
            )
            .await?;

        session.ok_or_else(|| {
            DatabaseError::Query("create_session: insert returned no row".to_string())
        })
    }

    async fn get_session(&self, id: i64) -> Result<Option<MentorshipSession>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM mentorship_sessions WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let session = row_to_session(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_session row parse: {e}")))?;
                Ok(Some(session))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_session: {e}"))),
        }
    }

    async fn assign_mentor(
        &self,
        id: i64,
        mentor_id: i64,
    ) -> Result<Option<MentorshipSession>, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.update_session(
            "assign_mentor",
            &format!(
                "UPDATE mentorship_sessions SET mentor_id = ?1, status = ?2, updated_at = ?3
                 WHERE id = ?4 RETURNING {SESSION_COLUMNS}"
            ),
            params![mentor_id, SessionStatus::Matched.as_str(), now, id],
        )
        .await
    }

    async fn mark_session_failed(
        &self,
        id: i64,
        reason: &str,
    ) -> Result<Option<MentorshipSession>, DatabaseError> {
        // A failed session has no mentor.
        let now = Utc::now().to_rfc3339();
        self.update_session(
            "mark_session_failed",
            &format!(
                "UPDATE mentorship_sessions SET status = ?1, failure_reason = ?2, mentor_id = NULL, updated_at = ?3
                 WHERE id = ?4 RETURNING {SESSION_COLUMNS}"
            ),
            params![SessionStatus::Failed.as_str(), reason, now, id],
        )
        .await
    }

    async fn save_session_transcript(
        &self,
        id: i64,
        transcript: &str,
    ) -> Result<Option<MentorshipSession>, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.update_session(
            "save_session_transcript",
            &format!(
                "UPDATE mentorship_sessions SET transcript = ?1, updated_at = ?2
                 WHERE id = ?3 RETURNING {SESSION_COLUMNS}"
            ),
            params![transcript, now, id],
        )
        .await
    }

    async fn save_session_summary(
        &self,
        id: i64,
        summary: &str,
    ) -> Result<Option<MentorshipSession>, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.update_session(
            "save_session_summary",
            &format!(
                "UPDATE mentorship_sessions SET summary = ?1, status = ?2, updated_at = ?3
                 WHERE id = ?4 AND status IN (?5, ?6) RETURNING {SESSION_COLUMNS}"
            ),
            params![
                summary,
                SessionStatus::Completed.as_str(),
                now,
                id,
                SessionStatus::Matched.as_str(),
                SessionStatus::Active.as_str()
            ],
        )
        .await
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn new_user(name: &str, role: UserRole, skills: &[&str]) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@test.com"),
            hashed_password: "hash".to_string(),
            role,
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    async fn mentor_with_score(db: &LibSqlBackend, name: &str, role: UserRole, skills: &[&str], score: f64) -> User {
        let user = db.create_user(&new_user(name, role, skills)).await.unwrap();
        db.update_trust_score(user.id, score).await.unwrap();
        user
    }

    // ── User tests ──────────────────────────────────────────────────

    #[tokio::test]
    async fn create_user_links_and_creates_skills() {
        let db = test_db().await;
        let user = db
            .create_user(&new_user("mentor", UserRole::Mentor, &["Python", "AI"]))
            .await
            .unwrap();

        assert_eq!(user.trust_score, 50.0);
        assert_eq!(user.role, UserRole::Mentor);
        let names: Vec<_> = user.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["AI", "Python"]);
        assert_eq!(user.skills[0].domain.as_deref(), Some("Uncategorized"));
    }

    #[tokio::test]
    async fn create_user_reuses_skill_ignoring_case() {
        let db = test_db().await;
        let a = db
            .create_user(&new_user("a", UserRole::Mentee, &["Python"]))
            .await
            .unwrap();
        let b = db
            .create_user(&new_user("b", UserRole::Mentee, &["python"]))
            .await
            .unwrap();
        assert_eq!(a.skills[0].id, b.skills[0].id);
        assert_eq!(b.skills[0].name, "Python");
    }

    #[tokio::test]
    async fn duplicate_username_is_constraint_error() {
        let db = test_db().await;
        db.create_user(&new_user("dup", UserRole::Mentee, &[]))
            .await
            .unwrap();
        let err = db
            .create_user(&new_user("dup", UserRole::Mentee, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)));
    }

    async fn count(conn: &Connection, sql: &str) -> i64 {
        let mut rows = conn.query(sql, ()).await.unwrap();
        rows.next().await.unwrap().unwrap().get(0).unwrap()
    }

    async fn reject_skill_links(conn: &Connection) {
        conn.execute(
            "CREATE TRIGGER reject_links BEFORE INSERT ON user_skills
             BEGIN SELECT RAISE(ABORT, 'link rejected'); END",
            (),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn failed_skill_link_leaves_nothing_behind() {
        let db = test_db().await;
        reject_skill_links(db.conn()).await;

        let err = db
            .create_user(&new_user("half", UserRole::Mentor, &["Rust", "Go"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Query(_)));

        assert_eq!(count(db.conn(), "SELECT COUNT(*) FROM users").await, 0);
        assert_eq!(count(db.conn(), "SELECT COUNT(*) FROM skills").await, 0);
        assert!(db.get_skill_by_name("Rust").await.unwrap().is_none());

        // The username is free again once the trigger is gone.
        db.conn()
            .execute("DROP TRIGGER reject_links", ())
            .await
            .unwrap();
        let user = db
            .create_user(&new_user("half", UserRole::Mentor, &["Rust"]))
            .await
            .unwrap();
        assert_eq!(user.skills.len(), 1);
    }

    #[tokio::test]
    async fn failed_skill_link_rolls_back_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = LibSqlBackend::new_local(&dir.path().join("tx.db"))
            .await
            .unwrap();
        db.create_user(&new_user("kept", UserRole::Mentee, &["SQL"]))
            .await
            .unwrap();
        reject_skill_links(db.conn()).await;

        assert!(
            db.create_user(&new_user("lost", UserRole::Mentor, &["Rust"]))
                .await
                .is_err()
        );
        assert_eq!(count(db.conn(), "SELECT COUNT(*) FROM users").await, 1);
        assert_eq!(count(db.conn(), "SELECT COUNT(*) FROM skills").await, 1);
    }

    #[tokio::test]
    async fn get_user_not_found() {
        let db = test_db().await;
        assert!(db.get_user(999).await.unwrap().is_none());
        assert!(!db.update_trust_score(999, 10.0).await.unwrap());
    }

    // ── Skill tests ─────────────────────────────────────────────────

    #[tokio::test]
    async fn skill_lookup_is_case_insensitive_exact() {
        let db = test_db().await;
        db.get_or_create_skill("Python", "Programming").await.unwrap();

        let found = db.get_skill_by_name("PYTHON").await.unwrap().unwrap();
        assert_eq!(found.name, "Python");
        assert_eq!(found.domain.as_deref(), Some("Programming"));
        assert!(db.get_skill_by_name("Pyth").await.unwrap().is_none());
        assert!(db.get_skill_by_name("Rust").await.unwrap().is_none());
    }

    // ── Mentor finder tests ─────────────────────────────────────────

    #[tokio::test]
    async fn find_mentors_filters_role_score_and_skill() {
        let db = test_db().await;
        let strong = mentor_with_score(&db, "strong", UserRole::Mentor, &["Python"], 90.0).await;
        let both = mentor_with_score(&db, "both", UserRole::Both, &["Advanced Python"], 70.0).await;
        mentor_with_score(&db, "borderline", UserRole::Mentor, &["Python"], 50.0).await;
        mentor_with_score(&db, "mentee", UserRole::Mentee, &["Python"], 99.0).await;
        mentor_with_score(&db, "rustacean", UserRole::Mentor, &["Rust"], 95.0).await;

        let mentors = db.find_mentors("python", 50.0, 10).await.unwrap();
        let ids: Vec<_> = mentors.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![strong.id, both.id]);
        assert_eq!(mentors[0].username, "strong");
    }

    #[tokio::test]
    async fn find_mentors_lists_each_user_once_and_truncates() {
        let db = test_db().await;
        for i in 0..12 {
            mentor_with_score(
                &db,
                &format!("m{i}"),
                UserRole::Mentor,
                &["Python", "Python Web"],
                60.0 + i as f64,
            )
            .await;
        }

        let mentors = db.find_mentors("Python", 50.0, 10).await.unwrap();
        assert_eq!(mentors.len(), 10);
        assert_eq!(mentors[0].username, "m11");
        let mut ids: Vec<_> = mentors.iter().map(|m| m.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn find_mentors_treats_wildcards_literally() {
        let db = test_db().await;
        mentor_with_score(&db, "m", UserRole::Mentor, &["Python"], 80.0).await;

        assert!(db.find_mentors("%", 50.0, 10).await.unwrap().is_empty());
        assert!(db.find_mentors("Pyth_n", 50.0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_mentors_empty_is_not_an_error() {
        let db = test_db().await;
        assert!(db.find_mentors("Haskell", 50.0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_mentors_reports_unreadable_rows() {
        let db = test_db().await;
        let skill = db.get_or_create_skill("Python", "Programming").await.unwrap();
        // Rebuild users without NOT NULL so a corrupt row can exist.
        for sql in [
            "DROP TABLE users",
            "CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT, email TEXT,
             hashed_password TEXT, role TEXT, trust_score REAL, created_at TEXT)",
            "INSERT INTO users (id, username, role, trust_score) VALUES (1, NULL, 'mentor', 90.0)",
        ] {
            db.conn().execute(sql, ()).await.unwrap();
        }
        db.conn()
            .execute(
                "INSERT INTO user_skills (user_id, skill_id) VALUES (1, ?1)",
                params![skill.id],
            )
            .await
            .unwrap();

        let err = db.find_mentors("Python", 50.0, 10).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query(msg) if msg.contains("find_mentors")));
    }

    // ── Session tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn create_session_is_pending_without_mentor() {
        let db = test_db().await;
        let session = db.create_session(1, 2).await.unwrap();
        assert_eq!(session.status, SessionStatus::Pending);
        assert!(session.mentor_id.is_none());
        assert!(session.failure_reason.is_none());

        let fetched = db.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.mentee_id, 1);
        assert_eq!(fetched.requested_skill_id, 2);
    }

    #[tokio::test]
    async fn get_session_not_found() {
        let db = test_db().await;
        assert!(db.get_session(404).await.unwrap().is_none());
        assert!(db.assign_mentor(404, 1).await.unwrap().is_none());
        assert!(db.mark_session_failed(404, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn assign_mentor_sets_matched() {
        let db = test_db().await;
        let session = db.create_session(1, 1).await.unwrap();
        let updated = db.assign_mentor(session.id, 7).await.unwrap().unwrap();
        assert_eq!(updated.status, SessionStatus::Matched);
        assert_eq!(updated.mentor_id, Some(7));
    }

    #[tokio::test]
    async fn assign_then_fail_last_write_wins() {
        let db = test_db().await;
        let session = db.create_session(1, 1).await.unwrap();

        db.assign_mentor(session.id, 7).await.unwrap();
        db.mark_session_failed(session.id, "late failure").await.unwrap();

        let fetched = db.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::Failed);
        assert_eq!(fetched.failure_reason.as_deref(), Some("late failure"));
        assert!(fetched.mentor_id.is_none());
    }

    #[tokio::test]
    async fn fail_then_assign_last_write_wins() {
        let db = test_db().await;
        let session = db.create_session(1, 1).await.unwrap();

        db.mark_session_failed(session.id, "early failure").await.unwrap();
        db.assign_mentor(session.id, 9).await.unwrap();

        let fetched = db.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::Matched);
        assert_eq!(fetched.mentor_id, Some(9));
    }

    #[tokio::test]
    async fn summary_completes_session() {
        let db = test_db().await;
        let session = db.create_session(1, 1).await.unwrap();
        db.assign_mentor(session.id, 3).await.unwrap();
        db.save_session_transcript(session.id, "we talked").await.unwrap();

        let done = db
            .save_session_summary(session.id, "- topics: async")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.transcript.as_deref(), Some("we talked"));
        assert_eq!(done.summary.as_deref(), Some("- topics: async"));
        assert_eq!(done.mentor_id, Some(3));
    }

    #[tokio::test]
    async fn summary_leaves_unmatched_sessions_alone() {
        let db = test_db().await;
        let pending = db.create_session(1, 1).await.unwrap();
        let failed = db.create_session(1, 1).await.unwrap();
        db.mark_session_failed(failed.id, "no mentors").await.unwrap();

        for id in [pending.id, failed.id] {
            assert!(db.save_session_summary(id, "x").await.unwrap().is_none());
        }

        let pending = db.get_session(pending.id).await.unwrap().unwrap();
        assert_eq!(pending.status, SessionStatus::Pending);
        assert!(pending.summary.is_none());
        let failed = db.get_session(failed.id).await.unwrap().unwrap();
        assert_eq!(failed.status, SessionStatus::Failed);
        assert!(failed.mentor_id.is_none());
    }

    #[tokio::test]
    async fn memory_context_sees_same_data() {
        let db = test_db().await;
        let session = db.create_session(1, 1).await.unwrap();

        let ctx = db.open_context().await.unwrap();
        ctx.assign_mentor(session.id, 5).await.unwrap();

        let fetched = db.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(fetched.mentor_id, Some(5));
    }

    #[tokio::test]
    async fn file_context_uses_new_connection_on_same_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("mentor.db");
        let db = LibSqlBackend::new_local(&path).await.unwrap();
        assert!(path.exists());

        let session = db.create_session(1, 1).await.unwrap();
        let ctx = db.open_context().await.unwrap();
        ctx.mark_session_failed(session.id, "boom").await.unwrap();

        let fetched = db.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::Failed);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_contains("Py"), "%Py%");
        assert_eq!(like_contains("a%b_c"), "%a\\%b\\_c%");
    }
}
