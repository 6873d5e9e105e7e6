//! Last-seen repository backing the `seen` command.

use super::DbError;
use sqlx::SqlitePool;

/// The most recent command observed from a nickname.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SeenRecord {
    /// Nickname as it was last written.
    pub display_nick: String,
    pub command: String,
    pub target: String,
    pub seen_at: i64,
}

pub struct SeenRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SeenRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record that `nickname` ran `command` in `target` at `seen_at`.
    pub async fn touch(
        &self,
        nickname: &str,
        command: &str,
        target: &str,
        seen_at: i64,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO seen (nickname, display_nick, command, target, seen_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (nickname) DO UPDATE SET
                display_nick = excluded.display_nick,
                command = excluded.command,
                target = excluded.target,
                seen_at = excluded.seen_at
            "#,
        )
        .bind(straybot_proto::irc_to_lower(nickname))
        .bind(nickname)
        .bind(command)
        .bind(target)
        .bind(seen_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Look up a nickname, case-insensitively.
    pub async fn find(&self, nickname: &str) -> Result<Option<SeenRecord>, DbError> {
        let record = sqlx::query_as::<_, SeenRecord>(
            "SELECT display_nick, command, target, seen_at FROM seen WHERE nickname = ?",
        )
        .bind(straybot_proto::irc_to_lower(nickname))
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn touch_overwrites_previous_sighting() {
        let db = Database::new(":memory:").await.unwrap();
        let seen = db.seen();

        seen.touch("Bob", "about", "#bots", 100).await.unwrap();
        seen.touch("bob", "stats", "#hockey", 200).await.unwrap();

        let record = seen.find("BOB").await.unwrap().unwrap();
        assert_eq!(record.display_nick, "bob");
        assert_eq!(record.command, "stats");
        assert_eq!(record.target, "#hockey");
        assert_eq!(record.seen_at, 200);
        assert!(seen.find("alice").await.unwrap().is_none());
    }
}
