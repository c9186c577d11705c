//! # PostgreSQL store
//!
//! Maps the relational schema in `migrations/` to the domain models.
//! Writers of a story take a row lock on it (`SELECT ... FOR UPDATE`) inside
//! a transaction, which makes rule evaluation plus insert atomic.

use std::collections::BTreeSet;

use async_trait::async_trait;
use domains::rules::{self, ContributionPolicy, LineDigest};
use domains::validation::{FieldErrors, USERNAME_TAKEN};
use domains::{
    Author, Conflict, Credentials, DomainError, DomainResult, Ledger, NewUser, ProfilePatch,
    Story, StoryId, StoryLine, StoryLineId, StoryQuery, StoryRepository, StoryScope, Toggle, User,
    UserId, UserRepository,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info};

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

const AUTHOR_COLUMNS: &str = "u.id AS author_id, u.username AS author_username, \
     u.first_name AS author_first_name, u.last_name AS author_last_name, \
     a.profile_image AS author_profile_image";

const STORY_SELECT: &str = "SELECT s.id, s.title, s.posted_on, {author}, \
     COALESCE((SELECT array_agg(v.user_id ORDER BY v.user_id) FROM story_votes v \
               WHERE v.story_id = s.id), '{}'::BIGINT[]) AS voters, \
     COALESCE((SELECT array_agg(b.user_id ORDER BY b.user_id) FROM story_blacklist b \
               WHERE b.story_id = s.id), '{}'::BIGINT[]) AS blacklist \
     FROM stories s \
     JOIN authors a ON a.user_id = s.author_id \
     JOIN users u ON u.id = a.user_id";

const LINE_SELECT: &str = "SELECT l.id, l.story_id, l.content, l.posted_on, {author} \
     FROM story_lines l \
     JOIN authors a ON a.user_id = l.author_id \
     JOIN users u ON u.id = a.user_id";

fn story_select() -> String {
    STORY_SELECT.replace("{author}", AUTHOR_COLUMNS)
}

fn line_select() -> String {
    LINE_SELECT.replace("{author}", AUTHOR_COLUMNS)
}

fn db_err(err: sqlx::Error) -> DomainError {
    DomainError::internal(err)
}

fn author_from_row(row: &PgRow) -> Result<Author, sqlx::Error> {
    Ok(Author {
        user: User {
            id: row.try_get("author_id")?,
            username: row.try_get("author_username")?,
            first_name: row.try_get("author_first_name")?,
            last_name: row.try_get("author_last_name")?,
        },
        profile_image: row.try_get("author_profile_image")?,
    })
}

fn story_from_row(row: &PgRow) -> Result<Story, sqlx::Error> {
    let voters: Vec<i64> = row.try_get("voters")?;
    let blacklist: Vec<i64> = row.try_get("blacklist")?;
    Ok(Story {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: author_from_row(row)?,
        posted_on: row.try_get("posted_on")?,
        blacklist: blacklist.into_iter().collect(),
        voters: voters.into_iter().collect(),
    })
}

fn line_from_row(row: &PgRow) -> Result<StoryLine, sqlx::Error> {
    Ok(StoryLine {
        id: row.try_get("id")?,
        story_id: row.try_get("story_id")?,
        content: row.try_get("content")?,
        author: author_from_row(row)?,
        posted_on: row.try_get("posted_on")?,
    })
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates missing tables and indexes.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("database schema is up to date");
        Ok(())
    }

    /// Locks the story row for the rest of the transaction. `None` when the
    /// story does not exist.
    async fn lock_story(
        tx: &mut Transaction<'_, Postgres>,
        story_id: StoryId,
    ) -> DomainResult<Option<UserId>> {
        let row = sqlx::query("SELECT author_id FROM stories WHERE id = $1 FOR UPDATE")
            .bind(story_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?;
        row.map(|row| row.try_get("author_id"))
            .transpose()
            .map_err(db_err)
    }

    /// `(id, author_id, content)` of every line, in narrative order.
    async fn history(
        tx: &mut Transaction<'_, Postgres>,
        story_id: StoryId,
    ) -> DomainResult<Vec<(StoryLineId, UserId, String)>> {
        let rows = sqlx::query(
            "SELECT id, author_id, content FROM story_lines WHERE story_id = $1 ORDER BY id",
        )
        .bind(story_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| Ok((row.try_get("id")?, row.try_get("author_id")?, row.try_get("content")?)))
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(db_err)
    }
}

fn digests(history: &[(StoryLineId, UserId, String)]) -> Vec<LineDigest<'_>> {
    history
        .iter()
        .map(|(_, author_id, content)| LineDigest {
            author_id: *author_id,
            content: content.as_str(),
        })
        .collect()
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> DomainResult<Author> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let inserted = sqlx::query(
            "INSERT INTO users (username, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await;

        let id: UserId = match inserted {
            Ok(row) => row.try_get("id").map_err(db_err)?,
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                let mut errors = FieldErrors::new();
                errors.add("username", USERNAME_TAKEN);
                return Err(DomainError::Validation(errors));
            }
            Err(err) => return Err(db_err(err)),
        };

        sqlx::query("INSERT INTO authors (user_id, profile_image) VALUES ($1, $2)")
            .bind(id)
            .bind(&user.profile_image)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(Author {
            user: User {
                id,
                username: user.username,
                first_name: user.first_name,
                last_name: user.last_name,
            },
            profile_image: user.profile_image,
        })
    }

    async fn find_credentials(&self, username: &str) -> DomainResult<Option<Credentials>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|row| -> Result<Credentials, sqlx::Error> {
            Ok(Credentials {
                user_id: row.try_get("id")?,
                username: row.try_get("username")?,
                password_hash: row.try_get("password_hash")?,
            })
        })
        .transpose()
        .map_err(db_err)
    }

    async fn find_author(&self, user_id: UserId) -> DomainResult<Option<Author>> {
        let sql = format!(
            "SELECT {AUTHOR_COLUMNS} FROM authors a JOIN users u ON u.id = a.user_id WHERE u.id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(author_from_row).transpose().map_err(db_err)
    }

    async fn update_profile(&self, user_id: UserId, patch: ProfilePatch) -> DomainResult<Author> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "UPDATE users SET first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name) WHERE id = $1",
        )
        .bind(user_id)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "UPDATE authors SET profile_image = COALESCE($2, profile_image) WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(patch.profile_image)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        self.find_author(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))
    }
}

#[async_trait]
impl StoryRepository for PgStore {
    async fn create_story(&self, author_id: UserId, title: String) -> DomainResult<Story> {
        let row = sqlx::query("INSERT INTO stories (title, author_id) VALUES ($1, $2) RETURNING id")
            .bind(&title)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    DomainError::user_not_found(author_id)
                }
                err => db_err(err),
            })?;
        let id: StoryId = row.try_get("id").map_err(db_err)?;

        self.find_story(id)
            .await?
            .ok_or_else(|| DomainError::internal(format!("story {id} vanished after insert")))
    }

    async fn find_story(&self, id: StoryId) -> DomainResult<Option<Story>> {
        let sql = format!("{} WHERE s.id = $1", story_select());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(story_from_row).transpose().map_err(db_err)
    }

    async fn list_stories(&self, query: StoryQuery) -> DomainResult<Vec<Story>> {
        let (author, order, limit) = match query.scope {
            StoryScope::All => (None, "s.posted_on DESC, s.id DESC", None),
            StoryScope::AuthoredBy(author) => (Some(author), "s.posted_on DESC, s.id DESC", None),
            StoryScope::Trending { limit } => (
                None,
                "(SELECT count(*) FROM story_votes cv WHERE cv.story_id = s.id) DESC, \
                 s.posted_on DESC, s.id DESC",
                Some(i64::try_from(limit).unwrap_or(i64::MAX)),
            ),
        };

        // LIMIT NULL means no limit.
        let sql = format!(
            "{} WHERE ($1::BIGINT IS NULL OR s.author_id = $1) \
             AND ($2::BIGINT IS NULL OR NOT EXISTS ( \
                 SELECT 1 FROM story_blacklist hb WHERE hb.story_id = s.id AND hb.user_id = $2)) \
             ORDER BY {order} LIMIT $3",
            story_select()
        );

        let rows = sqlx::query(&sql)
            .bind(author)
            .bind(query.hide_from)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(story_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)
    }

    async fn delete_story(&self, id: StoryId) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_lines(&self, story_id: StoryId) -> DomainResult<Vec<StoryLine>> {
        let sql = format!("{} WHERE l.story_id = $1 ORDER BY l.id", line_select());
        let rows = sqlx::query(&sql)
            .bind(story_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(line_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)
    }

    async fn find_line(
        &self,
        story_id: StoryId,
        line_id: StoryLineId,
    ) -> DomainResult<Option<StoryLine>> {
        let sql = format!("{} WHERE l.story_id = $1 AND l.id = $2", line_select());
        let row = sqlx::query(&sql)
            .bind(story_id)
            .bind(line_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(line_from_row).transpose().map_err(db_err)
    }

    async fn append_line(
        &self,
        story_id: StoryId,
        author_id: UserId,
        content: String,
        policy: ContributionPolicy,
    ) -> DomainResult<StoryLine> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if Self::lock_story(&mut tx, story_id).await?.is_none() {
            return Err(DomainError::story_not_found(story_id));
        }

        let blacklist_rows = sqlx::query("SELECT user_id FROM story_blacklist WHERE story_id = $1")
            .bind(story_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;
        let blacklist = blacklist_rows
            .iter()
            .map(|row| row.try_get::<i64, _>("user_id"))
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(db_err)?;

        let history = Self::history(&mut tx, story_id).await?;
        // Dropping `tx` on a rejection rolls back and releases the lock.
        rules::evaluate(&policy, author_id, &content, &blacklist, &digests(&history))?;

        let row = sqlx::query(
            "INSERT INTO story_lines (story_id, author_id, content) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(story_id)
        .bind(author_id)
        .bind(&content)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let line_id: StoryLineId = row.try_get("id").map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        debug!(story_id, line_id, "line appended");

        self.find_line(story_id, line_id)
            .await?
            .ok_or_else(|| DomainError::line_not_found(line_id))
    }

    async fn delete_line(&self, story_id: StoryId, line_id: StoryLineId) -> DomainResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if Self::lock_story(&mut tx, story_id).await?.is_none() {
            return Ok(false);
        }

        let history = Self::history(&mut tx, story_id).await?;
        let Some(index) = history.iter().position(|(id, _, _)| *id == line_id) else {
            return Ok(false);
        };
        if !rules::removal_preserves_alternation(&digests(&history), index) {
            return Err(Conflict::BreaksAlternation.into());
        }

        sqlx::query("DELETE FROM story_lines WHERE id = $1")
            .bind(line_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn update_membership(
        &self,
        story_id: StoryId,
        ledger: Ledger,
        user_id: UserId,
        toggle: Toggle,
    ) -> DomainResult<bool> {
        let table = match ledger {
            Ledger::Votes => "story_votes",
            Ledger::Blacklist => "story_blacklist",
        };

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let author_id = Self::lock_story(&mut tx, story_id)
            .await?
            .ok_or_else(|| DomainError::story_not_found(story_id))?;
        if ledger == Ledger::Blacklist && toggle == Toggle::Add && author_id == user_id {
            return Err(Conflict::SelfBlock.into());
        }

        let sql = match toggle {
            Toggle::Add => format!(
                "INSERT INTO {table} (story_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            ),
            Toggle::Remove => format!("DELETE FROM {table} WHERE story_id = $1 AND user_id = $2"),
        };
        let result = sqlx::query(&sql)
            .bind(story_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    DomainError::user_not_found(user_id)
                }
                err => db_err(err),
            })?;

        tx.commit().await.map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
