use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::{ContentRepository, PreviewLinkRepository, SnapshotRepository};
use crate::content::{ContentEntry, ContentRef, FieldMap};
use crate::error::{CoreError, CoreResult};
use crate::preview::PreviewLink;
use crate::version::{ContentSnapshot, NewSnapshot};

const ENTRY_COLUMNS: &str = "content_type, content_id, fields, slug, is_published, \
    published_at, created_at, updated_at";

const SNAPSHOT_COLUMNS: &str = "id, subject_type, subject_id, version_number, content_data, \
    author_id, change_summary, change_notes, is_published, is_current, published_at, created_at";

const LINK_COLUMNS: &str = "id, content_type, content_id, token, password_hash, message, \
    expires_at, is_active, view_count, created_by, created_at, updated_at";

/// PostgreSQL backend over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct EntryRow {
    content_type: String,
    content_id: i64,
    fields: Json<FieldMap>,
    slug: Option<String>,
    is_published: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for ContentEntry {
    type Error = CoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(ContentEntry {
            content: ContentRef::from_columns(&row.content_type, row.content_id)?,
            fields: row.fields.0,
            slug: row.slug,
            is_published: row.is_published,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: Uuid,
    subject_type: String,
    subject_id: i64,
    version_number: i32,
    content_data: Json<FieldMap>,
    author_id: i64,
    change_summary: Option<String>,
    change_notes: Option<String>,
    is_published: bool,
    is_current: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SnapshotRow> for ContentSnapshot {
    type Error = CoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(ContentSnapshot {
            id: row.id,
            subject: ContentRef::from_columns(&row.subject_type, row.subject_id)?,
            version_number: row.version_number,
            content_data: row.content_data.0,
            author_id: row.author_id,
            change_summary: row.change_summary,
            change_notes: row.change_notes,
            is_published: row.is_published,
            is_current: row.is_current,
            published_at: row.published_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LinkRow {
    id: Uuid,
    content_type: String,
    content_id: i64,
    token: String,
    password_hash: Option<String>,
    message: Option<String>,
    expires_at: DateTime<Utc>,
    is_active: bool,
    view_count: i64,
    created_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LinkRow> for PreviewLink {
    type Error = CoreError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        Ok(PreviewLink {
            id: row.id,
            content: ContentRef::from_columns(&row.content_type, row.content_id)?,
            token: row.token,
            password_hash: row.password_hash,
            message: row.message,
            expires_at: row.expires_at,
            is_active: row.is_active,
            view_count: row.view_count,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> CoreResult<Vec<T>>
where
    T: TryFrom<R, Error = CoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Serialize writers on one subject for the rest of the transaction.
async fn lock_subject(conn: &mut PgConnection, subject: ContentRef) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(subject.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

async fn clear_current(conn: &mut PgConnection, subject: ContentRef) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE content_versions SET is_current = false \
         WHERE subject_type = $1 AND subject_id = $2 AND is_current = true",
    )
    .bind(subject.kind.as_str())
    .bind(subject.id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

async fn upsert_entry(conn: &mut PgConnection, entry: &ContentEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO content_entries
            (content_type, content_id, fields, slug, is_published, published_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (content_type, content_id) DO UPDATE SET
            fields = EXCLUDED.fields,
            slug = EXCLUDED.slug,
            is_published = EXCLUDED.is_published,
            published_at = EXCLUDED.published_at,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(entry.content.kind.as_str())
    .bind(entry.content.id)
    .bind(Json(&entry.fields))
    .bind(&entry.slug)
    .bind(entry.is_published)
    .bind(entry.published_at)
    .bind(entry.created_at)
    .bind(entry.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert `new` with the next version number. Callers hold the subject lock
/// and have already cleared the current flag when `new.is_current`.
async fn insert_version(conn: &mut PgConnection, new: NewSnapshot) -> CoreResult<ContentSnapshot> {
    let subject = new.subject;
    let query = format!(
        "INSERT INTO content_versions
            (id, subject_type, subject_id, version_number, content_data, author_id,
             change_summary, change_notes, is_published, is_current, published_at)
         VALUES ($1, $2, $3,
                 (SELECT COALESCE(MAX(version_number), 0) + 1 FROM content_versions
                  WHERE subject_type = $2 AND subject_id = $3),
                 $4, $5, $6, $7, $8, $9, $10)
         RETURNING {SNAPSHOT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SnapshotRow>(&query)
        .bind(Uuid::now_v7())
        .bind(subject.kind.as_str())
        .bind(subject.id)
        .bind(Json(&new.content_data))
        .bind(new.author_id)
        .bind(&new.change_summary)
        .bind(&new.change_notes)
        .bind(new.is_published)
        .bind(new.is_current)
        .bind(new.published_at)
        .fetch_one(conn)
        .await
        .map_err(|e| insert_error(e, subject))?;
    row.try_into()
}

/// Unique violations on insert mean another writer claimed the number.
fn insert_error(err: sqlx::Error, subject: ContentRef) -> CoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => CoreError::VersionConflict {
            subject: subject.to_string(),
        },
        _ => CoreError::Database(err),
    }
}

#[async_trait]
impl ContentRepository for PgStore {
    async fn find_entry(&self, content: ContentRef) -> CoreResult<Option<ContentEntry>> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM content_entries WHERE content_type = $1 AND content_id = $2"
        );
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(content.kind.as_str())
            .bind(content.id)
            .fetch_optional(&self.pool)
            .await?
            .map(ContentEntry::try_from)
            .transpose()
    }

    async fn save_entry(&self, entry: &ContentEntry) -> CoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_entry(&mut conn, entry).await?;
        Ok(())
    }

    async fn ping(&self) -> CoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for PgStore {
    async fn insert_snapshot(&self, new: NewSnapshot) -> CoreResult<ContentSnapshot> {
        let subject = new.subject;
        let mut tx = self.pool.begin().await?;
        lock_subject(&mut tx, subject).await?;

        if new.is_current {
            clear_current(&mut tx, subject).await?;
        }

        let snapshot = insert_version(&mut tx, new).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    async fn find_snapshot(&self, id: Uuid) -> CoreResult<Option<ContentSnapshot>> {
        let query = format!("SELECT {SNAPSHOT_COLUMNS} FROM content_versions WHERE id = $1");
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ContentSnapshot::try_from)
            .transpose()
    }

    async fn find_by_version(
        &self,
        subject: ContentRef,
        version_number: i32,
    ) -> CoreResult<Option<ContentSnapshot>> {
        let query = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM content_versions
             WHERE subject_type = $1 AND subject_id = $2 AND version_number = $3"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(subject.kind.as_str())
            .bind(subject.id)
            .bind(version_number)
            .fetch_optional(&self.pool)
            .await?
            .map(ContentSnapshot::try_from)
            .transpose()
    }

    async fn list_snapshots(&self, subject: ContentRef) -> CoreResult<Vec<ContentSnapshot>> {
        let query = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM content_versions
             WHERE subject_type = $1 AND subject_id = $2
             ORDER BY version_number DESC"
        );
        let rows = sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(subject.kind.as_str())
            .bind(subject.id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn mark_all_non_current(&self, subject: ContentRef) -> CoreResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Ok(clear_current(&mut conn, subject).await?)
    }

    async fn restore_entry(&self, entry: &ContentEntry, snapshot_id: Uuid) -> CoreResult<bool> {
        let subject = entry.content;
        let mut tx = self.pool.begin().await?;
        lock_subject(&mut tx, subject).await?;

        let updated = sqlx::query(
            "UPDATE content_entries SET
                fields = $3, slug = $4, is_published = $5, published_at = $6, updated_at = $7
             WHERE content_type = $1 AND content_id = $2",
        )
        .bind(subject.kind.as_str())
        .bind(subject.id)
        .bind(Json(&entry.fields))
        .bind(&entry.slug)
        .bind(entry.is_published)
        .bind(entry.published_at)
        .bind(entry.updated_at)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // Two statements: the partial unique index on current rows is
        // checked per row.
        clear_current(&mut tx, subject).await?;
        let marked = sqlx::query(
            "UPDATE content_versions SET is_current = true \
             WHERE id = $1 AND subject_type = $2 AND subject_id = $3",
        )
        .bind(snapshot_id)
        .bind(subject.kind.as_str())
        .bind(subject.id)
        .execute(&mut *tx)
        .await?;
        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn publish_entry(
        &self,
        entry: &ContentEntry,
        new: NewSnapshot,
    ) -> CoreResult<ContentSnapshot> {
        let subject = entry.content;
        let mut tx = self.pool.begin().await?;
        lock_subject(&mut tx, subject).await?;

        upsert_entry(&mut tx, entry).await?;
        if new.is_current {
            clear_current(&mut tx, subject).await?;
        }
        let snapshot = insert_version(&mut tx, new).await?;

        tx.commit().await?;
        Ok(snapshot)
    }
}

#[async_trait]
impl PreviewLinkRepository for PgStore {
    async fn insert_link(&self, link: &PreviewLink) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO preview_links
                (id, content_type, content_id, token, password_hash, message, expires_at,
                 is_active, view_count, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(link.id)
        .bind(link.content.kind.as_str())
        .bind(link.content.id)
        .bind(&link.token)
        .bind(&link.password_hash)
        .bind(&link.message)
        .bind(link.expires_at)
        .bind(link.is_active)
        .bind(link.view_count)
        .bind(link.created_by)
        .bind(link.created_at)
        .bind(link.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> CoreResult<Option<PreviewLink>> {
        let query = format!("SELECT {LINK_COLUMNS} FROM preview_links WHERE token = $1");
        sqlx::query_as::<_, LinkRow>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .map(PreviewLink::try_from)
            .transpose()
    }

    async fn find_link(&self, id: Uuid) -> CoreResult<Option<PreviewLink>> {
        let query = format!("SELECT {LINK_COLUMNS} FROM preview_links WHERE id = $1");
        sqlx::query_as::<_, LinkRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(PreviewLink::try_from)
            .transpose()
    }

    async fn list_links(&self, content: ContentRef) -> CoreResult<Vec<PreviewLink>> {
        let query = format!(
            "SELECT {LINK_COLUMNS} FROM preview_links
             WHERE content_type = $1 AND content_id = $2
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, LinkRow>(&query)
            .bind(content.kind.as_str())
            .bind(content.id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn record_view(&self, id: Uuid) -> CoreResult<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE preview_links SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(count,)| count))
    }

    async fn deactivate_link(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE preview_links SET is_active = false, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_link(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM preview_links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
