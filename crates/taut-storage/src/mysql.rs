use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use taut_core::error::StoreError;
use taut_core::link::{Link, LinkChange, NewLink};
use taut_core::store::{LinkStore, Result};
use taut_core::time::minute_floor;

/// MySQL implementation of the authoritative store.
///
/// Timestamps are persisted as unix seconds. Deletes are physical; the
/// unique indexes `uniq_links_short_code` and `uniq_links_long_url` are
/// the final arbiter for concurrent creates, so constraint violations
/// are mapped back to the matching duplicate error kind by index name.
#[derive(Debug, Clone)]
pub struct MySqlLinkStore {
    pool: MySqlPool,
}

const LINK_COLUMNS: &str = "id, short_code, long_url, redirect_counter, \
     author_id, created_at, updated_at, expires_at, last_used_at";

impl MySqlLinkStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

/// Attributes a unique violation to the index it tripped. MySQL names
/// the key in the error message ("Duplicate entry ... for key ...").
fn classify_unique_violation(err: &sqlx::Error, link: &NewLink) -> StoreError {
    let message = err
        .as_database_error()
        .map(|db| db.message().to_string())
        .unwrap_or_default();

    if message.contains("uniq_links_long_url") {
        StoreError::DuplicateUrl(link.long_url.clone())
    } else {
        StoreError::DuplicateCode(link.short_code.clone())
    }
}

fn parse_timestamp(seconds: i64, column: &str) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StoreError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn parse_optional_timestamp(seconds: Option<i64>, column: &str) -> Result<Option<Timestamp>> {
    seconds
        .map(|value| parse_timestamp(value, column))
        .transpose()
}

fn row_to_link(row: &MySqlRow) -> Result<Link> {
    let counter: i64 = row.try_get("redirect_counter").map_err(map_sqlx_error)?;
    let redirect_counter = u64::try_from(counter).map_err(|_| {
        StoreError::InvalidData(format!("negative redirect counter: {counter}"))
    })?;

    Ok(Link {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        short_code: row.try_get("short_code").map_err(map_sqlx_error)?,
        long_url: row.try_get("long_url").map_err(map_sqlx_error)?,
        redirect_counter,
        author_id: row.try_get("author_id").map_err(map_sqlx_error)?,
        created_at: parse_timestamp(
            row.try_get("created_at").map_err(map_sqlx_error)?,
            "created_at",
        )?,
        updated_at: parse_timestamp(
            row.try_get("updated_at").map_err(map_sqlx_error)?,
            "updated_at",
        )?,
        expires_at: parse_optional_timestamp(
            row.try_get("expires_at").map_err(map_sqlx_error)?,
            "expires_at",
        )?,
        last_used_at: parse_optional_timestamp(
            row.try_get("last_used_at").map_err(map_sqlx_error)?,
            "last_used_at",
        )?,
    })
}

#[async_trait]
impl LinkStore for MySqlLinkStore {
    async fn get_by_code(&self, code: &str) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ? LIMIT 1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn find_by_urls(&self, candidates: &[String]) -> Result<Option<Link>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let placeholders = vec!["?"; candidates.len()].join(", ");
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE long_url IN ({placeholders}) LIMIT 1"
        );

        let mut query = sqlx::query(&sql);
        for url in candidates {
            query = query.bind(url);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM links WHERE short_code = ? LIMIT 1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }

    async fn url_exists(&self, url: &str) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM links WHERE long_url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }

    async fn insert(&self, link: NewLink) -> Result<Link> {
        let now = minute_floor(Timestamp::now());
        let expires_at = link.expires_at.map(|ts| ts.as_second());

        let result = sqlx::query(
            r#"
            INSERT INTO links
                (short_code, long_url, redirect_counter, author_id,
                 created_at, updated_at, expires_at, last_used_at)
            VALUES (?, ?, 0, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&link.short_code)
        .bind(&link.long_url)
        .bind(link.author_id)
        .bind(now.as_second())
        .bind(now.as_second())
        .bind(expires_at)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(err) if is_unique_violation(&err) => {
                return Err(classify_unique_violation(&err, &link));
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        let id = i64::try_from(result.last_insert_id()).map_err(|_| {
            StoreError::InvalidData(format!(
                "inserted id out of range: {}",
                result.last_insert_id()
            ))
        })?;

        Ok(Link {
            id,
            short_code: link.short_code,
            long_url: link.long_url,
            redirect_counter: 0,
            author_id: link.author_id,
            created_at: now,
            updated_at: now,
            expires_at: link.expires_at,
            last_used_at: None,
        })
    }

    async fn update(&self, code: &str, change: LinkChange) -> Result<Option<Link>> {
        let now = minute_floor(Timestamp::now());
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE links
            SET long_url = ?, expires_at = ?, updated_at = ?
            WHERE short_code = ?
            "#,
        )
        .bind(&change.long_url)
        .bind(change.expires_at.map(|ts| ts.as_second()))
        .bind(now.as_second())
        .bind(code)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::DuplicateUrl(change.long_url.clone())
            } else {
                map_sqlx_error(err)
            }
        })?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ? LIMIT 1"
        ))
        .bind(code)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        row_to_link(&row).map(Some)
    }

    async fn delete(&self, code: &str) -> Result<Option<Link>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ? LIMIT 1"
        ))
        .bind(code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        };
        let link = row_to_link(&row)?;

        sqlx::query("DELETE FROM links WHERE short_code = ?")
            .bind(code)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(link))
    }

    async fn record_redirect(&self, code: &str, at: Timestamp) -> Result<()> {
        // Zero rows affected means the link raced a delete or a sweep;
        // the contract makes that a silent no-op.
        sqlx::query(
            r#"
            UPDATE links
            SET redirect_counter = redirect_counter + 1, last_used_at = ?
            WHERE short_code = ?
            "#,
        )
        .bind(minute_floor(at).as_second())
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Link>> {
        let rows = sqlx::query(&format!("SELECT {LINK_COLUMNS} FROM links"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_link).collect()
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Link>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links \
             WHERE author_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_link).collect()
    }

    async fn delete_outdated(
        &self,
        now: Timestamp,
        inactivity_ttl: SignedDuration,
    ) -> Result<Vec<Link>> {
        let now_s = now.as_second();
        let ttl_limit_s = (now - inactivity_ttl).as_second();

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // FOR UPDATE pins the victims for the transaction, so a
        // concurrent update or redirect cannot refresh a row between
        // this scan and the delete below.
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LINK_COLUMNS} FROM links
            WHERE (expires_at IS NULL
                   AND updated_at < ?
                   AND (last_used_at IS NULL OR last_used_at < ?))
               OR (expires_at IS NOT NULL AND expires_at < ?)
            FOR UPDATE
            "#
        ))
        .bind(ttl_limit_s)
        .bind(ttl_limit_s)
        .bind(now_s)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let links: Vec<Link> = rows.iter().map(row_to_link).collect::<Result<_>>()?;

        if links.is_empty() {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(links);
        }

        let placeholders = vec!["?"; links.len()].join(", ");
        let delete_sql = format!("DELETE FROM links WHERE id IN ({placeholders})");
        let mut delete = sqlx::query(&delete_sql);
        for link in &links {
            delete = delete.bind(link.id);
        }
        delete.execute(&mut *tx).await.map_err(map_sqlx_error)?;

        // One commit for the whole batch: a failure above rolls every
        // deletion back rather than leaving a half-applied sweep.
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(links)
    }
}
