use crate::db::models::{NewObject, ObjectId, ObjectSummary, Place, PlaceHit, PlaceId, SearchHit};
use crate::db::schema::{ADMIN_PASSWORD_KEY, SQLITE_INIT};
use crate::error::LotError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub type SqlitePool = Pool<Sqlite>;

/// Open the pool for `database_url`, creating the file on first use.
pub async fn connect(database_url: &str) -> Result<SqlitePool, LotError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    Ok(pool)
}

#[derive(Clone)]
pub struct LedgerStorage {
    pool: SqlitePool,
}

impl LedgerStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create missing tables and seed the admin credential if none exists.
    ///
    /// Safe to run on every start: DDL is conditional and the seed is
    /// `INSERT OR IGNORE`, so an existing credential is never replaced.
    pub async fn ensure_schema(&self, default_hash: &str) -> Result<(), LotError> {
        let mut tx = self.pool.begin().await?;
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&mut *tx).await?;
        }
        let seeded = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(ADMIN_PASSWORD_KEY)
            .bind(default_hash)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if seeded > 0 {
            info!("seeded default admin credential");
        }
        Ok(())
    }

    // ---- credential ----

    /// Stored admin hash; `None` only before `ensure_schema` has run.
    pub async fn get_credential_hash(&self) -> Result<Option<String>, LotError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(ADMIN_PASSWORD_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    /// Overwrite the admin hash. No policy checks happen here.
    pub async fn set_credential_hash(&self, hash: &str) -> Result<(), LotError> {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(hash)
            .bind(ADMIN_PASSWORD_KEY)
            .execute(&self.pool)
            .await?;
        info!("admin credential updated");
        Ok(())
    }

    // ---- places ----

    pub async fn list_places(&self) -> Result<Vec<Place>, LotError> {
        let places = sqlx::query_as::<_, Place>("SELECT id, name FROM places ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(places)
    }

    /// Insert-or-get by trimmed name. Returns the id of the new or existing row.
    pub async fn add_place(&self, name: &str) -> Result<PlaceId, LotError> {
        let name = name.trim();
        let mut tx = self.pool.begin().await?;
        let inserted =
            sqlx::query("INSERT INTO places (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
                .bind(name)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        let rec: (PlaceId,) = sqlx::query_as("SELECT id FROM places WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        if inserted > 0 {
            info!(place_id = rec.0, name, "place created");
        } else {
            debug!(place_id = rec.0, name, "place already present");
        }
        Ok(rec.0)
    }

    /// Exact-match lookup; no trimming or case folding.
    pub async fn find_place_id_by_name(&self, name: &str) -> Result<Option<PlaceId>, LotError> {
        let row: Option<(PlaceId,)> = sqlx::query_as("SELECT id FROM places WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    /// Delete a place only when no registration references it.
    ///
    /// Returns `false`, leaving everything untouched, while the place is in use.
    pub async fn delete_place(&self, id: PlaceId) -> Result<bool, LotError> {
        let mut tx = self.pool.begin().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM objects WHERE place_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            tx.rollback().await?;
            warn!(place_id = id, references = count, "refusing to delete place in use");
            return Ok(false);
        }
        sqlx::query("DELETE FROM places WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(place_id = id, "place deleted");
        Ok(true)
    }

    // ---- objects ----

    /// Exact, case-sensitive match on the (client, car) pair.
    pub async fn object_exists(
        &self,
        client_name: &str,
        car_number: &str,
    ) -> Result<bool, LotError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM objects WHERE client_name = ? AND car_number = ?")
                .bind(client_name)
                .bind(car_number)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    pub async fn insert_object(&self, obj: NewObject) -> Result<ObjectId, LotError> {
        let id = sqlx::query(
            "INSERT INTO objects (client_name, car_number, place_id, image_path)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&obj.client_name)
        .bind(&obj.car_number)
        .bind(obj.place_id)
        .bind(&obj.image_path)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        info!(
            object_id = id,
            place_id = obj.place_id,
            has_image = obj.image_path.is_some(),
            "registration created"
        );
        Ok(id)
    }

    /// Overwrite the car number. Returns whether a row matched `id`.
    pub async fn update_car_number(
        &self,
        id: ObjectId,
        new_number: &str,
    ) -> Result<bool, LotError> {
        let affected = sqlx::query("UPDATE objects SET car_number = ? WHERE id = ?")
            .bind(new_number)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        info!(object_id = id, matched = affected > 0, "car number updated");
        Ok(affected > 0)
    }

    /// Remove the row only; any stored image file stays on disk.
    pub async fn delete_object(&self, id: ObjectId) -> Result<bool, LotError> {
        let affected = sqlx::query("DELETE FROM objects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        info!(object_id = id, matched = affected > 0, "registration deleted");
        Ok(affected > 0)
    }

    pub async fn list_objects(&self) -> Result<Vec<ObjectSummary>, LotError> {
        let rows = sqlx::query_as::<_, ObjectSummary>(
            r#"SELECT o.id, o.client_name, o.car_number, p.name AS place_name
               FROM objects o
               JOIN places p ON o.place_id = p.id
               ORDER BY o.client_name"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ---- search ----

    /// Substring match on client name or car number. ASCII case-insensitive
    /// (SQLite `LIKE`); wildcard characters in `term` match literally.
    pub async fn search_by_client_or_car(&self, term: &str) -> Result<Vec<SearchHit>, LotError> {
        let pattern = like_pattern(term);
        let rows = sqlx::query_as::<_, SearchHit>(
            r#"SELECT o.client_name, o.car_number, p.name AS place_name, o.image_path
               FROM objects o
               JOIN places p ON o.place_id = p.id
               WHERE o.client_name LIKE ? ESCAPE '\' OR o.car_number LIKE ? ESCAPE '\'
               ORDER BY o.id"#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        debug!(hits = rows.len(), "client/car search");
        Ok(rows)
    }

    /// Registrations whose place name contains `term`.
    pub async fn search_by_place(&self, term: &str) -> Result<Vec<PlaceHit>, LotError> {
        let pattern = like_pattern(term);
        let rows = sqlx::query_as::<_, PlaceHit>(
            r#"SELECT o.client_name, o.car_number, o.image_path
               FROM objects o
               JOIN places p ON o.place_id = p.id
               WHERE p.name LIKE ? ESCAPE '\'
               ORDER BY o.id"#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        debug!(hits = rows.len(), "place search");
        Ok(rows)
    }
}

/// Wrap `term` in `%…%`, escaping LIKE metacharacters with `\`.
fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}
