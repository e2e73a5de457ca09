use crate::models::Drink;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Repository Trait
///
/// Defines the abstract contract for all drink persistence operations,
/// allowing the handlers to interact with the data layer without knowing the
/// concrete implementation (Postgres in production, an in-memory mock in
/// tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task
/// boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    /// All rows, no ordering guaranteed. Database errors are logged and
    /// degrade to an empty list; the public menu endpoint has no failure mode.
    async fn list_drinks(&self) -> Vec<Drink>;

    /// Inserts a new drink. The `recipe` argument is the already-encoded
    /// text. A uniqueness violation on `title` (or any other constraint
    /// failure) surfaces as the error for the caller to map.
    async fn insert_drink(&self, title: &str, recipe: &str) -> Result<Drink, sqlx::Error>;

    /// Replaces the stored recipe when one is provided; `None` keeps the
    /// stored value. `Ok(None)` means no row with that id exists.
    async fn update_drink_recipe(
        &self,
        id: i32,
        recipe: Option<&str>,
    ) -> Result<Option<Drink>, sqlx::Error>;

    /// Removes a drink. `Ok(false)` means no row with that id exists.
    async fn delete_drink(&self, id: i32) -> Result<bool, sqlx::Error>;

    /// Drops and recreates the `drinks` table, then seeds the sample drink.
    /// Destructive; run once at process startup.
    async fn reset_schema(&self) -> Result<(), sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_drinks(&self) -> Vec<Drink> {
        match sqlx::query_as::<_, Drink>("SELECT id, title, recipe FROM drinks")
            .fetch_all(&self.pool)
            .await
        {
            Ok(drinks) => drinks,
            Err(e) => {
                tracing::error!("list_drinks error: {:?}", e);
                vec![]
            }
        }
    }

    async fn insert_drink(&self, title: &str, recipe: &str) -> Result<Drink, sqlx::Error> {
        sqlx::query_as::<_, Drink>(
            "INSERT INTO drinks (title, recipe) VALUES ($1, $2) RETURNING id, title, recipe",
        )
        .bind(title)
        .bind(recipe)
        .fetch_one(&self.pool)
        .await
    }

    /// update_drink_recipe
    ///
    /// Uses `COALESCE` so a patch without a recipe persists the row unchanged,
    /// while `RETURNING` doubles as the existence check: no returned row means
    /// no drink with that id.
    async fn update_drink_recipe(
        &self,
        id: i32,
        recipe: Option<&str>,
    ) -> Result<Option<Drink>, sqlx::Error> {
        sqlx::query_as::<_, Drink>(
            "UPDATE drinks SET recipe = COALESCE($2, recipe) WHERE id = $1 \
             RETURNING id, title, recipe",
        )
        .bind(id)
        .bind(recipe)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_drink(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM drinks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// reset_schema
    ///
    /// The destructive startup reset. Any existing `drinks` table is dropped
    /// and rebuilt, with one sample drink seeded so a fresh instance serves a
    /// non-empty menu.
    async fn reset_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DROP TABLE IF EXISTS drinks")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE drinks (\
                id SERIAL PRIMARY KEY, \
                title TEXT UNIQUE NOT NULL, \
                recipe TEXT NOT NULL\
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
            .bind("water")
            .bind(r#"[{"name": "water", "color": "blue", "parts": 1}]"#)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
