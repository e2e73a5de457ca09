use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// Drink
///
/// Represents a drink record from the `drinks` table. The recipe column holds
/// the JSON-encoded ingredient list exactly as stored; it is decoded through
/// the `recipe` codec before leaving the store boundary, never exposed raw.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Drink {
    pub id: i32,
    // Unique, non-empty display name.
    pub title: String,
    // JSON-encoded ingredient array (see `recipe::encode`/`recipe::decode`).
    pub recipe: String,
}

/// Ingredient
///
/// One element of a drink's recipe in its full (long) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: i64,
}

/// IngredientSummary
///
/// The short-form element served to anonymous clients: `parts` is omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct IngredientSummary {
    pub name: String,
    pub color: String,
}

// --- Projections (Output Schemas) ---

/// DrinkDetail
///
/// The long projection: full recipe, for authorized consumption.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct DrinkDetail {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// DrinkSummary
///
/// The short projection: recipe without `parts`, for public consumption.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct DrinkSummary {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<IngredientSummary>,
}

impl Drink {
    /// long
    ///
    /// Decodes the stored recipe into the full projection.
    pub fn long(&self) -> Result<DrinkDetail, serde_json::Error> {
        Ok(DrinkDetail {
            id: self.id,
            title: self.title.clone(),
            recipe: recipe::decode(&self.recipe)?,
        })
    }

    /// short
    ///
    /// Decodes the stored recipe and drops `parts` from every ingredient.
    pub fn short(&self) -> Result<DrinkSummary, serde_json::Error> {
        let recipe = recipe::decode(&self.recipe)?
            .into_iter()
            .map(|ingredient| IngredientSummary {
                name: ingredient.name,
                color: ingredient.color,
            })
            .collect();

        Ok(DrinkSummary {
            id: self.id,
            title: self.title.clone(),
            recipe,
        })
    }
}

/// recipe
///
/// Codec boundary between the stored recipe text and the typed ingredient
/// list: encode on write, decode on read. Handlers and the repository only
/// ever pass the encoded text through; the shape is owned here.
pub mod recipe {
    use super::Ingredient;

    pub fn encode(ingredients: &[Ingredient]) -> Result<String, serde_json::Error> {
        serde_json::to_string(ingredients)
    }

    pub fn decode(raw: &str) -> Result<Vec<Ingredient>, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreateDrinkRequest
///
/// Input payload for POST /drinks. Both fields are optional at the serde
/// level so an absent field reaches the handler as `None` and maps to the
/// 422 envelope rather than a framework rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

/// UpdateDrinkRequest
///
/// Partial update payload for PATCH /drinks/{id}. An absent recipe leaves
/// the stored one untouched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateDrinkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Vec<Ingredient>>,
}

// --- Response Envelopes (Output Schemas) ---

/// DrinkMenuResponse
///
/// Success envelope for GET /drinks (short projections).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DrinkMenuResponse {
    pub success: bool,
    pub drinks: Vec<DrinkSummary>,
}

/// DrinkDetailResponse
///
/// Success envelope for GET /drinks-detail, POST /drinks, and PATCH
/// /drinks/{id}, all of which return the full long-form listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DrinkDetailResponse {
    pub success: bool,
    pub drinks: Vec<DrinkDetail>,
}

/// DeleteDrinkResponse
///
/// Success envelope for DELETE /drinks/{id}: echoes the deleted id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub delete: i32,
}
