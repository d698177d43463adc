//! Product review submission rules.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// A review as submitted by a client. Every field is optional, and `rating`
/// accepts any JSON value, so that a missing or mistyped field is reported
/// as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub product_id: Option<String>,
    pub product_slug: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub rating: Option<serde_json::Value>,
    pub comment: Option<String>,
}

/// A validated review ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub product_id: String,
    pub product_slug: String,
    pub user_name: String,
    pub user_email: String,
    pub rating: i16,
    pub comment: String,
}

impl ReviewSubmission {
    /// Trims text fields and checks that everything is present and the
    /// rating is within `[1, 5]`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingReviewFields`] when any field is
    /// absent or blank, [`ValidationError::RatingNotWholeNumber`] for a
    /// rating that is not an integer, and [`ValidationError::RatingOutOfRange`]
    /// for one outside `[1, 5]`.
    pub fn validate(&self) -> Result<NewReview, ValidationError> {
        let required = |field: &Option<String>| -> Result<String, ValidationError> {
            field
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .ok_or(ValidationError::MissingReviewFields)
        };

        let product_id = required(&self.product_id)?;
        let product_slug = required(&self.product_slug)?;
        let user_name = required(&self.user_name)?;
        let user_email = required(&self.user_email)?;
        let comment = required(&self.comment)?;
        let rating = match &self.rating {
            None | Some(serde_json::Value::Null) => {
                return Err(ValidationError::MissingReviewFields)
            }
            Some(value) => value
                .as_i64()
                .ok_or(ValidationError::RatingNotWholeNumber)?,
        };

        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange(rating));
        }

        Ok(NewReview {
            product_id,
            product_slug,
            user_name,
            user_email: user_email.to_lowercase(),
            rating: i16::try_from(rating).map_err(|_| ValidationError::RatingOutOfRange(rating))?,
            comment,
        })
    }
}

/// Filter for listing reviews. At least one of the two keys must be set;
/// when both are set a review must match both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewQuery {
    #[serde(alias = "productId")]
    pub product_id: Option<String>,
    #[serde(alias = "productSlug")]
    pub product_slug: Option<String>,
}

impl ReviewQuery {
    /// Drops blank keys and rejects a query with neither key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingProductFilter`] when both keys are
    /// absent or blank.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
        };
        let query = Self {
            product_id: clean(self.product_id),
            product_slug: clean(self.product_slug),
        };
        if query.product_id.is_none() && query.product_slug.is_none() {
            return Err(ValidationError::MissingProductFilter);
        }
        Ok(query)
    }
}

/// Aggregate rating shown next to a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub count: usize,
    /// Mean rating rounded to one decimal; `None` when there are no reviews.
    pub average: Option<f64>,
}

impl ReviewSummary {
    #[must_use]
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self {
                count: 0,
                average: None,
            };
        }
        let total: f64 = ratings.iter().map(|&r| f64::from(r)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total / ratings.len() as f64;
        Self {
            count: ratings.len(),
            average: Some((mean * 10.0).round() / 10.0),
        }
    }
}
