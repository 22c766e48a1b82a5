use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Plastic,
    Paper,
    Glass,
    Metal,
    #[serde(rename = "E-Waste")]
    EWaste,
    Organic,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Plastic,
        Category::Paper,
        Category::Glass,
        Category::Metal,
        Category::EWaste,
        Category::Organic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Plastic => "Plastic",
            Category::Paper => "Paper",
            Category::Glass => "Glass",
            Category::Metal => "Metal",
            Category::EWaste => "E-Waste",
            Category::Organic => "Organic",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown category: {s}")))
    }
}

#[derive(Debug, FromRow)]
pub struct RecycleEntryRow {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub weight_kg: f64,
    pub photo_path: Option<String>,
    pub created_at: i64,
}

/// One recycling action. `id` and `created_at` never change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecycleEntry {
    pub id: i64,
    pub user_id: i64,
    pub category: Category,
    pub weight_kg: f64,
    pub photo_path: Option<String>,
    pub created_at: i64, // ms since epoch
}

impl TryFrom<RecycleEntryRow> for RecycleEntry {
    type Error = AppError;

    fn try_from(r: RecycleEntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            category: r.category.parse()?,
            weight_kg: r.weight_kg,
            photo_path: r.photo_path,
            created_at: r.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_display_names() {
        assert_eq!("E-Waste".parse::<Category>().unwrap(), Category::EWaste);
        assert_eq!(" plastic ".parse::<Category>().unwrap(), Category::Plastic);
        assert!("Styrofoam".parse::<Category>().is_err());
        for c in Category::ALL {
            assert_eq!(c.to_string().parse::<Category>().unwrap(), c);
        }
    }

    #[test]
    fn category_serializes_like_the_store() {
        let json = serde_json::to_string(&Category::EWaste).unwrap();
        assert_eq!(json, "\"E-Waste\"");
    }
}
