//! Parsing and validation of the entry form.
//!
//! The form arrives as raw strings so a rejected submission can be echoed back unchanged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::{EntryFields, EntryRow};
use crate::error::DiaryError;

pub const TITLE_MAX_CHARS: usize = 100;
pub const TAG_MAX_CHARS: usize = 50;
pub const MOOD_MIN: i32 = 1;
pub const MOOD_MAX: i32 = 10;

/// Fields of the new/edit entry form, as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// `YYYY-MM-DD`; blank means today.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub mood_rating: String,
    /// Comma-separated tag names.
    #[serde(default)]
    pub tags: String,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEntry {
    pub fields: EntryFields,
    pub tag_names: Vec<String>,
}

impl EntryForm {
    /// Blank form for a new entry, dated `today`.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            date: today.format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    /// Pre-filled form for editing an existing entry.
    pub fn from_entry(entry: &EntryRow) -> Self {
        Self {
            title: entry.title.clone(),
            content: entry.content.clone(),
            date: entry.date.format("%Y-%m-%d").to_string(),
            mood_rating: entry.mood_rating.to_string(),
            tags: entry.tag_list(),
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<ValidEntry, DiaryError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(DiaryError::InvalidInput("Title is required".to_owned()));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(DiaryError::InvalidInput(format!(
                "Title must be at most {TITLE_MAX_CHARS} characters"
            )));
        }

        let date = if self.date.trim().is_empty() {
            today
        } else {
            parse_date(&self.date)?
        };

        Ok(ValidEntry {
            fields: EntryFields {
                title: title.to_owned(),
                content: self.content.clone(),
                date,
                mood_rating: parse_mood_rating(&self.mood_rating)?,
            },
            tag_names: parse_tag_names(&self.tags)?,
        })
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DiaryError> {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_formed {
        return Err(DiaryError::InvalidDate(raw.to_owned()));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| DiaryError::InvalidDate(raw.to_owned()))
}

pub fn parse_mood_rating(raw: &str) -> Result<i32, DiaryError> {
    match raw.trim().parse::<i32>() {
        Ok(rating) if (MOOD_MIN..=MOOD_MAX).contains(&rating) => Ok(rating),
        _ => Err(DiaryError::InvalidRating(raw.to_owned())),
    }
}

/// Split on commas, trim, drop blanks and collapse repeats, keeping first-seen order.
pub fn parse_tag_names(raw: &str) -> Result<Vec<String>, DiaryError> {
    let mut names: Vec<String> = Vec::new();

    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if name.chars().count() > TAG_MAX_CHARS {
            return Err(DiaryError::InvalidInput(format!(
                "Tag '{name}' must be at most {TAG_MAX_CHARS} characters"
            )));
        }
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_owned());
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn form(title: &str, date: &str, mood: &str, tags: &str) -> EntryForm {
        EntryForm {
            title: title.to_owned(),
            content: "Went for a walk.".to_owned(),
            date: date.to_owned(),
            mood_rating: mood.to_owned(),
            tags: tags.to_owned(),
        }
    }

    #[test]
    fn valid_form_produces_fields_and_tags() {
        let valid = form("Walk", "2024-01-05", "4", "happy, calm")
            .validate(day("2024-06-01"))
            .unwrap();

        assert_eq!(valid.fields.title, "Walk");
        assert_eq!(valid.fields.date, day("2024-01-05"));
        assert_eq!(valid.fields.mood_rating, 4);
        assert_eq!(valid.tag_names, ["happy", "calm"]);
    }

    #[test]
    fn blank_date_defaults_to_today() {
        let valid = form("Walk", "  ", "5", "")
            .validate(day("2024-06-01"))
            .unwrap();
        assert_eq!(valid.fields.date, day("2024-06-01"));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        for raw in ["2024-13-01", "2024-02-30", "01/05/2024", "2024-1-5", "yesterday"] {
            assert!(
                matches!(parse_date(raw), Err(DiaryError::InvalidDate(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn mood_must_be_integer_in_range() {
        assert_eq!(parse_mood_rating("1").unwrap(), 1);
        assert_eq!(parse_mood_rating(" 10 ").unwrap(), 10);
        for raw in ["0", "11", "-3", "7.5", "great", ""] {
            assert!(matches!(
                parse_mood_rating(raw),
                Err(DiaryError::InvalidRating(_))
            ));
        }
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_tag_names(" work ,, home,work, Work ,").unwrap(),
            ["work", "home", "Work"]
        );
        assert!(parse_tag_names("").unwrap().is_empty());
        assert!(parse_tag_names(&"x".repeat(TAG_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn title_is_required_and_bounded() {
        let today = day("2024-06-01");
        assert!(matches!(
            form("   ", "", "5", "").validate(today),
            Err(DiaryError::InvalidInput(_))
        ));
        assert!(
            form(&"t".repeat(TITLE_MAX_CHARS + 1), "", "5", "")
                .validate(today)
                .is_err()
        );
        assert!(
            form(&"t".repeat(TITLE_MAX_CHARS), "", "5", "")
                .validate(today)
                .is_ok()
        );
    }

    #[test]
    fn blank_form_carries_today() {
        assert_eq!(EntryForm::blank(day("2024-06-01")).date, "2024-06-01");
    }
}
