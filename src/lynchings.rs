//! Lynching stories: timemap points, alleged-crime summaries and story lists.

use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::{GalynError, Result};
use crate::relations::{story_url, RelationshipRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimemapOptions {
    pub detail_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alleged_crime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// One timemap item. Only items with both `start` and `point` are published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimemapEntry {
    pub title: String,
    pub options: TimemapOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllegedCrime {
    pub id: i64,
    pub label: String,
    /// Number of lynchings citing this accusation
    pub stories: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: i64,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryCounty {
    pub id: i64,
    pub label: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryLynching {
    pub id: i64,
    /// `YYYY-MM-DD`, absent when unknown or unreadable
    pub date: Option<String>,
    pub alleged_crime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDetail {
    pub id: i64,
    pub title: String,
    /// In the story's county order
    pub counties: Vec<StoryCounty>,
    pub lynchings: Vec<StoryLynching>,
    pub relationships: Vec<RelationshipRecord>,
}

/// Zero-padded `YYYY-MM-DD`, valid for years before 1900 as well.
fn format_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

fn story_timemap_entry(conn: &Connection, story_id: i64, title: String) -> Result<TimemapEntry> {
    let mut entry = TimemapEntry {
        title,
        options: TimemapOptions {
            detail_link: story_url(story_id),
            ..Default::default()
        },
        point: None,
        start: None,
    };

    let county: Option<(String, Option<f64>, Option<f64>)> = conn
        .prepare_cached(
            "SELECT c.label, c.latitude, c.longitude \
             FROM story_counties sc JOIN counties c ON c.id = sc.county_id \
             WHERE sc.story_id = ?1 ORDER BY sc.position, c.id LIMIT 1",
        )?
        .query_row(params![story_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .optional()?;
    if let Some((label, lat, lon)) = county {
        entry.options.county = Some(label);
        if let (Some(lat), Some(lon)) = (lat, lon) {
            entry.point = Some(Point { lat, lon });
        }
    }

    // All lynchings of a story share the same accusation (or none)
    entry.options.alleged_crime = conn
        .prepare_cached(
            "SELECT a.label FROM lynchings l JOIN accusations a ON a.id = l.alleged_crime_id \
             WHERE l.story_id = ?1 ORDER BY l.id LIMIT 1",
        )?
        .query_row(params![story_id], |row| row.get(0))
        .optional()?;

    let dates: Vec<String> = conn
        .prepare_cached(
            "SELECT date FROM lynchings WHERE story_id = ?1 AND date IS NOT NULL AND date != '' ORDER BY id",
        )?
        .query_map(params![story_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    let first_date = dates.iter().find_map(|raw| match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            log::warn!("Story {} has an unreadable lynching date {:?}: {}", story_id, raw, e);
            None
        }
    });
    if let Some(date) = first_date {
        let date_str = format_date(date);
        entry.options.date = Some(date_str.clone());
        entry.start = Some(date_str);
    }

    Ok(entry)
}

/// Timemap items for every story that has both a date and a located county.
pub async fn timemap_data(db: &Db) -> Result<Vec<TimemapEntry>> {
    db.with_connection(|conn| {
        let stories: Vec<(i64, String)> = conn
            .prepare("SELECT id, title FROM stories ORDER BY id")?
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let total = stories.len();
        let mut entries = Vec::with_capacity(total);
        for (id, title) in stories {
            let entry = story_timemap_entry(conn, id, title)?;
            if entry.start.is_some() && entry.point.is_some() {
                entries.push(entry);
            }
        }
        log::debug!("Timemap: {} of {} stories placed", entries.len(), total);
        Ok(entries)
    })
    .await
}

/// Every accusation with the number of lynchings citing it.
pub async fn alleged_crimes(db: &Db) -> Result<Vec<AllegedCrime>> {
    db.with_connection(|conn| {
        let crimes = conn
            .prepare(
                "SELECT a.id, a.label, COUNT(l.id) FROM accusations a \
                 LEFT JOIN lynchings l ON l.alleged_crime_id = a.id \
                 GROUP BY a.id, a.label ORDER BY a.label",
            )?
            .query_map([], |row| {
                Ok(AllegedCrime {
                    id: row.get(0)?,
                    label: row.get(1)?,
                    stories: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(crimes)
    })
    .await
}

fn story_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<StorySummary> {
    let id: i64 = row.get(0)?;
    Ok(StorySummary {
        id,
        title: row.get(1)?,
        url: story_url(id),
    })
}

/// All stories in id order
pub async fn story_list(db: &Db) -> Result<Vec<StorySummary>> {
    db.with_connection(|conn| {
        let stories = conn
            .prepare("SELECT id, title FROM stories ORDER BY id")?
            .query_map([], story_summary)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(stories)
    })
    .await
}

/// Stories with at least one lynching attributed to `accusation_id`.
/// An unknown accusation simply has no stories.
pub async fn stories_by_accusation(db: &Db, accusation_id: i64) -> Result<Vec<StorySummary>> {
    db.with_connection(move |conn| {
        let stories = conn
            .prepare(
                "SELECT DISTINCT s.id, s.title FROM stories s \
                 JOIN lynchings l ON l.story_id = s.id \
                 WHERE l.alleged_crime_id = ?1 ORDER BY s.id",
            )?
            .query_map(params![accusation_id], story_summary)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(stories)
    })
    .await
}

/// Full record of one story, served at its detail link.
pub async fn story_detail(db: &Db, story_id: i64) -> Result<StoryDetail> {
    db.with_connection(move |conn| {
        let title: String = conn
            .query_row("SELECT title FROM stories WHERE id = ?1", params![story_id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| GalynError::NotFound(format!("story {}", story_id)))?;

        let counties = conn
            .prepare(
                "SELECT c.id, c.label, c.latitude, c.longitude \
                 FROM story_counties sc JOIN counties c ON c.id = sc.county_id \
                 WHERE sc.story_id = ?1 ORDER BY sc.position, c.id",
            )?
            .query_map(params![story_id], |row| {
                Ok(StoryCounty {
                    id: row.get(0)?,
                    label: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let lynchings = conn
            .prepare(
                "SELECT l.id, l.date, a.label FROM lynchings l \
                 LEFT JOIN accusations a ON a.id = l.alleged_crime_id \
                 WHERE l.story_id = ?1 ORDER BY l.id",
            )?
            .query_map(params![story_id], |row| {
                let raw: Option<String> = row.get(1)?;
                Ok(StoryLynching {
                    id: row.get(0)?,
                    date: raw
                        .as_deref()
                        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                        .map(format_date),
                    alleged_crime: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let relationships = conn
            .prepare(
                "SELECT id, story_id, COALESCE(subject_desc, ''), COALESCE(object_desc, '') \
                 FROM relationships WHERE story_id = ?1 ORDER BY id",
            )?
            .query_map(params![story_id], |row| {
                Ok(RelationshipRecord {
                    id: row.get(0)?,
                    story_id: row.get(1)?,
                    subject_desc: row.get(2)?,
                    object_desc: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        Ok(StoryDetail {
            id: story_id,
            title,
            counties,
            lynchings,
            relationships,
        })
    })
    .await
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_db;

    async fn seeded_db() -> (Db, tempfile::TempDir) {
        let (db, temp) = migrated_db().await;
        db.with_connection(|conn| test_support::seed_stories(conn)).await.unwrap();
        (db, temp)
    }

    #[test]
    fn test_format_date_pre_1900() {
        let date = NaiveDate::from_ymd_opt(1877, 3, 9).unwrap();
        assert_eq!(format_date(date), "1877-03-09");
    }

    #[tokio::test]
    async fn test_timemap_only_placed_and_dated_stories() {
        let (db, _temp) = seeded_db().await;
        let entries = timemap_data(&db).await.unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.title, "Sam Hose");
        assert_eq!(entry.start.as_deref(), Some("1899-04-23"));
        assert_eq!(entry.options.date.as_deref(), Some("1899-04-23"));
        assert_eq!(entry.options.county.as_deref(), Some("Coweta"));
        assert_eq!(entry.options.alleged_crime.as_deref(), Some("Murder"));
        assert_eq!(entry.options.detail_link, "/lynchings/story/1/");
        assert_eq!(entry.point, Some(Point { lat: 33.35, lon: -84.76 }));
    }

    #[tokio::test]
    async fn test_timemap_json_shape() {
        let (db, _temp) = seeded_db().await;
        let json = serde_json::to_value(timemap_data(&db).await.unwrap()).unwrap();
        assert_eq!(json[0]["point"]["lat"], 33.35);
        assert_eq!(json[0]["options"]["detail_link"], "/lynchings/story/1/");
        assert_eq!(json[0]["start"], "1899-04-23");
    }

    #[tokio::test]
    async fn test_timemap_skips_county_without_coordinates() {
        let (db, _temp) = seeded_db().await;
        db.with_connection(|conn| {
            crate::db::test_support::insert_story(conn, 5, "Unmapped county")?;
            conn.execute_batch(
                "INSERT INTO counties (id, label, latitude, longitude) VALUES (3, 'Unknown', NULL, -83.1);
                 INSERT INTO story_counties (story_id, county_id, position) VALUES (5, 3, 0);
                 INSERT INTO lynchings (id, story_id, date, alleged_crime_id) VALUES (5, 5, '1885-07-02', 1);",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let entries = timemap_data(&db).await.unwrap();
        assert!(entries.iter().all(|e| e.title != "Unmapped county"));
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_alleged_crimes_counts() {
        let (db, _temp) = seeded_db().await;
        let crimes = alleged_crimes(&db).await.unwrap();
        let counts: Vec<(&str, u64)> = crimes.iter().map(|c| (c.label.as_str(), c.stories)).collect();
        assert_eq!(counts, vec![("Arson", 1), ("Murder", 2), ("Theft", 0)]);
    }

    #[tokio::test]
    async fn test_stories_by_accusation() {
        let (db, _temp) = seeded_db().await;
        let stories = stories_by_accusation(&db, 1).await.unwrap();
        let ids: Vec<i64> = stories.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(stories_by_accusation(&db, 3).await.unwrap().is_empty());
        assert!(stories_by_accusation(&db, 99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_story_detail() {
        let (db, _temp) = seeded_db().await;
        db.with_connection(|conn| {
            crate::db::test_support::insert_relationship(
                conn, 1, "mob", "Sam Hose", "", ("M", "white", "M", "black"),
            )
        })
        .await
        .unwrap();

        let story = story_detail(&db, 1).await.unwrap();
        assert_eq!(story.title, "Sam Hose");
        let counties: Vec<&str> = story.counties.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(counties, vec!["Coweta", "Fulton"]);
        assert_eq!(story.lynchings.len(), 2);
        assert_eq!(story.lynchings[0].date, None);
        assert_eq!(story.lynchings[0].alleged_crime, None);
        assert_eq!(story.lynchings[1].date.as_deref(), Some("1899-04-23"));
        assert_eq!(story.lynchings[1].alleged_crime.as_deref(), Some("Murder"));
        assert_eq!(story.relationships.len(), 1);
        assert_eq!(story.relationships[0].object_desc, "Sam Hose");
    }

    #[tokio::test]
    async fn test_story_detail_unknown_story() {
        let (db, _temp) = seeded_db().await;
        assert!(matches!(story_detail(&db, 42).await, Err(GalynError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_story_list() {
        let (db, _temp) = seeded_db().await;
        let stories = story_list(&db).await.unwrap();
        assert_eq!(stories.len(), 3);
        assert_eq!(stories[2].url, "/lynchings/story/3/");
    }
}
