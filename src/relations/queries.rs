//! Relational queries over `relationships` and `stories`.

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::{GalynError, Result};

use super::{FilterFields, GraphData, RelationFilter, RelationsCollection, RelationshipRecord};

/// One filter drop-down on the graph page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChoice {
    /// Display name, e.g. "subject gender"
    pub name: String,
    /// Request parameter / column, e.g. "subject_gender"
    pub field: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// A story a participant appears in, with how often they appear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAppearance {
    pub url: String,
    pub name: String,
    pub appearances: u64,
}

/// Detail page of a story
pub fn story_url(story_id: i64) -> String {
    format!("/lynchings/story/{}/", story_id)
}

/// Relationship records matching `filter`, in id order.
pub async fn load_relationships(db: &Db, filter: &RelationFilter) -> Result<Vec<RelationshipRecord>> {
    let (where_clause, values) = filter.where_clause();
    let sql = format!(
        "SELECT id, story_id, subject_desc, object_desc FROM relationships{} ORDER BY id",
        where_clause
    );
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), |row| {
                Ok(RelationshipRecord {
                    id: row.get(0)?,
                    story_id: row.get(1)?,
                    subject_desc: row.get(2)?,
                    object_desc: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(rows)
    })
    .await
}

/// Build the relationship graph for all records matching `filter`.
pub async fn relationship_graph(db: &Db, filter: &RelationFilter) -> Result<GraphData> {
    let records = load_relationships(db, filter).await?;

    let mut rels = RelationsCollection::new();
    let accepted = records.iter().filter(|r| rels.add_relationship_object(r)).count();
    log::debug!(
        "Relationship graph: {} records ({} skipped), {} nodes, {} links",
        records.len(),
        records.len() - accepted,
        rels.node_count(),
        rels.link_count()
    );
    Ok(rels.as_graph_data())
}

/// Distinct values of every filter field, sorted, for the graph page.
pub async fn filter_choices(db: &Db, fields: &FilterFields) -> Result<Vec<FilterChoice>> {
    let fields: Vec<String> = fields.iter().map(str::to_string).collect();
    db.with_connection(move |conn| {
        let mut choices = Vec::with_capacity(fields.len());
        for field in fields {
            // Values travel back as query-string filters, and NULL cannot be
            // selected by an equality filter, so it is not offered.
            // Any column type is allowed; values sort by their stored type.
            let mut stmt = conn.prepare(&format!(
                "SELECT CAST(raw AS TEXT) FROM \
                 (SELECT DISTINCT \"{0}\" AS raw FROM relationships WHERE \"{0}\" IS NOT NULL) \
                 ORDER BY raw",
                field
            ))?;
            let values = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            choices.push(FilterChoice {
                name: field.replace('_', " "),
                field,
                values,
            });
        }
        Ok(choices)
    })
    .await
}

/// Frequency of each non-empty subject adjective
pub async fn word_cloud(db: &Db) -> Result<Vec<WordCount>> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT subject_adjective, COUNT(*) FROM relationships \
             WHERE subject_adjective != '' \
             GROUP BY subject_adjective ORDER BY subject_adjective",
        )?;
        let words = stmt
            .query_map([], |row| {
                Ok(WordCount {
                    word: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(words)
    })
    .await
}

/// Stories in which `participant` is a subject or object, most appearances first.
///
/// A relationship naming the participant in both roles counts twice. An empty
/// participant matches every story.
pub async fn event_lookup(db: &Db, participant: &str) -> Result<Vec<EventAppearance>> {
    let participant = participant.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT s.id, s.title, \
               (SELECT COUNT(*) FROM relationships r WHERE r.story_id = s.id AND r.subject_desc = ?1) + \
               (SELECT COUNT(*) FROM relationships r WHERE r.story_id = s.id AND r.object_desc = ?1) \
               AS appearances \
             FROM stories s \
             WHERE ?1 = '' OR EXISTS ( \
               SELECT 1 FROM relationships r \
               WHERE r.story_id = s.id AND (r.subject_desc = ?1 OR r.object_desc = ?1)) \
             ORDER BY appearances DESC, s.id",
        )?;
        let stories = stmt
            .query_map(params![participant], |row| {
                let id: i64 = row.get(0)?;
                Ok(EventAppearance {
                    url: story_url(id),
                    name: row.get(1)?,
                    appearances: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .map_err(GalynError::Database)?;
        Ok(stories)
    })
    .await
}
