use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::AppState;
use crate::error::{GalynError, Result};
use crate::events::{get_macroevents, load_triplets, triplet_graph, MacroEventLink};
use crate::lynchings::{self, AllegedCrime, StoryDetail, StorySummary, TimemapEntry};
use crate::relations::{self, EventAppearance, FilterChoice, GraphData, RelationFilter, WordCount};

const GRAPH_DATA_URL: &str = "/relations/graph/data";
const TRIPLE_DATA_URL: &str = "/relations/graph/triple-data";
const EVENT_LOOKUP_URL: &str = "/relations/event-lookup";

/// Settings for the force-directed graph page
#[derive(Debug, Serialize)]
pub struct GraphPage {
    pub data_url: &'static str,
    pub event_url: &'static str,
    pub filters: Vec<FilterChoice>,
}

pub async fn health() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "service": "galyn",
        "version": env!("CARGO_PKG_VERSION")
    }))
    .into_response()
}

/// GET /relations/graph - `source=triples` switches the page to triplet data
pub async fn graph_page(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<GraphPage>> {
    let data_url = match params.get("source").map(String::as_str) {
        Some("triples") => TRIPLE_DATA_URL,
        _ => GRAPH_DATA_URL,
    };
    let filters = relations::filter_choices(&state.db, &state.filter_fields).await?;
    Ok(Json(GraphPage {
        data_url,
        event_url: EVENT_LOOKUP_URL,
        filters,
    }))
}

/// GET /relations/graph/data - relationship graph, filtered by any configured field
pub async fn graph_data(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<GraphData>> {
    let filter = RelationFilter::from_params(&state.filter_fields, &params);
    Ok(Json(relations::relationship_graph(&state.db, &filter).await?))
}

/// GET /relations/graph/triple-data - actor graph from semantic triplets
pub async fn graph_triple_data(State(state): State<AppState>) -> Result<Json<GraphData>> {
    let triplets = load_triplets(&state.sparql).await?;
    Ok(Json(triplet_graph(&triplets)))
}

pub async fn cloud_data(State(state): State<AppState>) -> Result<Json<Vec<WordCount>>> {
    Ok(Json(relations::word_cloud(&state.db).await?))
}

/// GET /relations/event-lookup?participant=NAME
pub async fn event_lookup(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<EventAppearance>>> {
    let participant = params.get("participant").ok_or_else(|| {
        GalynError::InvalidInput(
            "Event search requires search terms. Current recognized search terms are: participant"
                .to_string(),
        )
    })?;
    Ok(Json(relations::event_lookup(&state.db, participant).await?))
}

pub async fn story_list(State(state): State<AppState>) -> Result<Json<Vec<StorySummary>>> {
    Ok(Json(lynchings::story_list(&state.db).await?))
}

/// GET /lynchings/story/:story_id/ - target of every story link
pub async fn story_detail(
    State(state): State<AppState>,
    Path(story_id): Path<i64>,
) -> Result<Json<StoryDetail>> {
    Ok(Json(lynchings::story_detail(&state.db, story_id).await?))
}

pub async fn timemap_data(State(state): State<AppState>) -> Result<Json<Vec<TimemapEntry>>> {
    Ok(Json(lynchings::timemap_data(&state.db).await?))
}

pub async fn alleged_crimes(State(state): State<AppState>) -> Result<Json<Vec<AllegedCrime>>> {
    Ok(Json(lynchings::alleged_crimes(&state.db).await?))
}

pub async fn stories_by_accusation(
    State(state): State<AppState>,
    Path(accusation_id): Path<i64>,
) -> Result<Json<Vec<StorySummary>>> {
    Ok(Json(lynchings::stories_by_accusation(&state.db, accusation_id).await?))
}

/// GET /actors/macroevents?uri=INDIVIDUAL_URI
pub async fn actor_macroevents(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<MacroEventLink>>> {
    let uri = params
        .get("uri")
        .filter(|u| !u.is_empty())
        .ok_or_else(|| GalynError::InvalidInput("Actor lookup requires a uri parameter".to_string()))?;
    Ok(Json(get_macroevents(&state.sparql, uri).await?))
}

#[cfg(test)]
mod tests {
    use super::super::{router, AppContext};
    use crate::db::test_support::{insert_relationship, insert_story, migrated_db};
    use crate::error::GalynError;
    use crate::lynchings::test_support::seed_stories;
    use crate::relations::FilterFields;
    use crate::sparql::test_support::{mock_endpoint, results};
    use crate::sparql::SparqlStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use std::time::Duration;
    use tower::ServiceExt; // for oneshot()

    async fn test_app(sparql_response: serde_json::Value) -> (Router, tempfile::TempDir) {
        let (db, temp) = migrated_db().await;
        db.with_connection(|conn| {
            seed_stories(conn)?;
            insert_story(conn, 4, "Newnan mob")?;
            insert_relationship(conn, 4, "mob", "Sam Hose", "angry", ("M", "white", "M", "black"))?;
            insert_relationship(conn, 4, "Sam Hose", "mob", "", ("M", "black", "M", "white"))?;
            insert_relationship(conn, 1, "Mrs. Cranford", "Sam Hose", "", ("F", "white", "M", "black"))?;
            insert_relationship(conn, 1, "", "Sam Hose", "", ("M", "white", "M", "black"))?;
            Ok::<(), GalynError>(())
        })
        .await
        .unwrap();

        let (endpoint, _seen) = mock_endpoint(sparql_response).await;
        let ctx = AppContext {
            db,
            sparql: SparqlStore::new(endpoint, Duration::from_secs(5)).unwrap(),
            filter_fields: FilterFields::default(),
        };
        (router(ctx, &[]), temp)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = get(app, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn empty_results() -> serde_json::Value {
        results(&[], serde_json::json!([]))
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _temp) = test_app(empty_results()).await;
        let (status, json) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_graph_data_unfiltered() {
        let (app, _temp) = test_app(empty_results()).await;
        let (status, json) = get_json(app, "/relations/graph/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({
                "nodes": [
                    {"name": "mob", "value": 2},
                    {"name": "Sam Hose", "value": 3},
                    {"name": "Mrs. Cranford", "value": 1}
                ],
                "links": [
                    {"source": 0, "source_name": "mob", "target": 1, "target_name": "Sam Hose", "value": 2},
                    {"source": 1, "source_name": "Sam Hose", "target": 2, "target_name": "Mrs. Cranford", "value": 1}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_graph_data_filtered_by_subject_gender() {
        let (app, _temp) = test_app(empty_results()).await;
        let (_, json) = get_json(app, "/relations/graph/data?subject_gender=F&object_race=").await;
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["nodes"][0]["name"], "Mrs. Cranford");
        assert_eq!(json["links"][0]["value"], 1);
    }

    #[tokio::test]
    async fn test_graph_page() {
        let (app, _temp) = test_app(empty_results()).await;
        let (_, json) = get_json(app.clone(), "/relations/graph").await;
        assert_eq!(json["data_url"], "/relations/graph/data");
        assert_eq!(json["event_url"], "/relations/event-lookup");
        assert_eq!(json["filters"][0]["name"], "subject gender");
        assert_eq!(json["filters"][0]["values"], serde_json::json!(["F", "M"]));

        let (_, json) = get_json(app, "/relations/graph?source=triples").await;
        assert_eq!(json["data_url"], "/relations/graph/triple-data");
    }

    #[tokio::test]
    async fn test_graph_triple_data() {
        let bindings = serde_json::json!([
            {
                "triplet": {"type": "uri", "value": "urn:tr:1"},
                "role": {"type": "literal", "value": "subject"},
                "participant": {"type": "uri", "value": "urn:p:1"},
                "individual": {"type": "uri", "value": "urn:i:1"},
                "actorname": {"type": "literal", "value": "mob"}
            },
            {
                "triplet": {"type": "uri", "value": "urn:tr:1"},
                "role": {"type": "literal", "value": "object"},
                "participant": {"type": "uri", "value": "urn:p:2"},
                "individual": {"type": "uri", "value": "urn:i:2"},
                "actorname": {"type": "literal", "value": "Sam Hose"}
            }
        ]);
        let (app, _temp) = test_app(results(&["triplet"], bindings)).await;
        let (status, json) = get_json(app, "/relations/graph/triple-data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["links"][0]["source_name"], "mob");
        assert_eq!(json["links"][0]["target_name"], "Sam Hose");
    }

    #[tokio::test]
    async fn test_triple_data_store_down_is_bad_gateway() {
        let (db, _temp) = migrated_db().await;
        let ctx = AppContext {
            db,
            sparql: SparqlStore::new("http://127.0.0.1:9/sparql", Duration::from_secs(1)).unwrap(),
            filter_fields: FilterFields::default(),
        };
        let (status, json) = get_json(router(ctx, &[]), "/relations/graph/triple-data").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].as_str().unwrap().contains("SPARQL"));
    }

    #[tokio::test]
    async fn test_event_lookup_requires_participant() {
        let (app, _temp) = test_app(empty_results()).await;
        let (status, body) = get(app, "/relations/event-lookup").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Event search requires search terms. Current recognized search terms are: participant"
        );
    }

    #[tokio::test]
    async fn test_event_lookup() {
        let (app, _temp) = test_app(empty_results()).await;
        let (status, json) = get_json(app, "/relations/event-lookup?participant=Sam%20Hose").await;
        assert_eq!(status, StatusCode::OK);
        // Both stories mention him twice; ties keep story order
        assert_eq!(json[0]["name"], "Sam Hose");
        assert_eq!(json[0]["url"], "/lynchings/story/1/");
        assert_eq!(json[0]["appearances"], 2);
        assert_eq!(json[1]["url"], "/lynchings/story/4/");
        assert_eq!(json[1]["appearances"], 2);
    }

    #[tokio::test]
    async fn test_cloud_data() {
        let (app, _temp) = test_app(empty_results()).await;
        let (_, json) = get_json(app, "/relations/cloud/data").await;
        assert_eq!(json, serde_json::json!([{"word": "angry", "count": 1}]));
    }

    #[tokio::test]
    async fn test_lynching_endpoints() {
        let (app, _temp) = test_app(empty_results()).await;
        let (_, timemap) = get_json(app.clone(), "/lynchings/timemap/data").await;
        assert_eq!(timemap.as_array().unwrap().len(), 1);

        let (_, crimes) = get_json(app.clone(), "/lynchings/alleged-crimes").await;
        assert_eq!(crimes[1]["label"], "Murder");
        assert_eq!(crimes[1]["stories"], 2);

        let (_, stories) = get_json(app.clone(), "/lynchings/stories").await;
        assert_eq!(stories.as_array().unwrap().len(), 4);

        let (status, unknown) = get_json(app.clone(), "/lynchings/alleged-crimes/99/stories").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(unknown, serde_json::json!([]));

        let (status, by_crime) = get_json(app, "/lynchings/alleged-crimes/2/stories").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_crime[0]["title"], "Nowhere");
    }

    #[tokio::test]
    async fn test_story_links_resolve() {
        let (app, _temp) = test_app(empty_results()).await;
        let (_, timemap) = get_json(app.clone(), "/lynchings/timemap/data").await;
        let detail_link = timemap[0]["options"]["detail_link"].as_str().unwrap().to_string();

        let (status, story) = get_json(app.clone(), &detail_link).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(story["title"], "Sam Hose");
        assert_eq!(story["counties"][0]["label"], "Coweta");
        assert_eq!(story["lynchings"][1]["alleged_crime"], "Murder");
        assert_eq!(story["relationships"].as_array().unwrap().len(), 2);

        let (_, lookup) = get_json(app.clone(), "/relations/event-lookup?participant=mob").await;
        let url = lookup[0]["url"].as_str().unwrap().to_string();
        let (status, story) = get_json(app.clone(), &url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(story["title"], "Newnan mob");

        let (status, _) = get(app, "/lynchings/story/42/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_actor_macroevents_requires_uri() {
        let (app, _temp) = test_app(empty_results()).await;
        let (status, _) = get(app, "/actors/macroevents?uri=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_actor_macroevents_empty() {
        let (app, _temp) = test_app(empty_results()).await;
        let (status, json) =
            get_json(app, "/actors/macroevents?uri=http%3A%2F%2Fgalyn.example.com%2Find%2F7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([]));
    }
}
