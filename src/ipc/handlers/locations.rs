use crate::csv;
use crate::import::hierarchy::{import_locations, LocationRow, TierSnapshots};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    csv_input, db_conn, import_err, optional_str, required_str, sample_response, store_err,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Tier;
use crate::store::{SqliteStore, Store};
use serde_json::json;
use tracing::info;

fn handle_locations_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!(TierSnapshots::default()));
    };
    match TierSnapshots::load(&SqliteStore::new(conn)) {
        Ok(tiers) => ok(&req.id, json!(tiers)),
        Err(e) => store_err(req, "db_query_failed", e),
    }
}

/// Explicit single add. Unlike the bulk path, an existing name in the same scope is an error.
fn handle_create_node(state: &mut AppState, req: &Request, tier: Tier) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let parent_id = match tier {
        Tier::Province => None,
        Tier::District => match required_str(req, "provinceId") {
            Ok(v) => Some(v),
            Err(e) => return e,
        },
        Tier::Municipality => match required_str(req, "districtId") {
            Ok(v) => Some(v),
            Err(e) => return e,
        },
    };

    let mut store = SqliteStore::new(conn);
    if let (Some(parent_tier), Some(pid)) = (tier.parent(), parent_id.as_deref()) {
        match store.read_nodes(parent_tier) {
            Ok(parents) if parents.iter().any(|p| p.id == pid) => {}
            Ok(_) => {
                return err(
                    &req.id,
                    "not_found",
                    format!("{} not found", parent_tier.as_str()),
                    None,
                )
            }
            Err(e) => return store_err(req, "db_query_failed", e),
        }
    }

    let siblings = match store.read_nodes(tier) {
        Ok(v) => v,
        Err(e) => return store_err(req, "db_query_failed", e),
    };
    if siblings
        .iter()
        .any(|n| n.name == name && n.parent_id.as_deref() == parent_id.as_deref())
    {
        return err(
            &req.id,
            "duplicate",
            format!("{} already exists: {}", tier.as_str(), name),
            None,
        );
    }

    match store.create_node(tier, &name, parent_id.as_deref()) {
        Ok(id) => ok(
            &req.id,
            json!({ "id": id, "name": name, "parentId": parent_id }),
        ),
        Err(e) => store_err(req, "db_insert_failed", e),
    }
}

fn handle_locations_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(tier) = optional_str(req, "tier").and_then(|t| Tier::parse(&t)) else {
        return err(
            &req.id,
            "bad_params",
            "tier must be one of: province, district, municipality",
            None,
        );
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match SqliteStore::new(conn).delete_node(tier, &id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => store_err(req, "db_delete_failed", e),
    }
}

fn handle_locations_import_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let text = match csv_input(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let table = csv::parse_table(&text);
    let missing = table.missing_headers(&csv::LOCATION_HEADERS);
    if !missing.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "csv is missing required columns",
            Some(json!({ "missing": missing })),
        );
    }
    let rows = table
        .rows
        .iter()
        .map(LocationRow::from_csv)
        .collect::<Vec<_>>();

    let mut store = SqliteStore::new(conn);
    let snapshots = match TierSnapshots::load(&store) {
        Ok(v) => v,
        Err(e) => return store_err(req, "db_query_failed", e),
    };
    let result = match import_locations(&mut store, &snapshots, &rows) {
        Ok(v) => v,
        Err(e) => return import_err(req, "Failed to process bulk upload", e),
    };

    let tiers = match TierSnapshots::load(&store) {
        Ok(v) => v,
        Err(e) => return store_err(req, "db_query_failed", e),
    };
    info!(rows = rows.len(), "locations.importCsv done");

    ok(
        &req.id,
        json!({
            "acceptedCount": result.summary.accepted_count,
            "errorCount": result.summary.error_count,
            "truncated": result.summary.truncated,
            "created": result.created,
            "provinces": tiers.provinces,
            "districts": tiers.districts,
            "municipalities": tiers.municipalities,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "locations.list" => Some(handle_locations_list(state, req)),
        "locations.provinces.create" => Some(handle_create_node(state, req, Tier::Province)),
        "locations.districts.create" => Some(handle_create_node(state, req, Tier::District)),
        "locations.municipalities.create" => {
            Some(handle_create_node(state, req, Tier::Municipality))
        }
        "locations.delete" => Some(handle_locations_delete(state, req)),
        "locations.importCsv" => Some(handle_locations_import_csv(state, req)),
        "locations.sampleCsv" => Some(sample_response(
            req,
            "location_sample.csv",
            csv::location_sample_csv(),
        )),
        _ => None,
    }
}
