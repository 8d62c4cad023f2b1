use super::{ImportError, ImportSummary};
use crate::csv::CsvRow;
use crate::error::StoreError;
use crate::model::{NamedNode, Tier};
use crate::store::Store;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRow {
    pub province: String,
    pub district: String,
    pub municipality: String,
}

impl LocationRow {
    #[cfg(test)]
    pub fn new(province: &str, district: &str, municipality: &str) -> Self {
        Self {
            province: province.to_string(),
            district: district.to_string(),
            municipality: municipality.to_string(),
        }
    }

    pub fn from_csv(row: &CsvRow) -> Self {
        let field = |h: &str| row.get(h).unwrap_or("").trim().to_string();
        Self {
            province: field("Province"),
            district: field("District"),
            municipality: field("Municipality"),
        }
    }

    fn is_complete(&self) -> bool {
        !self.province.trim().is_empty()
            && !self.district.trim().is_empty()
            && !self.municipality.trim().is_empty()
    }
}

/// All three tiers as last read from the store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TierSnapshots {
    pub provinces: Vec<NamedNode>,
    pub districts: Vec<NamedNode>,
    pub municipalities: Vec<NamedNode>,
}

impl TierSnapshots {
    pub fn load<S: Store>(store: &S) -> Result<Self, StoreError> {
        Ok(Self {
            provinces: store.read_nodes(Tier::Province)?,
            districts: store.read_nodes(Tier::District)?,
            municipalities: store.read_nodes(Tier::Municipality)?,
        })
    }

    pub fn tier(&self, tier: Tier) -> &[NamedNode] {
        match tier {
            Tier::Province => &self.provinces,
            Tier::District => &self.districts,
            Tier::Municipality => &self.municipalities,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CreatedCounts {
    pub provinces: usize,
    pub districts: usize,
    pub municipalities: usize,
}

impl CreatedCounts {
    fn bump(&mut self, tier: Tier) {
        match tier {
            Tier::Province => self.provinces += 1,
            Tier::District => self.districts += 1,
            Tier::Municipality => self.municipalities += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyImport {
    #[serde(flatten)]
    pub summary: ImportSummary,
    pub created: CreatedCounts,
}

/// `(tier, parent id, name)`: names are only unique inside their parent.
type NodeKey = (Tier, Option<String>, String);

/// Lookup table consulted and updated before every store write, so later rows in a run see
/// nodes created by earlier rows without re-reading the store.
struct NodeIndex {
    ids: HashMap<NodeKey, String>,
}

impl NodeIndex {
    fn from_snapshots(snapshots: &TierSnapshots) -> Self {
        let mut ids = HashMap::new();
        for tier in Tier::ALL {
            for node in snapshots.tier(tier) {
                ids.entry((tier, node.parent_id.clone(), node.name.clone()))
                    .or_insert_with(|| node.id.clone());
            }
        }
        Self { ids }
    }

    fn resolve<S: Store>(
        &mut self,
        store: &mut S,
        tier: Tier,
        parent_id: Option<&str>,
        name: &str,
        created: &mut CreatedCounts,
    ) -> Result<String, StoreError> {
        let key = (tier, parent_id.map(str::to_string), name.to_string());
        if let Some(id) = self.ids.get(&key) {
            return Ok(id.clone());
        }
        let id = store.create_node(tier, name, parent_id)?;
        debug!(tier = tier.as_str(), name, id = %id, "created location node");
        created.bump(tier);
        self.ids.insert(key, id.clone());
        Ok(id)
    }

    fn import_row<S: Store>(
        &mut self,
        store: &mut S,
        row: &LocationRow,
        created: &mut CreatedCounts,
    ) -> Result<(), StoreError> {
        let province_id = self.resolve(store, Tier::Province, None, &row.province, created)?;
        let district_id = self.resolve(
            store,
            Tier::District,
            Some(&province_id),
            &row.district,
            created,
        )?;
        self.resolve(
            store,
            Tier::Municipality,
            Some(&district_id),
            &row.municipality,
            created,
        )?;
        Ok(())
    }
}

/// Materializes the Province > District > Municipality rows into the store.
///
/// Rows are processed in order and each missing node is written as soon as it is needed.
/// A store failure stops the run; nodes written before it stay committed. Callers re-read
/// the tiers afterwards.
pub fn import_locations<S: Store>(
    store: &mut S,
    snapshots: &TierSnapshots,
    rows: &[LocationRow],
) -> Result<HierarchyImport, ImportError> {
    let mut index = NodeIndex::from_snapshots(snapshots);
    let mut created = CreatedCounts::default();
    let mut summary = ImportSummary::default();

    for row in rows {
        if !row.is_complete() {
            summary.error_count += 1;
            continue;
        }
        if let Err(source) = index.import_row(store, row, &mut created) {
            // Only fully written rows count; skipped rows never reach the store.
            let completed_rows = summary.accepted_count;
            warn!(completed_rows, error = %source, "location import aborted");
            return Err(ImportError::Store {
                completed_rows,
                source,
            });
        }
        summary.accepted_count += 1;
    }

    info!(
        accepted = summary.accepted_count,
        skipped = summary.error_count,
        provinces = created.provinces,
        districts = created.districts,
        municipalities = created.municipalities,
        "location import finished"
    );
    Ok(HierarchyImport { summary, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::{QuestionRecord, QuestionSet};
    use crate::store::SqliteStore;

    /// Passes through to SQLite but rejects the create call numbered `fail_on` (1-based).
    struct FlakyStore<'a> {
        inner: SqliteStore<'a>,
        creates: usize,
        fail_on: usize,
    }

    impl Store for FlakyStore<'_> {
        fn create_node(
            &mut self,
            tier: Tier,
            name: &str,
            parent_id: Option<&str>,
        ) -> Result<String, StoreError> {
            self.creates += 1;
            if self.creates == self.fail_on {
                return Err(StoreError::Db(rusqlite::Error::InvalidQuery));
            }
            self.inner.create_node(tier, name, parent_id)
        }

        fn read_nodes(&self, tier: Tier) -> Result<Vec<NamedNode>, StoreError> {
            self.inner.read_nodes(tier)
        }

        fn delete_node(&mut self, tier: Tier, id: &str) -> Result<(), StoreError> {
            self.inner.delete_node(tier, id)
        }

        fn read_question_set(&self, id: &str) -> Result<Option<QuestionSet>, StoreError> {
            self.inner.read_question_set(id)
        }

        fn update_question_set(
            &mut self,
            id: &str,
            questions: &[QuestionRecord],
            total_points: i64,
        ) -> Result<(), StoreError> {
            self.inner.update_question_set(id, questions, total_points)
        }
    }

    fn run(store: &mut SqliteStore<'_>, rows: &[LocationRow]) -> HierarchyImport {
        let snapshots = TierSnapshots::load(&*store).expect("load snapshots");
        import_locations(store, &snapshots, rows).expect("import")
    }

    fn names(nodes: &[NamedNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn shared_parents_are_created_once_within_a_batch() {
        let conn = db::open_in_memory();
        let mut store = SqliteStore::new(&conn);
        let res = run(
            &mut store,
            &[LocationRow::new("A", "B", "C"), LocationRow::new("A", "B", "D")],
        );
        assert_eq!(res.summary.accepted_count, 2);
        assert_eq!(
            res.created,
            CreatedCounts {
                provinces: 1,
                districts: 1,
                municipalities: 2
            }
        );

        let tiers = TierSnapshots::load(&store).expect("reload");
        assert_eq!(names(&tiers.provinces), vec!["A"]);
        assert_eq!(names(&tiers.districts), vec!["B"]);
        assert_eq!(tiers.districts[0].parent_id.as_deref(), Some(tiers.provinces[0].id.as_str()));
        assert_eq!(names(&tiers.municipalities), vec!["C", "D"]);
        for m in &tiers.municipalities {
            assert_eq!(m.parent_id.as_deref(), Some(tiers.districts[0].id.as_str()));
        }
    }

    #[test]
    fn reimporting_the_same_rows_creates_nothing() {
        let conn = db::open_in_memory();
        let mut store = SqliteStore::new(&conn);
        let rows = [LocationRow::new("Koshi", "Morang", "Biratnagar")];
        run(&mut store, &rows);

        let second = run(&mut store, &rows);
        assert_eq!(second.summary.accepted_count, 1);
        assert_eq!(second.created, CreatedCounts::default());

        let again_in_batch = run(&mut store, &[rows[0].clone(), rows[0].clone()]);
        assert_eq!(again_in_batch.created, CreatedCounts::default());

        let tiers = TierSnapshots::load(&store).expect("reload");
        assert_eq!(tiers.provinces.len(), 1);
        assert_eq!(tiers.districts.len(), 1);
        assert_eq!(tiers.municipalities.len(), 1);
    }

    #[test]
    fn same_child_names_under_different_parents_stay_separate() {
        let conn = db::open_in_memory();
        let mut store = SqliteStore::new(&conn);
        let res = run(
            &mut store,
            &[LocationRow::new("A", "B", "C"), LocationRow::new("X", "B", "C")],
        );
        assert_eq!(
            res.created,
            CreatedCounts {
                provinces: 2,
                districts: 2,
                municipalities: 2
            }
        );

        let tiers = TierSnapshots::load(&store).expect("reload");
        let parents = tiers
            .districts
            .iter()
            .map(|d| d.parent_id.clone().expect("district parent"))
            .collect::<Vec<_>>();
        assert_ne!(parents[0], parents[1]);
    }

    #[test]
    fn names_match_case_sensitively() {
        let conn = db::open_in_memory();
        let mut store = SqliteStore::new(&conn);
        let res = run(
            &mut store,
            &[
                LocationRow::new("Gandaki", "Kaski", "Pokhara"),
                LocationRow::new("gandaki", "Kaski", "Pokhara"),
            ],
        );
        assert_eq!(res.created.provinces, 2);
    }

    #[test]
    fn incomplete_rows_create_nothing() {
        let conn = db::open_in_memory();
        let mut store = SqliteStore::new(&conn);
        let res = run(
            &mut store,
            &[
                LocationRow::new("Novel", "Fresh", ""),
                LocationRow::new("", "Fresh", "Town"),
                LocationRow::new("Novel", "  ", "Town"),
            ],
        );
        assert_eq!(res.summary.accepted_count, 0);
        assert_eq!(res.summary.error_count, 3);
        assert!(!res.summary.truncated);

        let tiers = TierSnapshots::load(&store).expect("reload");
        assert!(tiers.provinces.is_empty());
        assert!(tiers.districts.is_empty());
    }

    #[test]
    fn existing_nodes_are_reused() {
        let conn = db::open_in_memory();
        let mut store = SqliteStore::new(&conn);
        let p = store
            .create_node(Tier::Province, "Bagmati Province", None)
            .expect("province");

        let res = run(
            &mut store,
            &[LocationRow::new("Bagmati Province", "Kathmandu", "Kirtipur")],
        );
        assert_eq!(res.created.provinces, 0);
        assert_eq!(res.created.districts, 1);

        let tiers = TierSnapshots::load(&store).expect("reload");
        assert_eq!(tiers.districts[0].parent_id.as_deref(), Some(p.as_str()));
    }

    #[test]
    fn sample_file_imports_without_errors() {
        let conn = db::open_in_memory();
        let mut store = SqliteStore::new(&conn);
        let table = crate::csv::parse_table(&crate::csv::location_sample_csv());
        let rows = table.rows.iter().map(LocationRow::from_csv).collect::<Vec<_>>();

        let res = run(&mut store, &rows);
        assert_eq!(res.summary.accepted_count, 3);
        assert_eq!(res.summary.error_count, 0);
        assert_eq!(
            res.created,
            CreatedCounts {
                provinces: 2,
                districts: 2,
                municipalities: 3
            }
        );
    }

    #[test]
    fn skipped_rows_are_not_reported_as_completed() {
        let conn = db::open_in_memory();
        let mut store = FlakyStore {
            inner: SqliteStore::new(&conn),
            creates: 0,
            fail_on: 4,
        };
        let rows = [
            LocationRow::new("", "B", "C"),
            LocationRow::new("A", "B", "C"),
            LocationRow::new("A", "", "X"),
            LocationRow::new("A", "E", "F"),
        ];
        let snapshots = TierSnapshots::load(&store).expect("load");
        let e = import_locations(&mut store, &snapshots, &rows).unwrap_err();
        let ImportError::Store { completed_rows, .. } = e;
        assert_eq!(completed_rows, 1);
    }

    #[test]
    fn store_failure_keeps_earlier_rows_committed() {
        let conn = db::open_in_memory();
        let mut store = FlakyStore {
            inner: SqliteStore::new(&conn),
            creates: 0,
            // Row 1 needs three creates, row 2 one more; the fifth create belongs to row 3.
            fail_on: 5,
        };
        let rows = [
            LocationRow::new("A", "B", "C"),
            LocationRow::new("A", "B", "D"),
            LocationRow::new("A", "E", "F"),
            LocationRow::new("A", "B", "G"),
        ];
        let snapshots = TierSnapshots::load(&store).expect("load");
        let e = import_locations(&mut store, &snapshots, &rows).unwrap_err();
        let ImportError::Store { completed_rows, .. } = e;
        assert_eq!(completed_rows, 2);

        let tiers = TierSnapshots::load(&store).expect("reload");
        assert_eq!(names(&tiers.municipalities), vec!["C", "D"]);
        assert_eq!(names(&tiers.districts), vec!["B"]);
    }
}
