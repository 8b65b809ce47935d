//! [`KnowRob`] – typed reads and writes on the knowledge store.
//!
//! Every method builds a [`Query`], runs it through a [`QuerySession`] and
//! decodes the bindings.  Two result-count rules apply everywhere:
//!
//! - a query with no solution logs `returned nothing` and yields an empty
//!   result (not an error);
//! - a query expected to have one solution but returning several logs
//!   `returned more than one result` and the first solution wins.
//!
//! Transport failures and undecodable bindings are [`KnowledgeError`]s and
//! propagate to the caller.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use refills_hal::FrameLookup;
use refills_types::{DetectedFloor, Facing, FloorCategory, LayerType, PoseStamped, ShelfFloor};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::pose_codec::{CodecError, atom_from_binding, pose_from_binding, vec3_from_binding};
use crate::query::{Query, class};
use crate::service::{KnowledgeError, QueryService, QuerySession, Solution};

/// Lateral extent of one shelf floor in metres.
pub const DEFAULT_FLOOR_WIDTH: f64 = 1.0;

pub struct KnowRob {
    service: Box<dyn QueryService>,
    frames: Arc<dyn FrameLookup>,
    perceived_frames: HashMap<String, String>,
    categories: HashMap<String, FloorCategory>,
    floor_width: f64,
}

impl KnowRob {
    pub fn new(service: Box<dyn QueryService>, frames: Arc<dyn FrameLookup>) -> Self {
        Self {
            service,
            frames,
            perceived_frames: HashMap::new(),
            categories: HashMap::new(),
            floor_width: DEFAULT_FLOOR_WIDTH,
        }
    }

    pub fn with_floor_width(mut self, floor_width: f64) -> Self {
        self.floor_width = floor_width;
        self
    }

    // ── Raw query access ─────────────────────────────────────────────────────

    /// Run `query` and return every solution.
    pub fn query_all(&mut self, query: &Query) -> Result<Vec<Solution>, KnowledgeError> {
        let text = query.to_string();
        debug!(query = %text, "prolog query");
        let solutions = QuerySession::open(self.service.as_mut(), &text)?.collect_all()?;
        if solutions.is_empty() {
            warn!(query = %text, "query returned nothing");
        }
        Ok(solutions)
    }

    /// Run `query` and return its first solution, if any.
    pub fn query_one(&mut self, query: &Query) -> Result<Option<Solution>, KnowledgeError> {
        let mut solutions = self.query_all(query)?;
        if solutions.len() > 1 {
            warn!(query = %query, count = solutions.len(), "query returned more than one result");
        }
        if solutions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(solutions.swap_remove(0)))
        }
    }

    fn require_one(&mut self, query: &Query) -> Result<Solution, KnowledgeError> {
        self.query_one(query)?
            .ok_or_else(|| KnowledgeError::NoSolution(query.to_string()))
    }

    // ── Shelves ──────────────────────────────────────────────────────────────

    /// Create a shelf system and return its id.
    pub fn add_shelf_system(&mut self) -> Result<String, KnowledgeError> {
        let query = Query::ShelfSystem;
        let solution = self.require_one(&query)?;
        let id = atom(&solution, "R", &query)?;
        info!(shelf_system = %id, "created shelf system");
        Ok(id)
    }

    /// Create one shelf meter per detected baseboard under `shelf_system`.
    ///
    /// The detected pose is the perception affordance's pose; the store
    /// reports the affordance offset `T` and the shelf is placed at the pose
    /// minus that offset.  Returns the created ids in input order.
    pub fn add_shelves(
        &mut self,
        shelf_system: &str,
        shelves: &BTreeMap<String, PoseStamped>,
    ) -> Result<Vec<String>, KnowledgeError> {
        let mut ids = Vec::with_capacity(shelves.len());
        for (name, detected) in shelves {
            if !detected.pose.is_finite() {
                warn!(baseboard = %name, "non-finite baseboard pose, skipped");
                continue;
            }
            let query = Query::ShelfAt {
                shelf_system: shelf_system.to_string(),
            };
            let solution = self.require_one(&query)?;
            let id = atom(&solution, "ID", &query)?;
            let offset = vec3_from_binding(binding(&solution, "T", &query)?)
                .map_err(|e| codec_error(&query, "T", e))?;

            let mut pose = detected.clone();
            pose.pose.position.x -= offset.x;
            pose.pose.position.y -= offset.y;
            pose.pose.position.z -= offset.z;
            self.query_all(&Query::BeliefAtUpdate {
                object: id.clone(),
                pose,
            })?;
            debug!(baseboard = %name, shelf = %id, "added shelf");
            ids.push(id);
        }
        info!(count = ids.len(), "shelves added");
        Ok(ids)
    }

    /// Every individual of `class` with its believed pose, in store order.
    pub fn get_objects(
        &mut self,
        class: &'static str,
    ) -> Result<Vec<(String, PoseStamped)>, KnowledgeError> {
        let mut objects = Vec::new();
        for solution in self.query_all(&Query::IndividualsOf { class })? {
            let id = atom(&solution, "R", &Query::IndividualsOf { class })?;
            let query = Query::BeliefAt { object: id.clone() };
            let pose_solution = self.require_one(&query)?;
            let pose = pose_from_binding(binding(&pose_solution, "R", &query)?)
                .map_err(|e| codec_error(&query, "R", e))?;
            objects.push((id, pose));
        }
        Ok(objects)
    }

    pub fn get_shelves(&mut self) -> Result<Vec<(String, PoseStamped)>, KnowledgeError> {
        self.get_objects(class::SHELF_METER)
    }

    /// Perception frame of `object`.  Cached for the lifetime of the client.
    pub fn get_perceived_frame_id(&mut self, object: &str) -> Result<String, KnowledgeError> {
        if let Some(frame) = self.perceived_frames.get(object) {
            return Ok(frame.clone());
        }
        let query = Query::PerceivedFrame {
            object: object.to_string(),
        };
        let solution = self.require_one(&query)?;
        let frame = atom(&solution, "F", &query)?;
        self.perceived_frames.insert(object.to_string(), frame.clone());
        Ok(frame)
    }

    pub fn get_object_frame_id(&mut self, object: &str) -> Result<String, KnowledgeError> {
        let query = Query::ObjectFrame {
            object: object.to_string(),
        };
        let solution = self.require_one(&query)?;
        atom(&solution, "R", &query)
    }

    // ── Floors ───────────────────────────────────────────────────────────────

    /// Persist detected floors of `shelf`, classifying each by its geometry.
    pub fn add_shelf_floors(
        &mut self,
        shelf: &str,
        floors: &[DetectedFloor],
    ) -> Result<(), KnowledgeError> {
        for floor in floors {
            if !(floor.height.is_finite() && floor.height_band.is_finite()) {
                warn!(shelf, local_id = %floor.local_id, "non-finite floor detection, skipped");
                continue;
            }
            let layer = LayerType::classify(floor.height_band, floor.height);
            debug!(shelf, local_id = %floor.local_id, ?layer, height = floor.height, "adding floor");
            self.query_all(&Query::FloorAt {
                shelf: shelf.to_string(),
                layer,
                height: floor.height,
            })?;
        }
        Ok(())
    }

    /// Floors of `shelf`, located in the shelf's perceived frame and sorted by
    /// ascending height.  Floors above the ceiling are included; callers skip
    /// them with [`ShelfFloor::is_too_high`].
    pub fn get_floor_ids(&mut self, shelf: &str) -> Result<Vec<ShelfFloor>, KnowledgeError> {
        let query = Query::FloorsOfShelf {
            shelf: shelf.to_string(),
        };
        let solutions = self.query_all(&query)?;
        if solutions.is_empty() {
            return Ok(Vec::new());
        }
        let shelf_frame = self.get_perceived_frame_id(shelf)?;

        let mut located = Vec::with_capacity(solutions.len());
        for solution in &solutions {
            let id = atom(solution, "Floor", &query)?;
            let frame = atom(solution, "Frame", &query)?;
            let pose = self.frames.lookup_transform(&shelf_frame, &frame)?;
            located.push((id, pose));
        }
        located.sort_by(|a, b| a.1.pose.position.z.total_cmp(&b.1.pose.position.z));

        Ok(located
            .into_iter()
            .enumerate()
            .map(|(index, (id, pose))| ShelfFloor { id, index, pose })
            .collect())
    }

    pub fn is_bottom_floor(&self, floor: &ShelfFloor) -> bool {
        floor.is_bottom()
    }

    /// Whether the store classifies `floor_id` as a mounting (hanging) layer.
    /// Always asks the store.
    pub fn is_hanging_floor(&mut self, floor_id: &str) -> Result<bool, KnowledgeError> {
        let solutions = self.query_all(&Query::IsIndividualOf {
            object: floor_id.to_string(),
            class: class::SHELF_FLOOR_MOUNTING,
        })?;
        Ok(!solutions.is_empty())
    }

    /// Scan category of `floor`.  Bottom takes precedence over hanging.
    /// Derived once per floor id.
    pub fn floor_category(&mut self, floor: &ShelfFloor) -> Result<FloorCategory, KnowledgeError> {
        if let Some(category) = self.categories.get(&floor.id) {
            return Ok(*category);
        }
        let category = if self.is_bottom_floor(floor) {
            FloorCategory::Bottom
        } else if self.is_hanging_floor(&floor.id)? {
            FloorCategory::Hanging
        } else {
            FloorCategory::Standing
        };
        self.categories.insert(floor.id.clone(), category);
        Ok(category)
    }

    pub fn floor_width(&self) -> f64 {
        self.floor_width
    }

    // ── Floor parts ──────────────────────────────────────────────────────────

    pub fn add_separators(
        &mut self,
        floor_id: &str,
        separators: &[PoseStamped],
    ) -> Result<(), KnowledgeError> {
        let mut added = 0;
        for separator in separators {
            let x = separator.pose.position.x;
            if !x.is_finite() {
                warn!(floor = floor_id, "non-finite separator position, skipped");
                continue;
            }
            self.query_all(&Query::SeparatorAt {
                floor: floor_id.to_string(),
                x,
            })?;
            added += 1;
        }
        debug!(floor = floor_id, count = added, "separators added");
        Ok(())
    }

    pub fn add_barcodes(
        &mut self,
        floor_id: &str,
        barcodes: &BTreeMap<String, PoseStamped>,
    ) -> Result<(), KnowledgeError> {
        let mut added = 0;
        for (code, pose) in barcodes {
            let x = pose.pose.position.x;
            if !x.is_finite() {
                warn!(floor = floor_id, barcode = %code, "non-finite barcode position, skipped");
                continue;
            }
            self.query_all(&Query::BarcodeAt {
                floor: floor_id.to_string(),
                code: code.clone(),
                x,
            })?;
            added += 1;
        }
        debug!(floor = floor_id, count = added, "barcodes added");
        Ok(())
    }

    /// Facings of `floor_id`, each located in the floor's perceived frame.
    pub fn get_facings(&mut self, floor_id: &str) -> Result<Vec<Facing>, KnowledgeError> {
        let query = Query::FacingQuery {
            floor: floor_id.to_string(),
        };
        let Some(solution) = self.query_one(&query)? else {
            return Ok(Vec::new());
        };
        let entries = binding(&solution, "Facings", &query)?
            .as_array()
            .ok_or_else(|| KnowledgeError::Binding {
                query: query.to_string(),
                variable: "Facings".to_string(),
                reason: "not a list".to_string(),
            })?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let floor_frame = self.get_perceived_frame_id(floor_id)?;
        let mut facings = Vec::with_capacity(entries.len());
        for entry in entries {
            let (id, left, right) = facing_triple(entry).map_err(|e| codec_error(&query, "Facings", e))?;
            let facing_frame = self.get_object_frame_id(&id)?;
            let pose = self.frames.lookup_transform(&floor_frame, &facing_frame)?;
            facings.push(Facing {
                id,
                pose,
                left_separator: left,
                right_separator: right,
            });
        }
        Ok(facings)
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Write the belief state to an OWL file at `path` (on the store host).
    pub fn save_beliefstate(&mut self, path: &Path) -> Result<(), KnowledgeError> {
        let path = path.display().to_string();
        self.query_all(&Query::SaveBeliefState { path: path.clone() })?;
        info!(%path, "belief state saved");
        Ok(())
    }

    /// Write the action log graph to an OWL file at `path` (on the store host).
    pub fn save_action_graph(&mut self, path: &Path) -> Result<(), KnowledgeError> {
        let path = path.display().to_string();
        self.query_all(&Query::SaveActionGraph { path: path.clone() })?;
        info!(%path, "action graph saved");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Binding helpers
// ─────────────────────────────────────────────────────────────────────────────

fn binding<'s>(
    solution: &'s Solution,
    variable: &str,
    query: &Query,
) -> Result<&'s Value, KnowledgeError> {
    solution.get(variable).ok_or_else(|| KnowledgeError::Binding {
        query: query.to_string(),
        variable: variable.to_string(),
        reason: "unbound".to_string(),
    })
}

fn atom(solution: &Solution, variable: &str, query: &Query) -> Result<String, KnowledgeError> {
    atom_from_binding(binding(solution, variable, query)?).map_err(|e| codec_error(query, variable, e))
}

fn codec_error(query: &Query, variable: &str, err: CodecError) -> KnowledgeError {
    KnowledgeError::Binding {
        query: query.to_string(),
        variable: variable.to_string(),
        reason: err.to_string(),
    }
}

fn facing_triple(entry: &Value) -> Result<(String, String, String), CodecError> {
    let items = entry
        .as_array()
        .ok_or_else(|| CodecError::NotAList(entry.to_string()))?;
    match items.as_slice() {
        [id, left, right] => Ok((
            atom_from_binding(id)?,
            atom_from_binding(left)?,
            atom_from_binding(right)?,
        )),
        _ => Err(CodecError::WrongLength {
            expected: 3,
            actual: items.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose_codec::pose_to_binding;
    use crate::sim::SimStore;
    use refills_hal::sim::SimFrames;
    use refills_types::{Pose, Quaternion, Vec3};
    use serde_json::json;

    fn sol(pairs: &[(&str, Value)]) -> Solution {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn at(frame: &str, x: f64, y: f64, z: f64) -> PoseStamped {
        PoseStamped::new(frame, Pose::new(Vec3::new(x, y, z), Quaternion::identity()))
    }

    fn client(store: &SimStore, frames: SimFrames) -> KnowRob {
        KnowRob::new(Box::new(store.clone()), Arc::new(frames))
    }

    #[test]
    fn shelf_system_id_is_unquoted() {
        let store = SimStore::new().on("DMShelfSystem", vec![sol(&[("R", json!("'shelf_system_1'"))])]);
        let mut kb = client(&store, SimFrames::default());
        assert_eq!(kb.add_shelf_system().unwrap(), "shelf_system_1");
    }

    #[test]
    fn missing_solution_is_an_error_for_creation() {
        let store = SimStore::new();
        let mut kb = client(&store, SimFrames::default());
        assert!(matches!(kb.add_shelf_system(), Err(KnowledgeError::NoSolution(_))));
        assert_eq!(store.open_queries(), 0);
    }

    #[test]
    fn add_shelves_subtracts_affordance_offset() {
        let store = SimStore::new().on(
            "DMShelfFrameFrontStore",
            vec![sol(&[("ID", json!("'shelf_1'")), ("T", json!([0.5, -0.25, 0.0]))])],
        );
        let mut kb = client(&store, SimFrames::default());
        let shelves = BTreeMap::from([("bb_0".to_string(), at("map", 2.0, 1.0, 0.0))]);

        let ids = kb.add_shelves("shelf_system_1", &shelves).unwrap();
        assert_eq!(ids, vec!["shelf_1"]);

        let updates = store.queries_matching("belief_at_update");
        assert_eq!(
            updates,
            vec!["belief_at_update('shelf_1', ['map', _, [1.5,1.25,0.0], [0.0,0.0,0.0,1.0]])"]
        );
        assert_eq!(store.open_queries(), 0);
    }

    #[test]
    fn get_shelves_keeps_store_order() {
        let store = SimStore::new()
            .on(
                "rdfs_individual_of(R, dmshop:'DMShelfFrameFrontStore')",
                vec![sol(&[("R", json!("'b'"))]), sol(&[("R", json!("'a'"))])],
            )
            .on("belief_at('b'", vec![sol(&[("R", pose_to_binding(&at("map", 1.0, 0.0, 0.0)))])])
            .on("belief_at('a'", vec![sol(&[("R", pose_to_binding(&at("map", 2.0, 0.0, 0.0)))])]);
        let mut kb = client(&store, SimFrames::default());
        let shelves = kb.get_shelves().unwrap();
        let ids: Vec<_> = shelves.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(shelves[1].1.pose.position.x, 2.0);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let store = SimStore::new();
        let mut kb = client(&store, SimFrames::default());
        assert!(kb.get_shelves().unwrap().is_empty());
        assert!(kb.query_one(&Query::ShelfSystem).unwrap().is_none());
    }

    #[test]
    fn query_one_takes_first_of_many() {
        let store = SimStore::new().on(
            "DMShelfSystem",
            vec![sol(&[("R", json!("first"))]), sol(&[("R", json!("second"))])],
        );
        let mut kb = client(&store, SimFrames::default());
        let first = kb.query_one(&Query::ShelfSystem).unwrap().unwrap();
        assert_eq!(first["R"], json!("first"));
        assert_eq!(store.open_queries(), 0);
    }

    #[test]
    fn transport_failure_propagates() {
        let store = SimStore::new().fail_open("DMShelfSystem");
        let mut kb = client(&store, SimFrames::default());
        assert!(matches!(kb.add_shelf_system(), Err(KnowledgeError::QueryFailed { .. })));
    }

    #[test]
    fn perceived_frame_is_cached() {
        let store = SimStore::new().on(
            "object_perception_affordance_frame_name('shelf_1'",
            vec![sol(&[("F", json!("'shelf_1_frame'"))])],
        );
        let mut kb = client(&store, SimFrames::default());
        assert_eq!(kb.get_perceived_frame_id("shelf_1").unwrap(), "shelf_1_frame");
        assert_eq!(kb.get_perceived_frame_id("shelf_1").unwrap(), "shelf_1_frame");
        assert_eq!(store.queries_matching("object_perception_affordance_frame_name").len(), 1);
    }

    #[test]
    fn add_shelf_floors_classifies_layers() {
        let store = SimStore::new();
        let mut kb = client(&store, SimFrames::default());
        let floors = vec![
            DetectedFloor {
                local_id: "0".into(),
                height_band: 0.05,
                height: 0.1,
            },
            DetectedFloor {
                local_id: "1".into(),
                height_band: 0.05,
                height: 0.6,
            },
            DetectedFloor {
                local_id: "2".into(),
                height_band: 0.2,
                height: 1.0,
            },
        ];
        kb.add_shelf_floors("shelf_1", &floors).unwrap();
        let q = store.queries_matching("belief_shelf_part_at");
        assert_eq!(q.len(), 3);
        assert!(q[0].contains("DMShelfLayer5TilesFront") && q[0].contains(", 0.1, R)"));
        assert!(q[1].contains("DMShelfLayer4TilesFront") && q[1].contains(", 0.6, R)"));
        assert!(q[2].contains("DMShelfLayerMountingFront") && q[2].contains(", 1.0, R)"));
    }

    fn floors_fixture() -> (SimStore, SimFrames) {
        let store = SimStore::new()
            .on(
                "rdf_has('shelf_1', knowrob:properPhysicalParts, Floor)",
                vec![
                    sol(&[("Floor", json!("'floor_high'")), ("Frame", json!("'f_high'"))]),
                    sol(&[("Floor", json!("'floor_low'")), ("Frame", json!("'f_low'"))]),
                    sol(&[("Floor", json!("'floor_top'")), ("Frame", json!("'f_top'"))]),
                ],
            )
            .on(
                "object_perception_affordance_frame_name('shelf_1'",
                vec![sol(&[("F", json!("'shelf_1_frame'"))])],
            );
        let frames = SimFrames::default();
        frames.set_transform("shelf_1_frame", "f_high", at("shelf_1_frame", 0.0, 0.0, 0.9));
        frames.set_transform("shelf_1_frame", "f_low", at("shelf_1_frame", 0.0, 0.0, 0.1));
        frames.set_transform("shelf_1_frame", "f_top", at("shelf_1_frame", 0.0, 0.0, 1.5));
        (store, frames)
    }

    #[test]
    fn floors_are_sorted_ascending_and_indexed() {
        let (store, frames) = floors_fixture();
        let mut kb = client(&store, frames);
        let floors = kb.get_floor_ids("shelf_1").unwrap();
        let ids: Vec<_> = floors.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["floor_low", "floor_high", "floor_top"]);
        let indices: Vec<_> = floors.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(floors[2].is_too_high());
        assert!(kb.is_bottom_floor(&floors[0]));
        assert!(!kb.is_bottom_floor(&floors[1]));
    }

    #[test]
    fn missing_transform_is_a_frame_error() {
        let (store, _) = floors_fixture();
        let mut kb = client(&store, SimFrames::default());
        assert!(matches!(kb.get_floor_ids("shelf_1"), Err(KnowledgeError::Frame(_))));
    }

    #[test]
    fn hanging_floor_is_asked_every_time() {
        let store = SimStore::new().on_true("rdfs_individual_of('floor_1', dmshop:'DMShelfLayerMountingFront')");
        let mut kb = client(&store, SimFrames::default());
        assert!(kb.is_hanging_floor("floor_1").unwrap());
        assert!(kb.is_hanging_floor("floor_1").unwrap());
        assert!(!kb.is_hanging_floor("floor_2").unwrap());
        assert_eq!(store.queries_matching("DMShelfLayerMountingFront").len(), 3);
    }

    #[test]
    fn floor_category_precedence_and_caching() {
        let store = SimStore::new()
            .on_true("rdfs_individual_of('low_mount', dmshop:'DMShelfLayerMountingFront')")
            .on_true("rdfs_individual_of('mid_mount', dmshop:'DMShelfLayerMountingFront')");
        let mut kb = client(&store, SimFrames::default());
        let floor = |id: &str, z: f64| ShelfFloor {
            id: id.to_string(),
            index: 0,
            pose: at("shelf", 0.0, 0.0, z),
        };

        assert_eq!(kb.floor_category(&floor("low_mount", 0.1)).unwrap(), FloorCategory::Bottom);
        assert_eq!(kb.floor_category(&floor("mid_mount", 0.8)).unwrap(), FloorCategory::Hanging);
        assert_eq!(kb.floor_category(&floor("mid_plain", 0.8)).unwrap(), FloorCategory::Standing);

        let asked = store.queries().len();
        kb.floor_category(&floor("mid_mount", 0.8)).unwrap();
        assert_eq!(store.queries().len(), asked);
    }

    #[test]
    fn separators_and_barcodes_use_lateral_position() {
        let store = SimStore::new();
        let mut kb = client(&store, SimFrames::default());
        kb.add_separators("floor_1", &[at("f", 0.25, 9.0, 9.0), at("f", 0.75, 9.0, 9.0)])
            .unwrap();
        kb.add_barcodes(
            "floor_1",
            &BTreeMap::from([("123".to_string(), at("f", 0.5, 9.0, 9.0))]),
        )
        .unwrap();
        assert_eq!(
            store.queries(),
            vec![
                "belief_shelf_part_at('floor_1', dmshop:'DMShelfSeparator4Tiles', 0.25, _)",
                "belief_shelf_part_at('floor_1', dmshop:'DMShelfSeparator4Tiles', 0.75, _)",
                "belief_shelf_barcode_at('floor_1', dmshop:'DMShelfLabel', dan('123'), 0.5, _)",
            ]
        );
    }

    #[test]
    fn non_finite_detections_never_reach_the_store() {
        let store = SimStore::new().on(
            "DMShelfFrameFrontStore",
            vec![sol(&[("ID", json!("'shelf_1'")), ("T", json!([0.0, 0.0, 0.0]))])],
        );
        let mut kb = client(&store, SimFrames::default());

        let shelves = BTreeMap::from([
            ("bb_0".to_string(), at("map", f64::NAN, 0.0, 0.0)),
            ("bb_1".to_string(), at("map", 1.0, 0.0, 0.0)),
        ]);
        assert_eq!(kb.add_shelves("shelf_system_1", &shelves).unwrap(), vec!["shelf_1"]);

        let floors = vec![
            DetectedFloor {
                local_id: "0".into(),
                height_band: f64::INFINITY,
                height: 0.1,
            },
            DetectedFloor {
                local_id: "1".into(),
                height_band: 0.05,
                height: 0.6,
            },
        ];
        kb.add_shelf_floors("shelf_1", &floors).unwrap();
        kb.add_separators("floor_1", &[at("f", f64::NAN, 0.0, 0.0), at("f", 0.25, 0.0, 0.0)])
            .unwrap();
        kb.add_barcodes(
            "floor_1",
            &BTreeMap::from([
                ("111".to_string(), at("f", f64::NEG_INFINITY, 0.0, 0.0)),
                ("222".to_string(), at("f", 0.5, 0.0, 0.0)),
            ]),
        )
        .unwrap();

        assert_eq!(store.queries_matching("belief_at_update").len(), 1);
        assert_eq!(store.queries_matching("DMShelfLayer").len(), 1);
        assert_eq!(store.queries_matching("DMShelfSeparator").len(), 1);
        assert_eq!(
            store.queries_matching("belief_shelf_barcode_at"),
            vec!["belief_shelf_barcode_at('floor_1', dmshop:'DMShelfLabel', dan('222'), 0.5, _)"]
        );
        assert!(store.queries().iter().all(|q| !q.contains("NaN") && !q.contains("inf")));
    }

    #[test]
    fn facings_are_located_in_floor_frame() {
        let store = SimStore::new()
            .on(
                "shelf_facing('floor_1'",
                vec![sol(&[(
                    "Facings",
                    json!([["'facing_a'", "'sep_l'", "'sep_m'"], ["'facing_b'", "'sep_m'", "'sep_r'"]]),
                )])],
            )
            .on(
                "object_perception_affordance_frame_name('floor_1'",
                vec![sol(&[("F", json!("'floor_1_frame'"))])],
            )
            .on("object_frame_name('facing_a'", vec![sol(&[("R", json!("'facing_a_frame'"))])])
            .on("object_frame_name('facing_b'", vec![sol(&[("R", json!("'facing_b_frame'"))])]);
        let frames = SimFrames::default();
        frames.set_transform("floor_1_frame", "facing_a_frame", at("floor_1_frame", 0.0, 0.3, 0.0));
        frames.set_transform("floor_1_frame", "facing_b_frame", at("floor_1_frame", 0.0, 0.1, 0.0));

        let mut kb = client(&store, frames);
        let facings = kb.get_facings("floor_1").unwrap();
        assert_eq!(facings.len(), 2);
        assert_eq!(facings[0].id, "facing_a");
        assert_eq!(facings[0].left_separator, "sep_l");
        assert_eq!(facings[1].right_separator, "sep_r");
        assert_eq!(facings[1].lateral_offset(), 0.1);
    }

    #[test]
    fn empty_facing_list_skips_frame_lookups() {
        let store = SimStore::new().on("shelf_facing('floor_1'", vec![sol(&[("Facings", json!([]))])]);
        let mut kb = client(&store, SimFrames::default());
        assert!(kb.get_facings("floor_1").unwrap().is_empty());
        assert_eq!(store.queries().len(), 1);
    }

    #[test]
    fn save_queries_carry_path() {
        let store = SimStore::new();
        let mut kb = client(&store, SimFrames::default());
        kb.save_beliefstate(Path::new("/data/beliefstate.owl")).unwrap();
        kb.save_action_graph(Path::new("/data/action_graph.owl")).unwrap();
        assert_eq!(
            store.queries(),
            vec![
                "rdf_save('/data/beliefstate.owl', belief_state)",
                "rdf_save('/data/action_graph.owl', [graph('LoggingGraph')])",
            ]
        );
    }

    #[test]
    fn floor_width_defaults_and_overrides() {
        let store = SimStore::new();
        assert_eq!(client(&store, SimFrames::default()).floor_width(), 1.0);
        assert_eq!(
            client(&store, SimFrames::default()).with_floor_width(0.8).floor_width(),
            0.8
        );
    }
}
