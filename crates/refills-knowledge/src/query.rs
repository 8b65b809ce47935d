//! Typed queries against the knowledge store.
//!
//! Every fact the workspace reads or writes has a [`Query`] variant, and the
//! `Display` impl is the only place that produces Prolog text.

use std::fmt;

use refills_types::{LayerType, PoseStamped};

use crate::pose_codec::{pose_to_prolog, prolog_float, quote_atom};

/// Store classes used by the shelf domain.
pub mod class {
    pub const SHELF_SYSTEM: &str = "dmshop:'DMShelfSystem'";
    pub const SHELF_METER: &str = "dmshop:'DMShelfFrameFrontStore'";
    pub const SHELF_FLOOR: &str = "shop:'ShelfLayer'";
    pub const SHELF_FLOOR_STANDING: &str = "dmshop:'DMShelfLayer4TilesFront'";
    pub const SHELF_FLOOR_STANDING_GROUND: &str = "dmshop:'DMShelfLayer5TilesFront'";
    pub const SHELF_FLOOR_MOUNTING: &str = "dmshop:'DMShelfLayerMountingFront'";
    pub const SEPARATOR: &str = "dmshop:'DMShelfSeparator4Tiles'";
    pub const BARCODE: &str = "dmshop:'DMShelfLabel'";
    pub const PERCEPTION_AFFORDANCE: &str = "dmshop:'DMShelfPerceptionAffordance'";
}

/// Named graph holding the action log.
pub const LOGGING_GRAPH: &str = "LoggingGraph";

/// Store class for a floor of the given layer type.
pub fn layer_class(layer: LayerType) -> &'static str {
    match layer {
        LayerType::StandingGround => class::SHELF_FLOOR_STANDING_GROUND,
        LayerType::Standing => class::SHELF_FLOOR_STANDING,
        LayerType::Mounting => class::SHELF_FLOOR_MOUNTING,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Create a shelf system.  Binds `R`.
    ShelfSystem,
    /// Create a shelf meter as part of `shelf_system`.  Binds `ID` and the
    /// perception affordance translation `T`.
    ShelfAt { shelf_system: String },
    /// Overwrite the believed pose of an object.
    BeliefAtUpdate { object: String, pose: PoseStamped },
    /// Believed pose of an object.  Binds `R`.
    BeliefAt { object: String },
    /// All individuals of a class.  Binds `R`.
    IndividualsOf { class: &'static str },
    /// Succeeds when `object` is an individual of `class`.
    IsIndividualOf { object: String, class: &'static str },
    /// Create a floor of `shelf` at `height`.
    FloorAt {
        shelf: String,
        layer: LayerType,
        height: f64,
    },
    /// Floors of a shelf.  Binds `Floor` and its perception frame `Frame`.
    FloorsOfShelf { shelf: String },
    /// Create a separator on `floor` at lateral position `x`.
    SeparatorAt { floor: String, x: f64 },
    /// Create a barcode label on `floor` at lateral position `x`.
    BarcodeAt { floor: String, code: String, x: f64 },
    /// Facings of a floor with the frames of their bounding separators.
    /// Binds `Facings` to a list of `[F, LF, RF]`.
    FacingQuery { floor: String },
    /// Perception frame of an object.  Binds `F`.
    PerceivedFrame { object: String },
    /// Object frame of an object.  Binds `R`.
    ObjectFrame { object: String },
    /// Open an action-log node.  Binds `R`.
    StartAction {
        iri: &'static str,
        time: String,
        previous: Option<String>,
    },
    /// Close an action-log node.
    FinishAction { action: String, time: String },
    /// Attach `child` under `parent` in the logging graph.
    LinkAction {
        parent: String,
        relation: &'static str,
        child: String,
    },
    /// Write the belief state to an OWL file.
    SaveBeliefState { path: String },
    /// Write the logging graph to an OWL file.
    SaveActionGraph { path: String },
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::ShelfSystem => write!(f, "belief_new_object({}, R)", class::SHELF_SYSTEM),
            Query::ShelfAt { shelf_system } => write!(
                f,
                "belief_new_object({}, ID), \
                 rdf_assert({}, knowrob:properPhysicalParts, ID),\
                 object_affordance_static_transform(ID, A, [_,_,T,R]),\
                 rdfs_individual_of(A, {})",
                class::SHELF_METER,
                quote_atom(shelf_system),
                class::PERCEPTION_AFFORDANCE
            ),
            Query::BeliefAtUpdate { object, pose } => write!(
                f,
                "belief_at_update({}, {})",
                quote_atom(object),
                pose_to_prolog(pose)
            ),
            Query::BeliefAt { object } => write!(f, "belief_at({}, R).", quote_atom(object)),
            Query::IndividualsOf { class } => write!(f, "rdfs_individual_of(R, {class})."),
            Query::IsIndividualOf { object, class } => {
                write!(f, "rdfs_individual_of({}, {class})", quote_atom(object))
            }
            Query::FloorAt {
                shelf,
                layer,
                height,
            } => write!(
                f,
                "belief_shelf_part_at({}, {}, {}, R)",
                quote_atom(shelf),
                layer_class(*layer),
                prolog_float(*height)
            ),
            Query::FloorsOfShelf { shelf } => write!(
                f,
                "rdf_has({}, knowrob:properPhysicalParts, Floor), \
                 rdfs_individual_of(Floor, {}), \
                 object_perception_affordance_frame_name(Floor, Frame).",
                quote_atom(shelf),
                class::SHELF_FLOOR
            ),
            Query::SeparatorAt { floor, x } => write!(
                f,
                "belief_shelf_part_at({}, {}, {}, _)",
                quote_atom(floor),
                class::SEPARATOR,
                prolog_float(*x)
            ),
            Query::BarcodeAt { floor, code, x } => write!(
                f,
                "belief_shelf_barcode_at({}, {}, dan({}), {}, _)",
                quote_atom(floor),
                class::BARCODE,
                quote_atom(code),
                prolog_float(*x)
            ),
            Query::FacingQuery { floor } => write!(
                f,
                "findall([F, LF, RF], (shelf_facing({}, F), \
                 rdf_has(F, shop:leftSeparator, L), object_perception_affordance_frame_name(L, LF),\
                 rdf_has(F, shop:rightSeparator, R), object_perception_affordance_frame_name(R, RF)),\
                 Facings).",
                quote_atom(floor)
            ),
            Query::PerceivedFrame { object } => write!(
                f,
                "object_perception_affordance_frame_name({}, F)",
                quote_atom(object)
            ),
            Query::ObjectFrame { object } => {
                write!(f, "object_frame_name({}, R).", quote_atom(object))
            }
            Query::StartAction {
                iri,
                time,
                previous,
            } => write!(
                f,
                "cram_start_action({}, '', {time}, {}, R)",
                quote_atom(iri),
                previous.as_deref().unwrap_or("_")
            ),
            Query::FinishAction { action, time } => {
                write!(f, "cram_finish_action({action}, {time})")
            }
            Query::LinkAction {
                parent,
                relation,
                child,
            } => write!(
                f,
                "rdf_assert({parent}, {relation}, {child}, {})",
                quote_atom(LOGGING_GRAPH)
            ),
            Query::SaveBeliefState { path } => {
                write!(f, "rdf_save({}, belief_state)", quote_atom(path))
            }
            Query::SaveActionGraph { path } => write!(
                f,
                "rdf_save({}, [graph({})])",
                quote_atom(path),
                quote_atom(LOGGING_GRAPH)
            ),
        }
    }
}
