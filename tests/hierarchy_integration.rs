//! Integration tests for parent chains and transform propagation.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test hierarchy_integration
//! ```

mod common;

use common::*;

use glam::Vec2;

use aberredlevel::components::background::BackgroundObject;
use aberredlevel::components::keyframe::{Keyframe, Keyframes};
use aberredlevel::components::object::{AutoKill, LevelObject, ParentRef, Shape};
use aberredlevel::components::parentlink::{AxisLink, CameraLink, ParentSettings};
use aberredlevel::components::prefab::{Prefab, PrefabObject, PrefabTransform};
use aberredlevel::components::runtimenode::NodePayload;
use aberredlevel::components::transform::WorldTransform;
use aberredlevel::events::action::{ObjectAspect, PrefabAspect};
use aberredlevel::resources::datastore::DataStore;

/// Parent moving from the origin to (10, 0) over ten seconds.
fn mover(id: &str) -> LevelObject {
    timed(id, 0.0, 10.0).with_keyframes(moving(Vec2::ZERO, Vec2::new(10.0, 0.0), 10.0))
}

fn child_of(id: &str, parent: &str, settings: ParentSettings) -> LevelObject {
    timed(id, 0.0, 10.0)
        .with_parent(ParentRef::Object(parent.into()))
        .with_parent_settings(settings)
}

fn position_of(level: &TestLevel, id: &str) -> Vec2 {
    level
        .visuals()
        .last_update(id)
        .map(|(t, _)| t.position)
        .expect("visual was updated")
}

fn assert_position(level: &TestLevel, id: &str, x: f32, y: f32) {
    let p = position_of(level, id);
    assert!(
        approx_eq(p.x, x) && approx_eq(p.y, y),
        "'{}' at ({}, {}), expected ({}, {})",
        id,
        p.x,
        p.y,
        x,
        y
    );
}

// =============================================================================
// Per-axis inheritance
// =============================================================================

#[test]
fn child_follows_parent_position() {
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(child_of("c", "p", ParentSettings::default()));
    let mut level = level_with(store);

    tick_at(&mut level, 5.0);

    assert_position(&level, "p", 5.0, 0.0);
    assert_position(&level, "c", 5.0, 0.0);
}

#[test]
fn delayed_child_samples_parent_in_the_past() {
    let mut settings = ParentSettings::default();
    settings.position = AxisLink::inherit().with_delay(2.0);
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(child_of("c", "p", settings));
    let mut level = level_with(store);

    tick_at(&mut level, 5.0);

    assert_position(&level, "c", 3.0, 0.0);
}

#[test]
fn detached_axis_ignores_parent() {
    let mut settings = ParentSettings::default();
    settings.position = AxisLink::detached();
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(child_of("c", "p", settings));
    let mut level = level_with(store);

    tick_at(&mut level, 5.0);

    assert_position(&level, "c", 0.0, 0.0);
}

#[test]
fn parallax_scales_parent_contribution() {
    let mut settings = ParentSettings::default();
    settings.position = AxisLink::inherit().with_parallax(0.5);
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(child_of("c", "p", settings));
    let mut level = level_with(store);

    tick_at(&mut level, 4.0);

    assert_position(&level, "c", 2.0, 0.0);
}

#[test]
fn axis_closed_midway_stays_closed_above() {
    let mut closed = ParentSettings::default();
    closed.position = AxisLink::detached();
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(child_of("c", "p", closed));
    store.insert_object(child_of("g", "c", ParentSettings::default()));
    let mut level = level_with(store);

    tick_at(&mut level, 5.0);

    assert_position(&level, "g", 0.0, 0.0);
}

#[test]
fn grandchild_composes_whole_chain() {
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(
        child_of("c", "p", ParentSettings::default())
            .with_keyframes(moving(Vec2::new(0.0, 1.0), Vec2::new(0.0, 1.0), 1.0)),
    );
    store.insert_object(child_of("g", "c", ParentSettings::default()));
    let mut level = level_with(store);

    tick_at(&mut level, 6.0);

    assert_position(&level, "c", 6.0, 1.0);
    assert_position(&level, "g", 6.0, 1.0);
}

#[test]
fn desynced_child_samples_parent_at_spawn() {
    let mut settings = ParentSettings::default();
    settings.desync = true;
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    let mut child = child_of("c", "p", settings);
    child.start_time = 2.0;
    store.insert_object(child);
    let mut level = level_with(store);

    tick_at(&mut level, 8.0);

    assert_position(&level, "c", 2.0, 0.0);
}

// =============================================================================
// Camera
// =============================================================================

#[test]
fn camera_link_comes_from_topmost_ancestor() {
    let mut camera_settings = ParentSettings::default();
    camera_settings.rotation = AxisLink::detached();
    camera_settings.scale = AxisLink::inherit();
    let mut store = DataStore::new();
    store.insert_object(
        timed("b", 0.0, 10.0)
            .with_parent(ParentRef::Camera)
            .with_parent_settings(camera_settings),
    );
    store.insert_object(child_of("a", "b", ParentSettings::all()));
    let mut level = level_with(store);
    level.init();

    let a = level.store().object_key("a").expect("a");
    let chain = level.converter().chain(a).expect("chain built");
    assert!(chain.camera_relative());
    assert_eq!(chain.camera, Some(CameraLink::from(&camera_settings)));
    assert_eq!(chain.len(), 1);
}

#[test]
fn camera_relative_objects_follow_camera() {
    let mut store = DataStore::new();
    store.insert_object(timed("hud", 0.0, 10.0).with_parent(ParentRef::Camera));
    store.insert_object(child_of("icon", "hud", ParentSettings::default()));
    store.insert_object(timed("world", 0.0, 10.0));
    let mut level = level_with(store);
    level.set_camera(WorldTransform::new(Vec2::new(100.0, 50.0), 0.0, Vec2::ONE));

    tick_at(&mut level, 1.0);

    assert_position(&level, "hud", 100.0, 50.0);
    assert_position(&level, "icon", 100.0, 50.0);
    assert_position(&level, "world", 0.0, 0.0);
}

// =============================================================================
// Structural changes
// =============================================================================

#[test]
fn deleted_parent_leaves_child_parentless() {
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(child_of("c", "p", ParentSettings::default()));
    let mut level = level_with(store);
    tick_at(&mut level, 5.0);
    assert_position(&level, "c", 5.0, 0.0);

    level.delete_object("p").expect("known id");
    level.update_object("c", ObjectAspect::ParentChain).expect("child survives");
    tick_at(&mut level, 6.0);

    let c = level.store().object_key("c").expect("c");
    assert!(level.converter().chain(c).is_some_and(|chain| chain.is_empty()));
    assert!(level.is_object_active("c"));
    assert_position(&level, "c", 0.0, 0.0);
}

#[test]
fn parent_update_attaches_child() {
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(timed("c", 0.0, 10.0));
    let mut level = level_with(store);
    tick_at(&mut level, 5.0);
    assert_position(&level, "c", 0.0, 0.0);

    level.object_mut("c").expect("c").parent = ParentRef::Object("p".into());
    level.update_object("c", ObjectAspect::Parent).expect("known id");
    tick_at(&mut level, 7.0);

    assert_position(&level, "c", 7.0, 0.0);
}

#[test]
fn parent_settings_update_rebuilds_descendants() {
    let mut store = DataStore::new();
    store.insert_object(mover("p"));
    store.insert_object(child_of("c", "p", ParentSettings::default()));
    store.insert_object(child_of("g", "c", ParentSettings::default()));
    let mut level = level_with(store);
    tick_at(&mut level, 5.0);
    assert_position(&level, "g", 5.0, 0.0);

    level.object_mut("c").expect("c").parent_settings.position = AxisLink::detached();
    level.update_object("c", ObjectAspect::ParentSettings).expect("known id");
    tick_at(&mut level, 6.0);

    assert_position(&level, "c", 0.0, 0.0);
    assert_position(&level, "g", 0.0, 0.0);
}

#[test]
fn parent_cycle_is_broken() {
    let mut store = DataStore::new();
    store.insert_object(child_of("a", "b", ParentSettings::default()));
    store.insert_object(child_of("b", "a", ParentSettings::default()));
    let mut level = level_with(store);

    tick_at(&mut level, 1.0);

    assert_eq!(level.active_object_ids(), vec!["a", "b"]);
    for id in ["a", "b"] {
        let key = level.store().object_key(id).expect("exists");
        assert!(level.converter().chain(key).is_some_and(|c| c.is_empty()));
    }
}

#[test]
fn empty_objects_parent_without_a_visual() {
    use aberredlevel::components::object::ObjectKind;

    let mut store = DataStore::new();
    store.insert_object(mover("pivot").with_kind(ObjectKind::Empty));
    store.insert_object(child_of("c", "pivot", ParentSettings::default()));
    let mut level = level_with(store);

    tick_at(&mut level, 5.0);

    assert!(level.object_node("pivot").is_none());
    assert_eq!(level.visuals().created, vec!["c"]);
    assert_position(&level, "c", 5.0, 0.0);
}

// =============================================================================
// Prefab transforms
// =============================================================================

#[test]
fn instance_transform_offsets_base_copies() {
    let mut store = DataStore::new();
    store.insert_prefab(
        Prefab::new("p")
            .with_object(timed("root", 0.0, 10.0))
            .with_object(child_of("leaf", "root", ParentSettings::default())),
    );
    let mut instance = PrefabObject::new("i", "p", 0.0);
    instance.transform = PrefabTransform {
        position: Vec2::new(10.0, 0.0),
        ..Default::default()
    };
    store.insert_prefab_object(instance);
    let mut level = level_with(store);

    tick_at(&mut level, 1.0);
    for (_, copy) in level.store().objects() {
        assert_position(&level, &copy.id, 10.0, 0.0);
    }

    level.prefab_object_mut("i").expect("instance").transform.position = Vec2::new(20.0, 5.0);
    level.update_prefab_object("i", PrefabAspect::Transform).expect("known instance");
    tick_at(&mut level, 2.0);

    for (_, copy) in level.store().objects() {
        assert_position(&level, &copy.id, 20.0, 5.0);
    }
}

#[test]
fn instance_parent_moves_base_copies() {
    let mut store = DataStore::new();
    store.insert_object(mover("carrier"));
    store.insert_prefab(Prefab::new("p").with_object(timed("t", 0.0, 10.0)));
    store.insert_prefab_object(PrefabObject::new("i", "p", 0.0));
    let mut level = level_with(store);
    tick_at(&mut level, 4.0);
    let copy_id = level
        .store()
        .objects()
        .find(|(_, o)| o.is_prefab_copy())
        .map(|(_, o)| o.id.clone())
        .expect("copy");
    assert_position(&level, &copy_id, 0.0, 0.0);

    level.prefab_object_mut("i").expect("instance").parent = ParentRef::Object("carrier".into());
    level.update_prefab_object("i", PrefabAspect::Parent).expect("known instance");
    tick_at(&mut level, 4.0);

    assert_position(&level, &copy_id, 4.0, 0.0);
}

// =============================================================================
// Payload updates
// =============================================================================

#[test]
fn shape_update_swaps_visual_and_keeps_liveness() {
    let mut store = DataStore::new();
    store.insert_object(timed("s", 0.0, 10.0));
    let mut level = level_with(store);
    tick_at(&mut level, 1.0);
    let first = level.visuals().handle_of("s").expect("visual");

    level.object_mut("s").expect("s").shape = Shape::Image {
        path: MISSING_IMAGE.into(),
    };
    level.update_object("s", ObjectAspect::Shape).expect("known id");
    assert_eq!(
        *level.object_node("s").expect("node").payload(),
        NodePayload::Visual { handle: None }
    );
    assert!(level.object_node("s").is_some_and(|n| n.is_active()));

    level.object_mut("s").expect("s").shape = Shape::Text { text: "hi".into() };
    level.update_object("s", ObjectAspect::Shape).expect("known id");
    tick_at(&mut level, 2.0);

    let second = level.visuals().handle_of("s").expect("new visual");
    assert_ne!(first, second);
    assert!(level.visuals().is_active("s"));
    assert_eq!(level.visuals().live.len(), 1);
}

#[test]
fn shape_update_to_empty_removes_node() {
    use aberredlevel::components::object::ObjectKind;

    let mut store = DataStore::new();
    store.insert_object(timed("s", 0.0, 10.0));
    let mut level = level_with(store);
    tick_at(&mut level, 1.0);

    level.object_mut("s").expect("s").kind = ObjectKind::Empty;
    level.update_object("s", ObjectAspect::Shape).expect("known id");

    assert!(level.object_node("s").is_none());
    assert!(level.visuals().live.is_empty());
}

#[test]
fn modifiers_update_reattaches_bundle() {
    let mut store = DataStore::new();
    store.insert_object(with_modifiers(timed("m", 0.0, 10.0), &["pulse"]));
    let mut level = level_with(store);
    tick_at(&mut level, 1.0);
    let created = level.visuals().created.len();

    level.object_mut("m").expect("m").modifiers.modifiers.push(
        aberredlevel::components::modifier::Modifier::action("shake"),
    );
    level.update_object("m", ObjectAspect::Modifiers).expect("known id");
    tick_at(&mut level, 2.0);

    assert_eq!(level.modifiers().attached, vec!["m", "m"]);
    assert_eq!(level.modifiers().detached, vec!["m"]);
    assert!(level.modifiers().is_active("m"));
    assert_eq!(level.visuals().created.len(), created);
}

#[test]
fn hide_and_depth_are_forwarded() {
    let mut store = DataStore::new();
    store.insert_object(timed("h", 0.0, 10.0));
    let mut level = level_with(store);
    tick_at(&mut level, 1.0);
    let handle = level.visuals().handle_of("h").expect("visual");

    level.object_mut("h").expect("h").hidden = true;
    level.update_object("h", ObjectAspect::Hide).expect("known id");
    level.object_mut("h").expect("h").depth = 7;
    level.update_object("h", ObjectAspect::Depth).expect("known id");

    assert!(level.visuals().hidden.contains(&handle));
    assert_eq!(level.visuals().depth.get(&handle), Some(&7));
}

#[test]
fn keyframes_update_recaches_and_rekills() {
    let mut store = DataStore::new();
    store.insert_object(
        LevelObject::new("k", 0.0).with_keyframes(moving(Vec2::ZERO, Vec2::new(4.0, 0.0), 4.0)),
    );
    let mut level = level_with(store);
    tick_at(&mut level, 3.0);
    assert!(level.is_object_active("k"));

    level.object_mut("k").expect("k").keyframes = moving(Vec2::ZERO, Vec2::new(2.0, 0.0), 2.0);
    level.update_object("k", ObjectAspect::Keyframes).expect("known id");
    tick_at(&mut level, 1.0);

    assert_position(&level, "k", 1.0, 0.0);
    assert!(approx_eq(level.object_node("k").expect("k").kill_time(), 2.0));
    tick_at(&mut level, 3.0);
    assert!(!level.is_object_active("k"));
}

// =============================================================================
// Backgrounds and color
// =============================================================================

#[test]
fn background_composes_base_transform() {
    let mut background = BackgroundObject::new("bg", 0.0).with_autokill(AutoKill::Forever);
    background.position = Vec2::new(3.0, 4.0);
    background.keyframes = moving(Vec2::ZERO, Vec2::new(2.0, 0.0), 2.0);
    let mut store = DataStore::new();
    store.insert_background(background);
    let mut level = level_with(store);

    tick_at(&mut level, 1.0);

    assert_eq!(level.active_background_ids(), vec!["bg"]);
    assert_position(&level, "bg", 4.0, 4.0);
}

#[test]
fn color_track_is_passed_through() {
    let keyframes = Keyframes {
        color: vec![Keyframe::new(0.0, 0.0), Keyframe::new(10.0, 1.0)],
        ..Default::default()
    };
    let mut store = DataStore::new();
    store.insert_object(timed("tint", 0.0, 10.0).with_keyframes(keyframes));
    let mut level = level_with(store);

    tick_at(&mut level, 5.0);

    let (_, color) = level.visuals().last_update("tint").expect("updated");
    assert!(approx_eq(color, 0.5));
}
