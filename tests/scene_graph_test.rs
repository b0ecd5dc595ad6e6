use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};
use reef_viewer::{
    KeyCode,
    animation::{Clock, ManualClock},
    camera::Trackball,
    data_structures::scene_graph::{Drawable, Frame, Node},
    viewer::{Scene, route_key},
};

mod common;
use common::{Event, Recorder, assert_mat4_near, assert_vec3_near, drawn_models, new_log};

fn draw(node: &mut Node, model: Matrix4<f32>) {
    let identity = Matrix4::identity();
    node.draw(&Frame::at(0.0), &identity, &identity, &model);
}

#[test]
fn leaf_receives_parent_model_times_every_local_transform() {
    let log = new_log();
    let a = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
    let b = Matrix4::from_angle_z(Deg(30.0));
    let parent = Matrix4::from_scale(2.0);

    let mut inner = Node::new(b);
    inner.add(Recorder::new("leaf", &log));
    let mut outer = Node::new(a);
    outer.add(Box::new(inner));

    draw(&mut outer, parent);
    let models = drawn_models(&log);
    assert_eq!(models.len(), 1);
    assert_mat4_near(models[0].1, parent * a * b);
}

#[test]
fn children_are_drawn_depth_first_in_insertion_order() {
    let log = new_log();
    let mut first = Node::default();
    first.add(Recorder::new("first.a", &log));
    first.add(Recorder::new("first.b", &log));
    let mut root = Node::default();
    root.add(Box::new(first));
    root.add(Recorder::new("second", &log));

    draw(&mut root, Matrix4::identity());
    let names: Vec<_> = drawn_models(&log).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["first.a", "first.b", "second"]);
}

#[test]
fn transforms_never_leak_to_siblings() {
    let log = new_log();
    let mut moved = Node::new(Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0)));
    moved.add(Recorder::new("moved", &log));
    let mut root = Node::default();
    root.add(Box::new(moved));
    root.add(Recorder::new("sibling", &log));

    draw(&mut root, Matrix4::identity());
    let models = drawn_models(&log);
    assert_mat4_near(models[1].1, Matrix4::identity());
}

#[test]
fn add_all_appends_after_existing_children() {
    let log = new_log();
    let mut root = Node::with_children(Matrix4::identity(), [Recorder::new("a", &log) as Box<dyn Drawable>]);
    root.add_all([
        Recorder::new("b", &log) as Box<dyn Drawable>,
        Recorder::new("c", &log),
    ]);
    assert_eq!(root.children().len(), 3);
    draw(&mut root, Matrix4::identity());
    let names: Vec<_> = drawn_models(&log).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn keys_reach_every_handler_in_the_tree() {
    let log = new_log();
    let mut nested = Node::default();
    nested.add(Recorder::with_keys("deep", &log));
    let mut root = Node::default();
    root.add(Recorder::with_keys("shallow", &log));
    root.add(Recorder::new("mute", &log));
    root.add(Box::new(nested));

    root.key_handler(KeyCode::KeyZ);
    assert_eq!(
        *log.borrow(),
        vec![
            Event::Key {
                name: "shallow",
                key: KeyCode::KeyZ
            },
            Event::Key {
                name: "deep",
                key: KeyCode::KeyZ
            },
        ]
    );
}

#[test]
fn release_recurses_through_children() {
    let log = new_log();
    let mut nested = Node::default();
    nested.add(Recorder::new("deep", &log));
    let mut root = Node::default();
    root.add(Box::new(nested));
    root.add(Recorder::new("shallow", &log));

    root.release();
    assert_eq!(
        *log.borrow(),
        vec![Event::Release { name: "deep" }, Event::Release { name: "shallow" }]
    );
}

#[test]
fn scene_draw_hands_time_and_eye_position_to_the_tree() {
    let log = new_log();
    let mut scene = Scene::new(Trackball::new(4.0));
    scene.root.add(Recorder::new("leaf", &log));

    let frame = scene.draw(2.5, 16.0 / 9.0);
    assert_eq!(frame.time, 2.5);
    assert_vec3_near(frame.camera_position, Vector3::new(0.0, 0.0, 4.0));
    match &log.borrow()[0] {
        Event::Draw {
            time,
            camera_position,
            model,
            ..
        } => {
            assert_eq!(*time, 2.5);
            assert_vec3_near(*camera_position, Vector3::new(0.0, 0.0, 4.0));
            assert_mat4_near(*model, Matrix4::identity());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn scene_release_empties_the_tree() {
    let log = new_log();
    let mut scene = Scene::new(Trackball::default());
    scene.root.add(Recorder::new("leaf", &log));
    scene.release();
    assert!(scene.root.is_empty());
    assert!(scene.shaders().is_empty());
    assert_eq!(*log.borrow(), vec![Event::Release { name: "leaf" }]);
}

fn routed_keys(log: &common::Log) -> Vec<KeyCode> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Key { key, .. } => Some(*key),
            _ => None,
        })
        .collect()
}

#[test]
fn every_key_but_the_closing_ones_reaches_the_scene() {
    let log = new_log();
    let mut root = Node::default();
    root.add(Recorder::with_keys("handler", &log));
    let mut clock = ManualClock::new(7.0);

    for key in [KeyCode::KeyW, KeyCode::KeyA, KeyCode::KeyS, KeyCode::KeyD, KeyCode::ArrowLeft] {
        assert!(route_key(key, &mut clock, &mut root));
    }
    assert_eq!(clock.now(), 7.0);
    assert_eq!(
        routed_keys(&log),
        [KeyCode::KeyW, KeyCode::KeyA, KeyCode::KeyS, KeyCode::KeyD, KeyCode::ArrowLeft]
    );
}

#[test]
fn space_restarts_the_clock_and_is_still_dispatched() {
    let log = new_log();
    let mut root = Node::default();
    root.add(Recorder::with_keys("handler", &log));
    let mut clock = ManualClock::new(3.5);

    assert!(route_key(KeyCode::Space, &mut clock, &mut root));
    assert_eq!(clock.now(), 0.0);
    assert_eq!(routed_keys(&log), [KeyCode::Space]);
}

#[test]
fn escape_and_q_close_without_dispatch() {
    let log = new_log();
    let mut root = Node::default();
    root.add(Recorder::with_keys("handler", &log));
    let mut clock = ManualClock::new(1.0);

    assert!(!route_key(KeyCode::Escape, &mut clock, &mut root));
    assert!(!route_key(KeyCode::KeyQ, &mut clock, &mut root));
    assert!(routed_keys(&log).is_empty());
    assert_eq!(clock.now(), 1.0);
}
