use std::{fs, path::Path};

use reef_viewer::{
    data_structures::texture::order_cube_faces,
    resources::{
        AssetError, find_named_model, find_texture, load_string,
        mesh::{MeshData, smooth_normals},
        texture::walk_dir,
    },
};

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

#[test]
fn texture_named_verbatim_is_used_directly() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("maps/fish.png"));
    let found = find_texture(dir.path(), "maps/fish.png").unwrap();
    assert_eq!(found, dir.path().join("maps/fish.png"));
}

#[test]
fn stale_texture_paths_fall_back_to_a_tree_search() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("deep/inside/fish.png"));
    let found = find_texture(dir.path(), "C:\\exports\\fish.png").unwrap();
    assert_eq!(found, dir.path().join("deep/inside/fish.png"));
}

#[test]
fn texture_search_accepts_prefix_matches() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("coral.png.jpg"));
    let found = find_texture(dir.path(), "coral.png").unwrap();
    assert_eq!(found, dir.path().join("coral.png.jpg"));
}

#[test]
fn missing_texture_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("sand.png"));
    assert!(matches!(
        find_texture(dir.path(), "kelp.png"),
        Err(AssetError::TextureNotFound { name, .. }) if name == "kelp.png"
    ));
}

#[test]
fn walk_visits_files_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("b.txt"));
    touch(&dir.path().join("a/z.txt"));
    touch(&dir.path().join("c.txt"));
    let mut seen = Vec::new();
    walk_dir(dir.path(), &mut |p| {
        seen.push(p.strip_prefix(dir.path()).unwrap().to_path_buf())
    })
    .unwrap();
    let seen: Vec<_> = seen.iter().map(|p| p.to_string_lossy().replace('\\', "/")).collect();
    assert_eq!(seen, ["a/z.txt", "b.txt", "c.txt"]);
}

#[test]
fn named_models_are_found_case_insensitively() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("fish/LionFish/textures/skin.png"));
    touch(&dir.path().join("fish/LionFish/LionFish.obj"));
    touch(&dir.path().join("fish/ReefFish17/ReefFish17.obj"));

    let found = find_named_model(dir.path(), "lionfish").unwrap();
    assert_eq!(found, dir.path().join("fish/LionFish/LionFish.obj"));
    assert!(matches!(
        find_named_model(dir.path(), "Shark"),
        Err(AssetError::UnknownModel { .. })
    ));
}

#[test]
fn cube_faces_are_sorted_by_side() {
    let files = [
        "sky/back.jpg",
        "sky/Front.jpg",
        "sky/down.jpg",
        "sky/up.jpg",
        "sky/left.jpg",
        "sky/right.jpg",
    ];
    let ordered = order_cube_faces(&files).unwrap();
    let names: Vec<_> = ordered
        .iter()
        .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["right", "left", "up", "down", "Front", "back"]);
}

#[test]
fn cube_faces_must_be_six_distinct_sides() {
    assert!(matches!(
        order_cube_faces(&["right.png", "left.png"]),
        Err(AssetError::CubeMap(_))
    ));
    assert!(matches!(
        order_cube_faces(&["right.png", "left.png", "up.png", "down.png", "front.png", "sky.png"]),
        Err(AssetError::CubeMap(_))
    ));
    assert!(matches!(
        order_cube_faces(&["right.png", "right2.png", "up.png", "down.png", "front.png", "back.png"]),
        Err(AssetError::CubeMap(_))
    ));
}

#[test]
fn smooth_normals_average_adjacent_faces() {
    // Two triangles folded 90 degrees along the x axis.
    let positions = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 0.0, -1.0],
        [0.0, 1.0, 0.0],
    ];
    let normals = smooth_normals(&positions, &[0, 1, 2, 0, 1, 3]);
    let up = normals[2];
    assert!((up[1] - 1.0).abs() < 1e-6, "{up:?}");
    let shared = normals[0];
    let h = std::f32::consts::FRAC_1_SQRT_2;
    assert!((shared[1] - h).abs() < 1e-5 && (shared[2] - h).abs() < 1e-5, "{shared:?}");
}

#[test]
fn degenerate_or_broken_faces_leave_zero_normals() {
    let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
    assert_eq!(smooth_normals(&positions, &[]), vec![[0.0; 3]; 3]);
    assert_eq!(smooth_normals(&positions, &[0, 1, 9]), vec![[0.0; 3]; 3]);
}

#[test]
fn obj_meshes_flip_v_and_regenerate_normals() {
    let mesh = tobj::Mesh {
        positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        texcoords: vec![0.0, 0.0, 1.0, 0.25, 0.0, 1.0],
        indices: vec![0, 1, 2],
        material_id: Some(1),
        ..Default::default()
    };
    let data = MeshData::from_obj("tri", &mesh);
    assert_eq!(data.tex_coords, vec![[0.0, 1.0], [1.0, 0.75], [0.0, 0.0]]);
    assert_eq!(data.normals, vec![[0.0, 0.0, 1.0]; 3]);
    assert_eq!(data.material, Some(1));
    assert_eq!(data.face_count(), 1);
    assert_eq!(data.index(), Some(&[0, 1, 2][..]));
    let [positions, normals, uvs] = data.attributes();
    assert_eq!(positions.unwrap().rows(), 3);
    assert_eq!(normals.unwrap().rows(), 3);
    assert_eq!(uvs.unwrap().components, 2);
}

#[test]
fn obj_meshes_without_uvs_get_zero_coordinates() {
    let mesh = tobj::Mesh {
        positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        ..Default::default()
    };
    let data = MeshData::from_obj("flat", &mesh);
    assert_eq!(data.tex_coords, vec![[0.0, 0.0]; 3]);
    assert_eq!(data.index(), None);
    assert_eq!(data.face_count(), 1);
}

#[tokio::test]
async fn strings_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "o fish\n").unwrap();
    assert_eq!(load_string(&path).await.unwrap(), "o fish\n");
    assert!(load_string(&dir.path().join("absent.txt")).await.is_err());
}
