#![cfg(feature = "integration-tests")]

use std::rc::Rc;

use cgmath::{Matrix4, SquareMatrix, Vector3};
use reef_viewer::{
    data_structures::{
        mesh::{Attribute, GpuError, Mesh, Phong},
        scene_graph::{Drawable, Frame, Node},
        shader::Shader,
        texture::{CubeMap, FrameTexture, Texture},
    },
    pipelines::bundled,
    viewer::{PostProcess, render_pass},
};

mod common;
use common::headless;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const SIZE: [u32; 2] = [64, 64];

/// One triangle larger than the viewport, so every pixel is covered.
fn covering_triangle(device: &wgpu::Device, rgb: [f32; 3]) -> Mesh {
    let shader = Rc::new(bundled::color(device, FORMAT));
    Mesh::new(
        device,
        shader,
        &[
            Some(Attribute::vec3(&[
                [-1.0, -1.0, 0.0],
                [3.0, -1.0, 0.0],
                [-1.0, 3.0, 0.0],
            ])),
            Some(Attribute::vec3(&[rgb; 3])),
        ],
        None,
    )
    .unwrap()
}

const QUAD: [[f32; 3]; 4] = [
    [-1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Lit quad facing +z, sampling `texture`.
fn phong_quad(device: &wgpu::Device, shader: Rc<Shader>, texture: Rc<Texture>) -> Mesh {
    Mesh::textured_phong(
        device,
        shader,
        texture,
        &[
            Some(Attribute::vec3(&QUAD)),
            Some(Attribute::vec3(&[[0.0, 0.0, 1.0]; 4])),
            Some(Attribute::vec2(&[[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]])),
        ],
        Some(&QUAD_INDICES),
        Phong {
            light_dir: Vector3::new(0.0, 0.0, -1.0),
            k_a: Vector3::new(0.0, 0.0, 0.0),
            k_d: Vector3::new(1.0, 0.0, 0.0),
            k_s: Vector3::new(0.0, 0.0, 0.0),
            s: 16.0,
        },
    )
    .unwrap()
}

fn submit(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    target: &FrameTexture,
    depth: bool,
    clear: wgpu::Color,
    drawable: &dyn Drawable,
) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("test encoder"),
    });
    render_pass(
        &mut encoder,
        &target.color.view,
        depth.then_some(&target.depth.view),
        clear,
        drawable,
    );
    queue.submit(std::iter::once(encoder.finish()));
}

#[tokio::test]
async fn bundled_shaders_link_on_a_device() {
    let (device, _queue) = headless().await;
    for shader in [
        bundled::phong(&device, FORMAT),
        bundled::skybox(&device, FORMAT),
        bundled::screen(&device, FORMAT),
        bundled::color(&device, FORMAT),
    ] {
        assert!(shader.is_valid(), "{} did not link", shader.label());
        assert!(shader.bind_group_layout(0).is_some());
    }
}

#[tokio::test]
async fn invalid_shaders_are_inert() {
    let (device, _queue) = headless().await;
    let mut shader = reef_viewer::data_structures::shader::Shader::new(
        &device,
        "broken",
        "not wgsl",
        bundled::COLOR_FRAG,
        &reef_viewer::data_structures::shader::ShaderTarget::scene(FORMAT),
    );
    assert!(!shader.is_valid());
    assert_eq!(shader.uniform_location("mvp.model"), None);
    shader.release();
    shader.release();
    assert!(shader.pipeline().is_none());
}

#[tokio::test]
async fn empty_scene_shows_the_clear_colour() {
    let (device, queue) = headless().await;
    let frame = FrameTexture::new(&device, SIZE, FORMAT);
    submit(&device, &queue, &frame, true, wgpu::Color::BLUE, &Node::default());
    let pixels = frame.read_pixels(&device, &queue).await.unwrap();
    assert_eq!(pixels.dimensions(), (64, 64));
    assert!(pixels.pixels().all(|p| p.0 == [0, 0, 255, 255]));
}

#[tokio::test]
async fn meshes_draw_with_their_uploaded_uniforms() {
    let (device, queue) = headless().await;
    let frame = FrameTexture::new(&device, SIZE, FORMAT);
    let mut root = Node::default();
    root.add(Box::new(covering_triangle(&device, [1.0, 0.0, 0.0])));

    let identity = Matrix4::identity();
    root.draw(&Frame::at(0.0), &identity, &identity, &identity);
    root.write_to_buffers(&queue);
    submit(&device, &queue, &frame, true, wgpu::Color::BLACK, &root);

    let pixels = frame.read_pixels(&device, &queue).await.unwrap();
    assert_eq!(pixels.get_pixel(32, 32).0, [255, 0, 0, 255]);
    assert_eq!(pixels.get_pixel(0, 63).0, [255, 0, 0, 255]);
    root.release();
}

#[tokio::test]
async fn moving_the_triangle_away_uncovers_the_background() {
    let (device, queue) = headless().await;
    let frame = FrameTexture::new(&device, SIZE, FORMAT);
    let mut triangle = covering_triangle(&device, [0.0, 1.0, 0.0]);

    let identity = Matrix4::identity();
    let aside = Matrix4::from_translation(cgmath::Vector3::new(10.0, 0.0, 0.0));
    triangle.draw(&Frame::at(0.0), &identity, &identity, &aside);
    triangle.write_to_buffers(&queue);
    submit(&device, &queue, &frame, true, wgpu::Color::BLACK, &triangle);

    let pixels = frame.read_pixels(&device, &queue).await.unwrap();
    assert_eq!(pixels.get_pixel(32, 32).0, [0, 0, 0, 255]);
}

#[tokio::test]
async fn post_process_copies_the_offscreen_frame() {
    let (device, queue) = headless().await;
    let post = PostProcess::new(&device, FORMAT, SIZE).unwrap();
    let mut triangle = covering_triangle(&device, [0.0, 0.0, 1.0]);
    let identity = Matrix4::identity();
    triangle.draw(&Frame::at(0.0), &identity, &identity, &identity);
    triangle.write_to_buffers(&queue);
    submit(&device, &queue, post.frame(), true, wgpu::Color::WHITE, &triangle);

    let output = FrameTexture::new(&device, SIZE, FORMAT);
    submit(&device, &queue, &output, false, wgpu::Color::RED, post.quad());

    let pixels = output.read_pixels(&device, &queue).await.unwrap();
    assert_eq!(pixels.get_pixel(10, 50).0, [0, 0, 255, 255]);
    post.release();
}

#[tokio::test]
async fn meshes_reject_attributes_the_shader_does_not_read() {
    let (device, _queue) = headless().await;
    let shader = Rc::new(bundled::color(&device, FORMAT));
    let result = Mesh::new(
        &device,
        shader,
        &[Some(Attribute::vec3(&[[0.0, 0.0, 0.0]; 3])), None],
        None,
    );
    assert!(matches!(
        result,
        Err(GpuError::MissingAttribute {
            location: 1,
            expected: 3,
            found: None,
            ..
        })
    ));
}

#[tokio::test]
async fn skybox_meshes_bind_a_cube_map() {
    let (device, queue) = headless().await;
    let face = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        2,
        2,
        image::Rgba([0, 128, 255, 255]),
    ));
    let faces = std::array::from_fn(|_| face.clone());
    let cubemap = Rc::new(CubeMap::new(&device, &queue, &faces, "sky").unwrap());
    let shader = Rc::new(bundled::skybox(&device, FORMAT));
    let mut skybox = Mesh::skybox(&device, shader, cubemap.clone()).unwrap();
    assert_eq!(skybox.vertex_array().count(), 36);
    skybox.release();
    skybox.release();
}

#[tokio::test]
async fn indexed_quads_draw_both_triangles() {
    let (device, queue) = headless().await;
    let frame = FrameTexture::new(&device, SIZE, FORMAT);
    let shader = Rc::new(bundled::color(&device, FORMAT));
    let mut quad = Mesh::new(
        &device,
        shader,
        &[
            Some(Attribute::vec3(&QUAD)),
            Some(Attribute::vec3(&[[0.0, 1.0, 0.0]; 4])),
        ],
        Some(&QUAD_INDICES),
    )
    .unwrap();
    assert!(quad.vertex_array().is_indexed());
    assert_eq!(quad.vertex_array().count(), 4);

    let triangle = covering_triangle(&device, [1.0, 0.0, 0.0]);
    assert!(!triangle.vertex_array().is_indexed());
    assert_eq!(triangle.vertex_array().count(), 3);

    let identity = Matrix4::identity();
    quad.draw(&Frame::at(0.0), &identity, &identity, &identity);
    quad.write_to_buffers(&queue);
    submit(&device, &queue, &frame, true, wgpu::Color::BLACK, &quad);

    let pixels = frame.read_pixels(&device, &queue).await.unwrap();
    // Below and above the shared diagonal.
    assert_eq!(pixels.get_pixel(56, 50).0, [0, 255, 0, 255]);
    assert_eq!(pixels.get_pixel(8, 10).0, [0, 255, 0, 255]);
    quad.release();
}

#[tokio::test]
async fn releasing_one_mesh_keeps_a_shared_texture_alive() {
    let (device, queue) = headless().await;
    let frame = FrameTexture::new(&device, SIZE, FORMAT);
    let shader = Rc::new(bundled::phong(&device, FORMAT));
    let texture = Rc::new(Texture::create_solid(
        &device,
        &queue,
        [255, 255, 255, 255],
        "white",
    ));
    let weak = Rc::downgrade(&texture);
    let mut first = phong_quad(&device, shader.clone(), texture.clone());
    let mut second = phong_quad(&device, shader, texture.clone());
    drop(texture);

    first.release();
    assert!(!weak.upgrade().unwrap().is_released());

    let identity = Matrix4::identity();
    let frame_state = Frame {
        time: 0.0,
        camera_position: Vector3::new(0.0, 0.0, 5.0),
    };
    second.draw(&frame_state, &identity, &identity, &identity);
    second.write_to_buffers(&queue);
    submit(&device, &queue, &frame, true, wgpu::Color::BLACK, &second);
    let pixels = frame.read_pixels(&device, &queue).await.unwrap();
    assert_eq!(pixels.get_pixel(32, 32).0, [255, 0, 0, 255]);

    second.release();
    assert!(weak.upgrade().is_none());
}
