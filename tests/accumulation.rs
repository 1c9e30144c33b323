//! Accumulation controller state machine: reset triggers, convergence,
//! failure semantics, resource lifecycle.

mod common;

use common::TestBackend;
use glam::{Mat4, Vec3};
use lucent::render::Extent;
use lucent::scene::Material;
use lucent::{Camera, DirectionalLight, FrameOutcome, Raytracer, Scene, Sphere};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn two_sphere_scene() -> Scene {
    Scene::from_spheres(vec![
        Sphere::new(
            Vec3::new(-2.0, 1.0, 0.0),
            1.0,
            Material::Dielectric {
                albedo: Vec3::new(0.7, 0.3, 0.3),
                specular: Vec3::splat(0.04),
            },
        ),
        Sphere::new(
            Vec3::new(2.0, 0.6, 1.0),
            0.6,
            Material::Metallic { specular: Vec3::new(0.9, 0.9, 0.7) },
        ),
    ])
}

struct Fixture {
    tracer: Raytracer<TestBackend>,
    scene: Scene,
    camera: Camera,
    light: DirectionalLight,
    rng: StdRng,
    extent: Extent,
}

impl Fixture {
    fn new(extent: Extent) -> Self {
        let mut scene = two_sphere_scene();
        let tracer = Raytracer::new(TestBackend::new(), &mut scene, extent, None).unwrap();
        Self {
            tracer,
            scene,
            camera: Camera::new(),
            light: DirectionalLight::default(),
            rng: StdRng::seed_from_u64(1),
            extent,
        }
    }

    fn frame(&mut self) -> FrameOutcome {
        self.tracer
            .render_frame(
                &mut self.scene,
                &mut self.camera,
                &mut self.light,
                self.extent,
                &mut self.rng,
            )
            .unwrap()
    }
}

#[test]
fn test_sample_index_increments_when_nothing_changes() {
    let mut fx = Fixture::new(Extent::new(64, 48));
    for expected in 1..=5u32 {
        assert_eq!(fx.frame(), FrameOutcome::Rendered { samples: expected });
    }
    // The kernel saw indices 0..=4.
    assert_eq!(fx.tracer.backend().sample_param(), 4);
    assert_eq!(fx.tracer.sample_index(), 5);

    // Fresh sub-pixel jitter every frame, inside the pixel.
    let jitter = fx.tracer.backend().vectors["PixelOffset"];
    assert!((0.0..1.0).contains(&jitter.x) && (0.0..1.0).contains(&jitter.y));
}

#[test]
fn test_dispatch_covers_output_in_8x8_tiles() {
    let mut fx = Fixture::new(Extent::new(100, 60));
    fx.frame();
    assert_eq!(fx.tracer.backend().dispatches[0], (13, 8, 1));
}

#[test]
fn test_accumulation_is_arithmetic_mean_of_raw_frames() {
    let mut fx = Fixture::new(Extent::new(16, 8));
    let frames = 6u64;
    for _ in 0..frames {
        fx.frame();
    }

    // Mirror the TestBackend's default frame formula.
    let raw = |frame: u64, i: usize| ((frame * 31 + i as u64 * 7) % 17) as f32;
    for i in [0usize, 1, 37, 127] {
        let expected: f32 = (0..frames).map(|k| raw(k, i)).sum::<f32>() / frames as f32;
        let got = fx.tracer.converged().pixels()[i];
        assert!((got[0] - expected).abs() < 1e-5, "pixel {i}: {} vs {expected}", got[0]);
        assert!((got[2] - expected * 2.0).abs() < 1e-4);
        assert!((got[3] - 1.0).abs() < 1e-6);
    }
}

#[test]
fn test_camera_move_resets_samples_without_geometry_reupload() {
    let mut fx = Fixture::new(Extent::new(32, 32));
    for _ in 0..3 {
        fx.frame();
    }
    assert_eq!(fx.tracer.backend().buffer_creates, 1);

    fx.camera.set_transform(Mat4::from_translation(Vec3::new(0.0, 1.0, 5.0)));
    assert_eq!(fx.frame(), FrameOutcome::Rendered { samples: 1 });
    assert_eq!(fx.tracer.backend().sample_param(), 0);
    // Geometry buffer untouched: the scene did not change.
    assert_eq!(fx.tracer.backend().buffer_creates, 1);
}

#[test]
fn test_light_change_resets_samples() {
    let mut fx = Fixture::new(Extent::new(32, 32));
    for _ in 0..4 {
        fx.frame();
    }
    fx.light.set_direction(Vec3::new(0.5, -1.0, 0.2));
    assert_eq!(fx.frame(), FrameOutcome::Rendered { samples: 1 });
    assert_eq!(fx.tracer.backend().buffer_creates, 1);
}

#[test]
fn test_scene_mutation_reuploads_geometry_and_resets() {
    let mut fx = Fixture::new(Extent::new(32, 32));
    for _ in 0..3 {
        fx.frame();
    }

    fx.scene.sphere_mut(0).unwrap().set_position(Vec3::new(-1.0, 1.0, 0.0));
    assert!(fx.scene.is_dirty());
    assert_eq!(fx.frame(), FrameOutcome::Rendered { samples: 1 });

    let backend = fx.tracer.backend();
    assert_eq!(backend.buffer_creates, 2);
    assert_eq!(backend.buffer_releases, 1);
    assert_eq!(backend.sample_param(), 0);
    // Dirty state was cleared in the same frame that observed it.
    assert!(!fx.scene.is_dirty());
}

#[test]
fn test_geometry_bytes_match_scene_records() {
    let mut fx = Fixture::new(Extent::new(8, 8));
    fx.frame();

    let mut expected = Vec::new();
    for sphere in fx.scene.iter_mut() {
        expected.extend_from_slice(bytemuck::bytes_of(&sphere.data()));
    }
    assert_eq!(fx.tracer.backend().geometry(), expected.as_slice());
}

#[test]
fn test_empty_scene_uploads_single_zeroed_record() {
    let mut scene = Scene::new();
    let tracer =
        Raytracer::new(TestBackend::new(), &mut scene, Extent::new(8, 8), None).unwrap();
    let geometry = tracer.backend().geometry();
    assert_eq!(geometry.len(), 48);
    assert!(geometry.iter().all(|&b| b == 0));
}

#[test]
fn test_resize_reallocates_and_discards_accumulation() {
    let mut fx = Fixture::new(Extent::new(800, 600));
    for _ in 0..3 {
        fx.frame();
    }
    assert_eq!(fx.tracer.backend().texture_creates, 1);

    fx.extent = Extent::new(1024, 768);
    assert_eq!(fx.frame(), FrameOutcome::Rendered { samples: 1 });

    assert_eq!(fx.tracer.extent(), Extent::new(1024, 768));
    assert_eq!(fx.tracer.converged().extent(), Extent::new(1024, 768));
    let backend = fx.tracer.backend();
    assert_eq!(backend.texture_creates, 2);
    assert_eq!(backend.texture_releases, 1);
    assert_eq!(backend.sample_param(), 0);
}

#[test]
fn test_dispatch_failure_skips_frame_and_leaves_state_untouched() {
    let mut fx = Fixture::new(Extent::new(16, 16));
    fx.frame();
    fx.frame();

    let before = fx.tracer.converged().clone();
    fx.tracer.backend_mut().fail_dispatches.insert(2);
    assert_eq!(fx.frame(), FrameOutcome::Skipped);
    assert_eq!(fx.tracer.sample_index(), 2);
    assert_eq!(fx.tracer.converged(), &before);

    // The retry picks up exactly where the failed frame left off.
    assert_eq!(fx.frame(), FrameOutcome::Rendered { samples: 3 });
    assert_eq!(fx.tracer.backend().sample_param(), 2);
}

#[test]
fn test_failed_dispatch_after_dirty_clear_does_not_reupload() {
    let mut fx = Fixture::new(Extent::new(16, 16));
    fx.frame();

    fx.scene.sphere_mut(1).unwrap().set_radius(0.9);
    fx.tracer.backend_mut().fail_dispatches.insert(1);
    assert_eq!(fx.frame(), FrameOutcome::Skipped);

    // Geometry went up before the dispatch failed; the dirty flag is gone
    // and the next frame does not upload again.
    assert!(!fx.scene.is_dirty());
    assert_eq!(fx.tracer.backend().buffer_creates, 2);
    assert_eq!(fx.frame(), FrameOutcome::Rendered { samples: 1 });
    assert_eq!(fx.tracer.backend().buffer_creates, 2);
}

#[test]
fn test_shutdown_releases_every_resource() {
    let mut fx = Fixture::new(Extent::new(8, 8));
    fx.frame();

    let backend = fx.tracer.shutdown();
    assert_eq!(backend.live_textures(), 0);
    assert_eq!(backend.live_buffers(), 0);
    assert_eq!(backend.texture_releases, 1);
    assert_eq!(backend.buffer_releases, 1);
}
